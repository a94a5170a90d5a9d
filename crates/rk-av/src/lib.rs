//! rk-av: external audio/video tool integration.
//!
//! Wraps the ffmpeg/ffprobe binaries: a [`ToolCommand`] builder with timeout
//! support, a [`ToolRegistry`] that locates the binaries, and the
//! [`Encoder`] seam used by the marker artifact pipeline together with its
//! ffmpeg-backed implementation.

pub mod command;
pub mod encoder;
pub mod tools;

pub use command::{ToolCommand, ToolOutput};
pub use encoder::{EncodeRequest, Encoder, FfmpegEncoder};
pub use tools::{ToolInfo, ToolRegistry};
