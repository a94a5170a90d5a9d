//! Marker artifact encoding.
//!
//! [`Encoder`] is the seam between the generation pipeline and the external
//! encoder. [`FfmpegEncoder`] renders a short H.264 clip or an animated WebP
//! preview starting at a marker's offset.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use rk_core::{ArtifactKind, Result};

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Length of a marker clip, in seconds.
pub const CLIP_DURATION_SECS: u32 = 20;
/// Length of a marker preview, in seconds.
pub const PREVIEW_DURATION_SECS: u32 = 5;
/// Frame rate of animated previews.
const PREVIEW_FPS: u32 = 12;

/// One encoder invocation: render `kind` from `source` starting at
/// `offset_secs`, scaled to `width`, into `output`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeRequest {
    pub source: PathBuf,
    pub offset_secs: u64,
    pub kind: ArtifactKind,
    pub width: u32,
    pub output: PathBuf,
}

/// Produces artifact files from a source video.
///
/// Implementations write only to `request.output`. On failure the output
/// may be missing or partial; callers never treat it as a finished
/// artifact.
#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode(&self, request: &EncodeRequest) -> Result<()>;
}

/// [`Encoder`] backed by the ffmpeg binary.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg: PathBuf,
    timeout: Duration,
}

impl FfmpegEncoder {
    pub fn new(ffmpeg: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            timeout,
        }
    }

    /// Build an encoder from the registry's ffmpeg.
    pub fn from_registry(registry: &ToolRegistry, timeout: Duration) -> Result<Self> {
        Ok(Self::new(registry.require("ffmpeg")?, timeout))
    }

    /// The ffmpeg command line for `request`.
    pub fn command(&self, request: &EncodeRequest) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.ffmpeg.clone());
        cmd.timeout(self.timeout);
        cmd.args(["-v", "error", "-y"]);
        cmd.arg("-ss").arg(request.offset_secs.to_string());
        cmd.arg("-i").arg(request.source.to_string_lossy());

        match request.kind {
            ArtifactKind::Clip => {
                cmd.arg("-t").arg(CLIP_DURATION_SECS.to_string());
                cmd.args([
                    "-max_muxing_queue_size",
                    "1024",
                    "-c:v",
                    "libx264",
                    "-profile:v",
                    "high",
                    "-level",
                    "4.2",
                    "-preset",
                    "veryslow",
                    "-crf",
                    "24",
                    "-movflags",
                    "+faststart",
                    "-threads",
                    "4",
                ]);
                cmd.arg("-vf").arg(format!("scale={}:-2", request.width));
                cmd.args(["-sws_flags", "lanczos", "-c:a", "aac", "-b:a", "64k"]);
                cmd.args(["-strict", "-2", "-f", "mp4"]);
            }
            ArtifactKind::Preview => {
                cmd.arg("-t").arg(PREVIEW_DURATION_SECS.to_string());
                cmd.args([
                    "-c:v",
                    "libwebp",
                    "-lossless",
                    "1",
                    "-q:v",
                    "70",
                    "-compression_level",
                    "6",
                    "-preset",
                    "default",
                    "-loop",
                    "0",
                    "-threads",
                    "4",
                ]);
                cmd.arg("-vf")
                    .arg(format!("scale={}:-2,fps={PREVIEW_FPS}", request.width));
                cmd.args(["-an", "-f", "webp"]);
            }
        }

        cmd.arg(request.output.to_string_lossy());
        cmd
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode(&self, request: &EncodeRequest) -> Result<()> {
        tracing::debug!(
            kind = %request.kind,
            source = %request.source.display(),
            offset = request.offset_secs,
            output = %request.output.display(),
            "Encoding marker artifact"
        );
        self.command(request).execute().await?;
        Ok(())
    }
}
