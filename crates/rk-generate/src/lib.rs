//! rk-generate: derived marker artifact generation.
//!
//! - [`paths::ArtifactPaths`] maps (content hash, offset, kind) to the
//!   canonical and temporary file locations.
//! - [`store::ArtifactStore`] answers existence checks and moves finished
//!   encoder output into place with a single rename.
//! - [`task::GenerationTask`] generates the missing clips and previews for a
//!   scene or a single marker, best-effort per artifact.
//! - [`pool::WorkPool`] runs tasks under a concurrency limit with
//!   backpressure on submission.
//! - [`batch::generate_markers`] ties them together for a whole library.

pub mod batch;
pub mod paths;
pub mod pool;
pub mod store;
pub mod task;

pub use batch::{generate_markers, BatchTarget, GenerateOptions, GenerateSummary};
pub use paths::ArtifactPaths;
pub use pool::{Drained, WorkPool};
pub use store::ArtifactStore;
pub use task::{
    ArtifactOutcome, ArtifactStatus, GenerateSettings, GenerationContext, GenerationTarget,
    GenerationTask, MarkerReport, TaskReport,
};
