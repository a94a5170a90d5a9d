//! rk-core: shared types, IDs, errors and configuration.
//!
//! This crate is the foundational dependency for all other rk-* crates,
//! providing type-safe identifiers, a unified error type, media-domain
//! enums, the tri-state [`Patch`] used by partial updates, and the
//! application configuration.

pub mod checksum;
pub mod config;
pub mod error;
pub mod ids;
pub mod media;
pub mod patch;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::*;
pub use media::*;
pub use patch::Patch;
