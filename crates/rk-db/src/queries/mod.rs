//! Database query modules.
//!
//! Free functions over a borrowed `Connection`; callers obtain the
//! connection from a transaction scope, never from the pool directly.

pub mod markers;
pub mod performers;
pub mod scenes;
