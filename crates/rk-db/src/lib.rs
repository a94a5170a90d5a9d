//! rk-db: relational store access for reelkeep.
//!
//! SQLite-backed storage with connection pooling and embedded migrations,
//! typed models, per-entity query modules, repository facades that can only
//! be obtained inside a transaction scope ([`txn::TxnManager`]), and the
//! multi-entity performer mutations built on top of them.

pub mod migrations;
pub mod models;
pub mod mutations;
pub mod pool;
pub mod queries;
pub mod repo;
pub mod txn;

pub use repo::{ReaderRepository, Repository};
pub use txn::TxnManager;
