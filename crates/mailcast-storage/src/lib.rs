//! Mailcast Storage - Database abstraction
//!
//! This crate provides the data model, the repository traits and their
//! PostgreSQL implementations, plus an in-memory store used by tests and
//! local development.

pub mod db;
pub mod memory;
pub mod models;
pub mod repository;

pub use db::DatabasePool;
pub use memory::MemoryStore;
pub use models::*;
pub use repository::*;
