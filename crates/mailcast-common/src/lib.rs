//! Mailcast Common - Shared types and utilities
//!
//! This crate provides the error type, configuration, and small value types
//! shared across all Mailcast components.

pub mod config;
pub mod error;
pub mod types;

pub use crate::config::Config;
pub use crate::error::{Error, Result};
