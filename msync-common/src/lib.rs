//! # msync Common Library
//!
//! Shared code for the msync workspace:
//! - Error types (`Error` enum, `Result` alias)
//! - Configuration loading and platform path resolution

pub mod config;
pub mod error;

pub use config::Config;
pub use error::{Error, Result};
