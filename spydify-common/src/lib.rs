//! # spydify common library
//!
//! Shared code for the spydify crates:
//! - Error type
//! - Configuration loading and root folder resolution
//! - Atomic file writes
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod fs;
pub mod time;

pub use error::{Error, Result};
