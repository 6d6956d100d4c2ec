//! # Brieflow Common Library
//!
//! Shared code for Brieflow services including:
//! - Error types
//! - Bootstrap configuration loading (TOML + environment)
//! - Logging initialization
//! - Pipeline event types and the in-process event bus
//! - Clock abstraction for timestamps and elapsed-time measurement

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod time;

pub use error::{Error, Result};
