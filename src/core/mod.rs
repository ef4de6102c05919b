//! Core application module
//!
//! This module provides the shared application layer including:
//! - Configuration management
//! - Structured logging system
//! - Error handling and type system

pub mod config;
pub mod error;
pub mod logging;

pub use config::Config;
pub use error::{AtriumError, ErrorResponse, Result};
pub use logging::Logger;
