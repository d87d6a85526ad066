//! # YoBot Common Library
//!
//! Shared code for the YoBot table accessor and its callers:
//! - Error type for startup and configuration failures
//! - TOML bootstrap configuration
//! - Config file and credential resolution

pub mod config;
pub mod error;

pub use error::{Error, Result};
