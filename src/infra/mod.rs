//! Infrastructure layer for cross-cutting concerns.
//!
//! Provides configuration management and the error and result types.

pub mod config;
pub mod error;
