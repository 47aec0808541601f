//! Infrastructure layer for cross-cutting concerns.
//!
//! - Configuration loading, persistence and validation
//! - Error taxonomy and result type

pub mod config;
pub mod error;
