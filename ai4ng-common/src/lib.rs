//! # AI4NG Common Library
//!
//! Shared code for AI4NG read services including:
//! - Error taxonomy shared by every service boundary
//! - Key-value store abstraction (typed attribute items, queries, scans)
//! - Object store abstraction (get-by-path)
//! - Configuration loading
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod object_store;
pub mod store;
pub mod time;

pub use error::{Error, Result};
