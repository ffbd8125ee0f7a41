//! MCPist Shared Types and Utilities
//!
//! This crate contains the domain types and errors shared across the MCPist
//! entitlement crates.

pub mod error;
pub mod types;

pub use error::*;
pub use types::*;
