//! Excuse Types - Pure type definitions
//!
//! This crate contains only plain data types with no async runtime dependencies,
//! shared by the storage core and the HTTP server.

pub mod excuse;
pub mod stats;

pub use excuse::*;
pub use stats::*;
