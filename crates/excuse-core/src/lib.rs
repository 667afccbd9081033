//! Excuse Core Library
//!
//! Domain error type, the storage port trait, validation policy and seed-file
//! parsing for the excuse service.

// Re-export pure types from excuse-types
pub use excuse_types::*;

pub mod error;
pub mod ports;
pub mod seed;
pub mod validation;

pub use error::{ExcuseError, Result};
pub use ports::{ExcuseFilter, ExcuseStore};
pub use validation::ValidationPolicy;
