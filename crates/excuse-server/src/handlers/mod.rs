//! HTTP handlers

pub mod excuses;
pub mod health;
pub mod stats;

pub use health::health;
