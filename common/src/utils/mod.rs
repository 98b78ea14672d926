//! Utility functions and helpers.

pub mod id;

// Re-export commonly used functions
pub use id::{coerce_id, id_field};
