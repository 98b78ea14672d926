//! Shared data models.

pub mod schema;

// Re-export commonly used types
pub use schema::{Database, ErdGraph, Field, Relationship, Table, Workspace};
