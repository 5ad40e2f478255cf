//! Batch descriptions read from JSON files

/// Typed batch configuration and how it's read
pub mod batch;

/// Embedded JSON schema used to validate batch files before deserialising them
pub mod schema;
