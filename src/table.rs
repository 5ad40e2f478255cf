//! The parameter table: one row per job, one column per template variable

/// In-memory table and job name detection
pub mod param_table;

/// Load a table from delimited text, JSON or an in-memory column mapping
pub mod read;
