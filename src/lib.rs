//! Generate per-job working directories from a parameter table and submit them to a batch
//! scheduler
//!
//! Each row of the parameter table becomes a set of `{variable}` bindings. Template files are
//! copied into a directory named after the row's `JOB_NAME` with those variables replaced, in
//! both contents and file names, then the rendered submission script is handed to `sbatch` or
//! `qsub`.

use std::path::PathBuf;

pub mod batch;
pub mod cluster;
pub mod config;
pub mod error;
pub mod table;
pub mod template;

/// Directory job directories are created in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDirectory {
    pub path: PathBuf,
}
