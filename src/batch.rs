//! Materialise job directories from the parameter table and hand them to the scheduler

/// Create one job directory per table row and submit it
pub mod job;

/// Per-row progress through job creation
pub mod state;

/// Find a submission program and run it
pub mod submit;
