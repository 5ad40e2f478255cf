use std::io;

/// Every failure is fatal to the whole batch, there is no per-job isolation
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Bad parameter source, invalid reference lists, missing template files
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The host can't submit jobs, e.g. no sbatch or qsub on PATH
    #[error("Environment error: {0}")]
    Environment(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl JobError {
    pub fn config(msg: impl Into<String>) -> Self {
        JobError::Configuration(msg.into())
    }
}
