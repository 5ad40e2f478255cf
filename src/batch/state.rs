use std::fmt;

/// Where a row of the parameter table got to
///
/// Rows move `Pending -> DirCreated -> FilesCopied` and end in `Submitted` or, when the job
/// directory was already there, `Skipped`. Staging-only runs stop at `FilesCopied`. Nothing is
/// tracked after submission.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JobState {
    Pending,
    DirCreated,
    FilesCopied,
    Submitted,
    Skipped,
}

impl JobState {
    pub fn as_str(&self) -> &str {
        match self {
            JobState::Pending => "pending",
            JobState::DirCreated => "dir_created",
            JobState::FilesCopied => "files_copied",
            JobState::Submitted => "submitted",
            JobState::Skipped => "skipped",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
