use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

use log::{info, warn};

use crate::error::JobError;

/// Submission programs, in order of preference
pub const SUBMISSION_PROGRAMS: [&str; 2] = ["sbatch", "qsub"];

/// Hands a job script to a scheduler
pub trait Submitter {
    /// Submit `script` (a file name inside `job_dir`) from `job_dir`, returning the captured output
    fn submit(&mut self, job_dir: &Path, script: &Path) -> Result<String, JobError>;
}

/// Runs `<program> <script>` inside the job directory, pausing after every submission
#[derive(Debug, Clone)]
pub struct BatchProgram {
    pub program: PathBuf,
    pub sleep_time: Duration,
}

impl BatchProgram {
    /// Use the first submission program found on `PATH`
    pub fn discover(sleep_time: Duration) -> Result<Self, JobError> {
        let program = find_sub_prog(env::var_os("PATH"))?;
        info!("Submitting with {}", program.display());
        Ok(BatchProgram { program, sleep_time })
    }
}

impl Submitter for BatchProgram {
    fn submit(&mut self, job_dir: &Path, script: &Path) -> Result<String, JobError> {
        info!("Submitting {}", job_dir.join(script).display());

        let mut command = Command::new(&self.program);
        let cmd = command.arg(script).current_dir(job_dir);
        info!("{:?}", &cmd);
        let output = cmd.output()?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        info!("{}", text.trim_end());
        if !output.status.success() {
            warn!("{} exited with {}", self.program.display(), output.status);
        }

        if !self.sleep_time.is_zero() {
            thread::sleep(self.sleep_time);
        }
        Ok(text)
    }
}

/// Find the first of [`SUBMISSION_PROGRAMS`] in a `PATH`-style search path
pub fn find_sub_prog(search_path: Option<OsString>) -> Result<PathBuf, JobError> {
    let dirs: Vec<PathBuf> = search_path
        .map(|paths| env::split_paths(&paths).collect())
        .unwrap_or_default();

    SUBMISSION_PROGRAMS
        .iter()
        .find_map(|program| dirs.iter().map(|dir| dir.join(program)).find(|path| is_executable(path)))
        .ok_or_else(|| {
            JobError::Environment(format!(
                "Could not find any of the following programs: {:?}",
                SUBMISSION_PROGRAMS
            ))
        })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
