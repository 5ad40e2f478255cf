use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::batch::state::JobState;
use crate::batch::submit::Submitter;
use crate::cluster::SubmissionMode;
use crate::error::JobError;
use crate::table::param_table::{ParamTable, JOB_NAME};
use crate::template::copy::{copy_and_replace_files, copy_files, replace_path};
use crate::template::substitute::Bindings;
use crate::template::tree::TemplateRef;
use crate::WorkingDirectory;

/// Everything needed to turn a parameter table into job directories
#[derive(Debug, Clone)]
pub struct JobBatch {
    /// Copied into every job directory with variables replaced
    pub templates: Vec<TemplateRef>,
    /// Copied into every job directory as-is
    pub copies: Vec<TemplateRef>,
    /// Copied once into the base directory as-is
    pub common: Vec<TemplateRef>,
    pub base_dir: WorkingDirectory,
    /// Submission script template
    pub sub_file: PathBuf,
    pub mode: SubmissionMode,
    /// Aggregated mode only: command list written next to the submission script
    pub command_file: PathBuf,
    /// Aggregated mode only: column holding each row's command
    pub command_column: String,
    pub cores_per_job: u32,
}

/// Outcome for one row of the parameter table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub name: String,
    pub dir: PathBuf,
    pub state: JobState,
}

impl JobBatch {
    /// Create (and submit, given a submitter) one job per row of `table`
    ///
    /// Rows whose directory already exists are skipped, so a rerun only creates new jobs.
    /// The first error stops the batch; directories created so far are left on disk.
    pub fn create_jobs(&self, mut table: ParamTable, mut submitter: Option<&mut dyn Submitter>) -> Result<Vec<JobRecord>, JobError> {
        table.ensure_job_name();
        let rows = table.bindings();
        info!("Creating {} jobs in {} ({} submission)", rows.len(), self.base_dir.path.display(), self.mode);

        let templates = self.job_templates();
        let mut aggregate = Aggregate::default();
        let mut records = Vec::with_capacity(rows.len());

        for bindings in &rows {
            let name = bindings
                .get(JOB_NAME)
                .ok_or_else(|| JobError::config(format!("Row is missing {JOB_NAME}")))?;
            let mut record = JobRecord {
                name: name.clone(),
                dir: self.base_dir.path.join(name),
                state: JobState::Pending,
            };

            if record.dir.is_dir() {
                warn!("{} already exists. Skipping.", record.dir.display());
                record.state = JobState::Skipped;
                records.push(record);
                continue;
            }
            fs::create_dir_all(&record.dir)?;
            record.state = JobState::DirCreated;

            copy_files(&self.copies, &record.dir)?;
            copy_and_replace_files(&templates, &record.dir, bindings)?;
            record.state = JobState::FilesCopied;

            match self.mode {
                SubmissionMode::Aggregated => aggregate.add(&record.dir, bindings, &self.command_column)?,
                SubmissionMode::PerJob => {
                    if let Some(submitter) = submitter.as_mut() {
                        let script = self.script_name(bindings)?;
                        submitter.submit(&record.dir, &script)?;
                        record.state = JobState::Submitted;
                    }
                }
            }
            records.push(record);
        }

        if self.mode == SubmissionMode::Aggregated {
            if aggregate.is_empty() {
                info!("No new jobs, nothing to submit");
            } else {
                let bindings = aggregate.finish(rows.len(), self.cores_per_job);
                let script = self.stage_aggregate(&bindings)?;
                if let Some(submitter) = submitter.as_mut() {
                    submitter.submit(&self.base_dir.path, &script)?;
                    for record in records.iter_mut().filter(|r| r.state == JobState::FilesCopied) {
                        record.state = JobState::Submitted;
                    }
                }
            }
        }

        copy_files(&self.common, &self.base_dir.path)?;
        Ok(records)
    }

    /// Per-job templates, plus the submission script when each job is submitted on its own
    fn job_templates(&self) -> Vec<TemplateRef> {
        let mut templates = self.templates.clone();
        let listed = templates.iter().any(|t| t.source() == self.sub_file.as_path());
        if self.mode == SubmissionMode::PerJob && !listed {
            templates.push(TemplateRef::Path(self.sub_file.clone()));
        }
        templates
    }

    /// File name of the rendered submission script
    fn script_name(&self, bindings: &Bindings) -> Result<PathBuf, JobError> {
        let script = replace_path(&self.sub_file, bindings)?;
        script
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| JobError::config(format!("{} has no file name", self.sub_file.display())))
    }

    /// Write the aggregate submission script and command list to the base directory
    fn stage_aggregate(&self, bindings: &Bindings) -> Result<PathBuf, JobError> {
        let base = &self.base_dir.path;
        copy_and_replace_files(&[TemplateRef::Path(self.sub_file.clone())], base, bindings)?;

        let command_file = TemplateRef::Path(self.command_file.clone());
        if self.command_file.is_file() {
            copy_and_replace_files(&[command_file], base, bindings)?;
        } else {
            let out_path = base.join(replace_path(&command_file.destination()?, bindings)?);
            info!("Writing command list to {}", out_path.display());
            fs::write(out_path, &bindings[COMMAND_LINES])?;
        }

        self.script_name(bindings)
    }
}

/// Binding holding the command list in aggregated mode
pub const COMMAND_LINES: &str = "commandlines";

/// Binding holding the total core count in aggregated mode
pub const N_JOBS: &str = "n_jobs";

/// Bindings and command lines collected across rows in aggregated mode
#[derive(Debug, Default)]
struct Aggregate {
    bindings: Bindings,
    command_lines: String,
    jobs: usize,
}

impl Aggregate {
    fn add(&mut self, job_dir: &Path, bindings: &Bindings, command_column: &str) -> Result<(), JobError> {
        let command = bindings.get(command_column).ok_or_else(|| {
            JobError::config(format!("Aggregated submission needs a '{command_column}' column"))
        })?;
        let dir_name = job_dir.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();

        self.command_lines.push_str(&format!("cd {dir_name}; {command}\n"));
        self.bindings.extend(bindings.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.jobs += 1;
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.jobs == 0
    }

    /// `n_jobs` counts every row of the table, skipped ones included, plus one core for the
    /// launcher
    fn finish(mut self, n_rows: usize, cores_per_job: u32) -> Bindings {
        let n_jobs = n_rows * cores_per_job as usize + 1;
        self.bindings.insert(N_JOBS.to_string(), n_jobs.to_string());
        self.bindings.insert(COMMAND_LINES.to_string(), self.command_lines);
        self.bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn row(pairs: &[(&str, &str)]) -> Bindings {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_aggregate_bindings() {
        let mut aggregate = Aggregate::default();
        aggregate
            .add(Path::new("/scratch/a"), &row(&[("ssubmit_command", "./run 1"), ("T", "1")]), "ssubmit_command")
            .unwrap();
        aggregate
            .add(Path::new("/scratch/b"), &row(&[("ssubmit_command", "./run 2"), ("T", "2")]), "ssubmit_command")
            .unwrap();

        let bindings = aggregate.finish(2, 4);
        assert_eq!(bindings[N_JOBS], "9");
        assert_eq!(bindings["T"], "2");
        assert_eq!(bindings[COMMAND_LINES], "cd a; ./run 1\ncd b; ./run 2\n");
    }

    #[test]
    fn test_aggregate_needs_command_column() {
        let mut aggregate = Aggregate::default();
        let err = aggregate.add(Path::new("a"), &row(&[("T", "1")]), "ssubmit_command").unwrap_err();
        assert!(matches!(err, JobError::Configuration(_)));
    }

    #[test]
    fn test_sub_file_added_once_in_per_job_mode() {
        let tmp = tempdir().unwrap();
        let mut batch = JobBatch {
            templates: vec![TemplateRef::Path(PathBuf::from("sub.sh"))],
            copies: vec![],
            common: vec![],
            base_dir: WorkingDirectory { path: tmp.path().to_path_buf() },
            sub_file: PathBuf::from("sub.sh"),
            mode: SubmissionMode::PerJob,
            command_file: PathBuf::from("commandlines"),
            command_column: "ssubmit_command".to_string(),
            cores_per_job: 1,
        };
        assert_eq!(batch.job_templates().len(), 1);

        batch.templates.clear();
        assert_eq!(batch.job_templates(), vec![TemplateRef::Path(PathBuf::from("sub.sh"))]);

        batch.mode = SubmissionMode::Aggregated;
        assert!(batch.job_templates().is_empty());
    }

    #[test]
    fn test_script_name_is_substituted() {
        let tmp = tempdir().unwrap();
        let batch = JobBatch {
            templates: vec![],
            copies: vec![],
            common: vec![],
            base_dir: WorkingDirectory { path: tmp.path().to_path_buf() },
            sub_file: PathBuf::from("templates/{JOB_NAME}.sh"),
            mode: SubmissionMode::PerJob,
            command_file: PathBuf::from("commandlines"),
            command_column: "ssubmit_command".to_string(),
            cores_per_job: 1,
        };
        let name = batch.script_name(&row(&[(JOB_NAME, "r1")])).unwrap();
        assert_eq!(name, PathBuf::from("r1.sh"));
    }
}
