use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::batch::job::JobBatch;
use crate::batch::submit::BatchProgram;
use crate::cluster::{SubmissionMode, DEFAULT_CLUSTER};
use crate::config::schema::{load_schema, validate};
use crate::error::JobError;
use crate::table::read::{ParamSource, Separator};
use crate::template::tree::TemplateRef;
use crate::WorkingDirectory;

pub const DEFAULT_SUB_FILE: &str = "sub.sh";
pub const DEFAULT_COMMAND_FILE: &str = "commandlines";
pub const DEFAULT_COMMAND_COLUMN: &str = "ssubmit_command";

/// One batch of jobs, as written in a JSON batch file
///
/// Every field is optional in the file; unset values fall back to the defaults above when the
/// batch is built. Relative paths are relative to the current directory.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    /// Copied into each job directory with variables replaced
    #[serde(default)]
    pub file_list: Vec<TemplateRef>,
    /// Copied into each job directory unchanged
    #[serde(default)]
    pub file_copy_list: Vec<TemplateRef>,
    /// Copied once into the base directory unchanged
    #[serde(default)]
    pub file_common_list: Vec<TemplateRef>,
    pub param_table: Option<ParamTableConfig>,
    pub base_dir: Option<PathBuf>,
    pub table_sep: Option<String>,
    pub sub_file: Option<PathBuf>,
    pub sub_prog: Option<PathBuf>,
    pub sub_cluster: Option<String>,
    pub command_file: Option<PathBuf>,
    pub command_column: Option<String>,
    pub n_cores_per_job: Option<u32>,
    /// Seconds to wait after each submission
    pub sleep_time: Option<f64>,
    pub submit: Option<bool>,
}

/// A parameter file path, or the columns written inline
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ParamTableConfig {
    Path(PathBuf),
    Columns(Map<String, Value>),
}

impl BatchConfig {
    pub fn job_batch(&self) -> Result<JobBatch, JobError> {
        let cluster = self.sub_cluster.as_deref().unwrap_or(DEFAULT_CLUSTER);
        let mode = SubmissionMode::from_cluster(cluster);
        // per-job batches always render the submission script, so it alone is enough
        if self.file_list.is_empty() && mode == SubmissionMode::Aggregated {
            return Err(JobError::config("No file_list provided"));
        }

        Ok(JobBatch {
            templates: self.file_list.clone(),
            copies: self.file_copy_list.clone(),
            common: self.file_common_list.clone(),
            base_dir: WorkingDirectory { path: self.base_dir.clone().unwrap_or_else(|| PathBuf::from(".")) },
            sub_file: self.sub_file.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_SUB_FILE)),
            mode,
            command_file: self.command_file.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_COMMAND_FILE)),
            command_column: self.command_column.clone().unwrap_or_else(|| DEFAULT_COMMAND_COLUMN.to_string()),
            cores_per_job: self.n_cores_per_job.unwrap_or(1),
        })
    }

    pub fn param_source(&self) -> Result<ParamSource, JobError> {
        let sep = match &self.table_sep {
            Some(sep) => sep.parse::<Separator>()?,
            None => Separator::default(),
        };
        match &self.param_table {
            Some(ParamTableConfig::Path(path)) => Ok(ParamSource::File { path: path.clone(), sep }),
            Some(ParamTableConfig::Columns(columns)) => Ok(ParamSource::Columns(columns.clone())),
            None => Err(JobError::config("No param_table provided")),
        }
    }

    /// The submission program, or `None` when only staging job directories
    pub fn submitter(&self) -> Result<Option<BatchProgram>, JobError> {
        if !self.submit.unwrap_or(true) {
            info!("Submission disabled, only staging job directories");
            return Ok(None);
        }

        let seconds = self.sleep_time.unwrap_or(0.0);
        let sleep_time = Duration::try_from_secs_f64(seconds)
            .map_err(|_| JobError::config(format!("Invalid sleep_time {seconds}")))?;

        match &self.sub_prog {
            Some(program) => Ok(Some(BatchProgram { program: program.clone(), sleep_time })),
            None => BatchProgram::discover(sleep_time).map(Some),
        }
    }
}

/// A batch file on disk
pub struct BatchFile {
    pub path: PathBuf,
}

impl BatchFile {
    /// Read, validate against the bundled schema, then deserialise
    pub fn read(&self) -> Result<BatchConfig, JobError> {
        let json = self.parse_untyped_json()?;
        let schema = load_schema()?;
        validate(&schema, &json)?;
        info!("Batch file is valid");
        self.parse_json(json)
    }

    fn read_file(&self) -> Result<String, JobError> {
        let path: &Path = self.path.as_path();
        info!("Reading batch file at {}", path.display());
        fs::read_to_string(path).map_err(|err| {
            warn!("Can't read batch file at path {}: {}", path.display(), err);
            JobError::Io(err)
        })
    }

    fn parse_untyped_json(&self) -> Result<Value, JobError> {
        let json_string = self.read_file()?;
        serde_json::from_str::<Value>(&json_string)
            .map_err(|err| JobError::config(format!("{} isn't valid JSON: {err}", self.path.display())))
    }

    fn parse_json(&self, value: Value) -> Result<BatchConfig, JobError> {
        serde_json::from_value::<BatchConfig>(value)
            .map_err(|err| JobError::config(format!("Can't deserialise {}: {err}", self.path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_batch_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("batch.json");
        fs::write(
            &path,
            r#"{
                "file_list": ["tpl", ["run.sh", "{JOB_NAME}.sh"]],
                "param_table": {"id": ["a", "b"]},
                "sub_cluster": "stampede2",
                "n_cores_per_job": 4,
                "submit": false
            }"#,
        )
        .unwrap();

        let config = BatchFile { path }.read().unwrap();
        let batch = config.job_batch().unwrap();
        assert_eq!(batch.templates.len(), 2);
        assert_eq!(batch.mode, SubmissionMode::Aggregated);
        assert_eq!(batch.cores_per_job, 4);
        assert_eq!(batch.sub_file, PathBuf::from(DEFAULT_SUB_FILE));
        assert_eq!(batch.command_column, DEFAULT_COMMAND_COLUMN);
        assert!(config.submitter().unwrap().is_none());

        let table = config.param_source().unwrap().load().unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_invalid_batch_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("batch.json");
        fs::write(&path, r#"{"file_list": ["a"], "sub_clutser": "x"}"#).unwrap();
        assert!(matches!(BatchFile { path }.read(), Err(JobError::Configuration(_))));

        let missing = BatchFile { path: tmp.path().join("nope.json") };
        assert!(matches!(missing.read(), Err(JobError::Io(_))));
    }

    #[test]
    fn test_required_fields() {
        let config = BatchConfig::default();
        assert!(config.param_source().is_err());

        let aggregated = BatchConfig { sub_cluster: Some("stampede2".to_string()), ..Default::default() };
        assert!(matches!(aggregated.job_batch(), Err(JobError::Configuration(_))));
    }

    #[test]
    fn test_sub_file_alone_is_enough_per_job() {
        let config = BatchConfig { sub_file: Some(PathBuf::from("run.sh")), ..Default::default() };
        let batch = config.job_batch().unwrap();
        assert!(batch.templates.is_empty());
        assert_eq!(batch.mode, SubmissionMode::PerJob);
        assert_eq!(batch.sub_file, PathBuf::from("run.sh"));
    }

    #[test]
    fn test_explicit_program_skips_discovery() {
        let config = BatchConfig {
            sub_prog: Some(PathBuf::from("/opt/pbs/bin/qsub")),
            sleep_time: Some(1.5),
            ..Default::default()
        };
        let program = config.submitter().unwrap().unwrap();
        assert_eq!(program.program, PathBuf::from("/opt/pbs/bin/qsub"));
        assert_eq!(program.sleep_time, Duration::from_millis(1500));

        let negative = BatchConfig { sub_prog: Some(PathBuf::from("qsub")), sleep_time: Some(-1.0), ..Default::default() };
        assert!(negative.submitter().is_err());
    }
}
