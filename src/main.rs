use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::{error, info};

use jobmill::batch::state::JobState;
use jobmill::batch::submit::Submitter;
use jobmill::config::batch::{BatchConfig, BatchFile, ParamTableConfig};
use jobmill::template::tree::TemplateRef;

/// Create one job directory per row of a parameter table and submit it to the cluster
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON batch file; other options are added to or override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Parameter table: delimited text with a header row, or JSON mapping columns to values
    #[arg(short, long)]
    param_table: Option<PathBuf>,

    /// Field separator of the parameter table, a single character or \s+ for whitespace
    #[arg(long)]
    table_sep: Option<String>,

    /// Template copied into every job with variables replaced (SRC or SRC:DEST)
    #[arg(short, long = "template")]
    templates: Vec<TemplateRef>,

    /// File copied into every job unchanged (SRC or SRC:DEST)
    #[arg(long = "copy")]
    copies: Vec<TemplateRef>,

    /// File copied once into the base directory unchanged (SRC or SRC:DEST)
    #[arg(long = "common")]
    common: Vec<TemplateRef>,

    /// Directory job directories are created in [default: .]
    #[arg(short, long)]
    base_dir: Option<PathBuf>,

    /// Submission script template [default: sub.sh]
    #[arg(long)]
    sub_file: Option<PathBuf>,

    /// Submission program, found on PATH (sbatch, then qsub) if not set
    #[arg(long)]
    sub_prog: Option<PathBuf>,

    /// Cluster name; names containing "stampede" submit all jobs as a single job
    #[arg(long)]
    sub_cluster: Option<String>,

    /// Command list written next to the aggregated submission script [default: commandlines]
    #[arg(long)]
    command_file: Option<PathBuf>,

    /// Column holding each job's command in aggregated submission [default: ssubmit_command]
    #[arg(long)]
    command_column: Option<String>,

    /// Cores used by each job in aggregated submission [default: 1]
    #[arg(long)]
    cores_per_job: Option<u32>,

    /// Seconds to wait after each submission [default: 0]
    #[arg(long)]
    sleep_time: Option<f64>,

    /// Create job directories without submitting them
    #[arg(long)]
    no_submit: bool,
}

impl Args {
    /// Merge command line options into a batch file's configuration
    fn into_config(self, mut config: BatchConfig) -> BatchConfig {
        config.file_list.extend(self.templates);
        config.file_copy_list.extend(self.copies);
        config.file_common_list.extend(self.common);

        if let Some(path) = self.param_table {
            config.param_table = Some(ParamTableConfig::Path(path));
        }
        config.table_sep = self.table_sep.or(config.table_sep);
        config.base_dir = self.base_dir.or(config.base_dir);
        config.sub_file = self.sub_file.or(config.sub_file);
        config.sub_prog = self.sub_prog.or(config.sub_prog);
        config.sub_cluster = self.sub_cluster.or(config.sub_cluster);
        config.command_file = self.command_file.or(config.command_file);
        config.command_column = self.command_column.or(config.command_column);
        config.n_cores_per_job = self.cores_per_job.or(config.n_cores_per_job);
        config.sleep_time = self.sleep_time.or(config.sleep_time);
        if self.no_submit {
            config.submit = Some(false);
        }
        config
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(Args::parse()) {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => BatchFile { path: path.clone() }
            .read()
            .with_context(|| format!("Loading batch file {}", path.display()))?,
        None => BatchConfig::default(),
    };
    let config = args.into_config(config);

    let batch = config.job_batch()?;
    let table = config.param_source()?.load().context("Loading param_table")?;
    let mut program = config.submitter()?;
    let submitter = program.as_mut().map(|p| p as &mut dyn Submitter);

    let records = batch.create_jobs(table, submitter).context("Creating jobs")?;

    let count = |state: JobState| records.iter().filter(|r| r.state == state).count();
    info!(
        "Done: {} submitted, {} staged, {} skipped",
        count(JobState::Submitted),
        count(JobState::FilesCopied),
        count(JobState::Skipped)
    );
    Ok(())
}
