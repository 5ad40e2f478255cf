use std::fmt;

/// Clusters whose name contains this bundle all jobs into one submission
pub const AGGREGATED_CLUSTER: &str = "stampede";

/// Cluster used when none is configured
pub const DEFAULT_CLUSTER: &str = "rrlogin";

/// How jobs reach the scheduler
///
/// - PerJob: every job directory gets its own submission script, submitted from that directory
/// - Aggregated: one script at the base directory runs a command list covering every job
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SubmissionMode {
    PerJob,
    Aggregated,
}

impl SubmissionMode {
    pub fn from_cluster(cluster: &str) -> Self {
        if cluster.contains(AGGREGATED_CLUSTER) {
            SubmissionMode::Aggregated
        } else {
            SubmissionMode::PerJob
        }
    }
}

impl fmt::Display for SubmissionMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SubmissionMode::PerJob => write!(f, "per-job"),
            SubmissionMode::Aggregated => write!(f, "aggregated"),
        }
    }
}
