use serde::{Deserialize, Serialize};

/// TravisCI build record, as returned by the v3 `/builds` listing.
///
/// Builds are fetched fresh on every poll cycle and never cached
/// across cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Build {
    /// Unique identifier for the build
    pub id: u64,
    /// Repository the build ran for
    pub repository: Repository,
    /// References to the jobs of this build
    #[serde(default)]
    pub jobs: Vec<JobRef>,
    /// Aggregate build duration in seconds, if the build finished
    #[serde(default)]
    pub duration: Option<i64>,
}

/// Repository a build belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    /// Repository slug, e.g. "moov-io/ach"
    pub slug: String,
}

/// Job reference embedded in a build listing. Only the id is present;
/// the full record comes from a separate `/job/{id}` fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRef {
    pub id: u64,
}

/// Full TravisCI job record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier for the job
    pub id: u64,
    /// When the job started, as `YYYY-MM-DDTHH:MM:SSZ`
    #[serde(default)]
    pub started_at: Option<String>,
    /// When the job finished; absent or empty while still running
    #[serde(default)]
    pub finished_at: Option<String>,
}
