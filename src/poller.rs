use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use log::{debug, error, info};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::auth::Token;
use crate::config::Account;
use crate::error::Result;
use crate::metrics::Metrics;
use crate::travis::client::BUILD_PAGE_LIMIT;
use crate::travis::types::Job;
use crate::travis::TravisClient;

/// Timestamp format used by the TravisCI API.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Polls one TravisCI account on a fixed interval and publishes job
/// durations to the shared metrics registry.
///
/// Each poller runs in its own task; a failing cycle is logged and
/// abandoned, never propagated, so one account's API trouble cannot
/// affect another account or the scrape endpoint.
pub struct AccountPoller {
    /// Account name, used for log context
    account: String,
    /// API client for this account
    client: TravisClient,
    /// Shared metrics registry handle
    metrics: Arc<Metrics>,
    /// Time between poll cycles
    interval: Duration,
    /// Signals the poller to stop
    shutdown: CancellationToken,
}

impl AccountPoller {
    pub fn new(
        account: String,
        client: TravisClient,
        metrics: Arc<Metrics>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            account,
            client,
            metrics,
            interval,
            shutdown,
        }
    }

    /// Run the poll loop until cancelled.
    ///
    /// The first cycle fires immediately, then one per interval tick.
    /// Cycles are strictly sequential within a poller: a cycle finishes
    /// (or is abandoned on error) before the next tick is handled.
    pub async fn run(self) {
        info!(
            "Starting poller for account {} (interval {:?})",
            self.account, self.interval
        );

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Stopping poller for account {}", self.account);
                    break;
                }
                _ = ticker.tick() => self.run_cycle().await,
            }
        }
    }

    /// One fetch-correlate-publish cycle.
    async fn run_cycle(&self) {
        let builds = match self.client.list_builds(BUILD_PAGE_LIMIT).await {
            Ok(builds) => builds,
            Err(e) => {
                error!("Failed to list builds for account {}: {e}", self.account);
                return;
            }
        };

        debug!(
            "Account {}: processing {} builds",
            self.account,
            builds.len()
        );

        for build in &builds {
            for job_ref in &build.jobs {
                // A failed job fetch skips that job only; siblings in
                // the same cycle are still processed.
                let job = match self.client.find_job(job_ref.id).await {
                    Ok(job) => job,
                    Err(e) => {
                        debug!("Skipping job {}: {e}", job_ref.id);
                        continue;
                    }
                };

                if let Some(seconds) = job_duration_seconds(&job) {
                    self.metrics
                        .record_job_duration(job.id, &build.repository.slug, seconds);
                }
            }
        }
    }
}

/// Duration of a finished job in seconds.
///
/// Returns `None` for jobs still running (no finish timestamp) or with
/// timestamps that do not parse under the fixed API format; such jobs
/// are skipped for the cycle with no metric written.
fn job_duration_seconds(job: &Job) -> Option<f64> {
    let started = job.started_at.as_deref().filter(|s| !s.is_empty())?;
    let finished = job.finished_at.as_deref().filter(|s| !s.is_empty())?;

    let started = NaiveDateTime::parse_from_str(started, TIMESTAMP_FORMAT).ok()?;
    let finished = NaiveDateTime::parse_from_str(finished, TIMESTAMP_FORMAT).ok()?;

    Some((finished - started).num_seconds() as f64)
}

/// Starts one independent poller task per configured account and
/// retains their handles for a clean shutdown.
pub struct Supervisor {
    pollers: Vec<(CancellationToken, JoinHandle<()>)>,
}

impl Supervisor {
    /// Spawn one poller per account. Returns immediately; pollers run
    /// as independent tasks on the runtime.
    pub fn spawn(accounts: &[Account], interval: Duration, metrics: Arc<Metrics>) -> Result<Self> {
        let mut supervisor = Self {
            pollers: Vec::with_capacity(accounts.len()),
        };

        for account in accounts {
            let client = TravisClient::new(
                account.endpoint.base_url().to_owned(),
                &Token::from(account.token.as_str()),
            )?;
            supervisor.launch(AccountPoller::new(
                account.name.clone(),
                client,
                Arc::clone(&metrics),
                interval,
                CancellationToken::new(),
            ));
        }

        Ok(supervisor)
    }

    fn launch(&mut self, poller: AccountPoller) {
        let token = poller.shutdown.clone();
        let handle = tokio::spawn(poller.run());
        self.pollers.push((token, handle));
    }

    /// Cancel every poller and wait for each task to finish.
    pub async fn shutdown(self) {
        for (token, _) in &self.pollers {
            token.cancel();
        }
        for (_, handle) in self.pollers {
            let _ = handle.await;
        }
    }
}
