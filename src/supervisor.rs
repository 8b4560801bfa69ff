//! Supervisor - outer retry loop around a whole crawl-and-fetch run
//!
//! Each attempt sets up the download directory, discovers tasks with a fresh
//! [`CrawlSession`] and schedules them, all under one per-attempt deadline.
//! Attempt outcomes drive a small state machine ([`transition`]) that decides
//! between success, another attempt and giving up.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::{
    build_http_client, CrawlResult, CrawlSession, Crawler, FetchTask, Fetcher, HttpFetcher,
    PageCollector, RunStatus, Scheduler,
};
use crate::naming::{DefaultNameResolver, MonthYearContextResolver};
use crate::output::{log_summary, write_master_index, DownloadObserver, TracingObserver};
use crate::TrawlError;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Where a supervisor run currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Attempting { attempt: u32 },
    Succeeded { attempt: u32 },
    FailedRetryable { attempt: u32, reason: String },
    FailedFatal { attempt: u32, reason: String },
}

impl SupervisorState {
    /// Number of the current or last attempt (0 before the first)
    pub fn attempt(&self) -> u32 {
        match self {
            Self::Idle => 0,
            Self::Attempting { attempt }
            | Self::Succeeded { attempt }
            | Self::FailedRetryable { attempt, .. }
            | Self::FailedFatal { attempt, .. } => *attempt,
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Attempting { attempt } => write!(f, "running attempt {}", attempt),
            Self::Succeeded { attempt } => write!(f, "succeeded on attempt {}", attempt),
            Self::FailedRetryable { attempt, reason } => {
                write!(f, "failed after attempt {}: {}", attempt, reason)
            }
            Self::FailedFatal { attempt, reason } => {
                write!(f, "failed fatally on attempt {}: {}", attempt, reason)
            }
        }
    }
}

/// Inputs to the supervisor state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    Start,
    AttemptCompleted { success_count: usize },
    AttemptTimedOut,
    AttemptFailed { fatal: bool, reason: String },
    RetryElapsed,
    Cancelled,
}

impl SupervisorEvent {
    fn from_error(error: &TrawlError) -> Self {
        Self::AttemptFailed {
            fatal: error.is_fatal(),
            reason: error.to_string(),
        }
    }
}

/// Computes the next state
///
/// Pairs that make no sense (e.g. `RetryElapsed` while attempting) leave the
/// state unchanged. A retryable failure on the last allowed attempt stays
/// put on `RetryElapsed`, which ends the run.
pub fn transition(
    state: &SupervisorState,
    event: &SupervisorEvent,
    max_attempts: u32,
) -> SupervisorState {
    use SupervisorEvent as E;
    use SupervisorState as S;

    match (state, event) {
        (S::Idle, E::Start) => S::Attempting { attempt: 1 },

        (S::Attempting { attempt }, E::AttemptCompleted { success_count }) if *success_count > 0 => {
            S::Succeeded { attempt: *attempt }
        }
        (S::Attempting { attempt }, E::AttemptCompleted { .. }) => S::FailedRetryable {
            attempt: *attempt,
            reason: "no documents were downloaded".to_string(),
        },
        (S::Attempting { attempt }, E::AttemptTimedOut) => S::FailedRetryable {
            attempt: *attempt,
            reason: "attempt timed out".to_string(),
        },
        (S::Attempting { attempt }, E::AttemptFailed { fatal: true, reason }) => S::FailedFatal {
            attempt: *attempt,
            reason: reason.clone(),
        },
        (S::Attempting { attempt }, E::AttemptFailed { fatal: false, reason }) => {
            S::FailedRetryable {
                attempt: *attempt,
                reason: reason.clone(),
            }
        }

        (S::FailedRetryable { attempt, .. }, E::RetryElapsed) if *attempt < max_attempts => {
            S::Attempting {
                attempt: attempt + 1,
            }
        }

        (S::Idle | S::Attempting { .. } | S::FailedRetryable { .. }, E::Cancelled) => {
            S::FailedFatal {
                attempt: state.attempt(),
                reason: TrawlError::Cancelled.to_string(),
            }
        }

        (other, _) => other.clone(),
    }
}

/// Outer retry and timeout settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub attempt_timeout: Duration,
}

impl SupervisorPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.retry_delay(),
            attempt_timeout: config.attempt_timeout(),
        }
    }
}

/// Final outcome of [`Supervisor::execute`]
#[derive(Debug, Clone)]
pub struct SupervisorReport {
    /// Terminal state of the state machine
    pub state: SupervisorState,

    /// Number of attempts started
    pub attempts: u32,

    /// Result of the last attempt that reached the scheduler
    pub result: CrawlResult,
}

impl SupervisorReport {
    pub fn success(&self) -> bool {
        matches!(self.state, SupervisorState::Succeeded { .. })
    }
}

/// Runs discovery and download with retries, timeouts and cancellation
pub struct Supervisor {
    crawler: Crawler,
    scheduler: Scheduler,
    fetcher: Arc<dyn Fetcher>,
    observer: Arc<dyn DownloadObserver>,
    policy: SupervisorPolicy,
    index_file: Option<String>,
    cancel: CancellationToken,
}

impl Supervisor {
    pub fn new(
        crawler: Crawler,
        scheduler: Scheduler,
        fetcher: Arc<dyn Fetcher>,
        observer: Arc<dyn DownloadObserver>,
        policy: SupervisorPolicy,
    ) -> Self {
        Self {
            crawler,
            scheduler,
            fetcher,
            observer,
            policy,
            index_file: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Wires up the default HTTP stack, naming heuristics and tracing observer
    ///
    /// # Arguments
    ///
    /// * `config` - The loaded configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Supervisor)` - Ready to execute
    /// * `Err(TrawlError)` - The HTTP client could not be built
    pub fn from_config(config: &Config) -> Result<Self, TrawlError> {
        let client = build_http_client(&config.fetcher)?;
        let observer: Arc<dyn DownloadObserver> = Arc::new(TracingObserver::new());

        let extension = config.fetcher.document_extension.clone();
        let collector = PageCollector::new(
            Arc::new(DefaultNameResolver::new(extension.clone())),
            extension,
        );
        let crawler = Crawler::new(
            client.clone(),
            collector,
            Arc::new(MonthYearContextResolver::new(
                config.naming.default_context.clone(),
            )),
            Arc::clone(&observer),
            config.crawler.page_timeout(),
        );

        let scheduler = Scheduler::new(
            config.crawler.max_concurrent_downloads as usize,
            Arc::clone(&observer),
        );
        let fetcher = Arc::new(HttpFetcher::new(client, &config.fetcher));

        let index_file = config
            .output
            .write_index
            .then(|| config.output.index_file.clone());

        Ok(Self::new(
            crawler,
            scheduler,
            fetcher,
            observer,
            SupervisorPolicy::from_config(&config.crawler),
        )
        .with_index_file(index_file))
    }

    /// Writes the master index under this name after a successful attempt
    pub fn with_index_file(mut self, index_file: Option<String>) -> Self {
        self.index_file = index_file;
        self
    }

    /// Uses `cancel` as the root token for every attempt
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn policy(&self) -> &SupervisorPolicy {
        &self.policy
    }

    /// Runs attempts until one succeeds, one fails fatally, or attempts run out
    ///
    /// Never returns an error: every outcome is described by the report.
    pub async fn execute(&self, seed_url: &str, download_dir: &Path) -> SupervisorReport {
        let max_attempts = self.policy.max_attempts;
        let mut state = transition(&SupervisorState::Idle, &SupervisorEvent::Start, max_attempts);
        let mut result = CrawlResult::default();

        self.observer
            .on_start(&format!("Starting download from {}", seed_url));

        while let SupervisorState::Attempting { attempt } = state {
            tracing::info!("Attempt {}/{}", attempt, max_attempts);

            let (event, attempt_result) = self.run_attempt(seed_url, download_dir).await;
            if let Some(attempt_result) = attempt_result {
                result = attempt_result;
            }
            state = transition(&state, &event, max_attempts);

            match &state {
                SupervisorState::FailedRetryable { attempt, reason } if *attempt < max_attempts => {
                    tracing::warn!(
                        "Attempt {} failed ({}); retrying in {:?}",
                        attempt,
                        reason,
                        self.policy.retry_delay
                    );

                    let event = tokio::select! {
                        _ = self.cancel.cancelled() => SupervisorEvent::Cancelled,
                        _ = tokio::time::sleep(self.policy.retry_delay) => SupervisorEvent::RetryElapsed,
                    };
                    state = transition(&state, &event, max_attempts);
                }
                _ => {}
            }
        }

        match &state {
            SupervisorState::Succeeded { .. } => {
                tracing::info!("Download {}", state);
                self.write_index(download_dir, &result, seed_url);
            }
            SupervisorState::FailedFatal { .. } => {
                tracing::error!("Download {}", state);
                self.observer.on_error(&state.to_string());
            }
            _ => {
                tracing::error!("Download {}; giving up", state);
                self.observer.on_error(&state.to_string());
            }
        }

        SupervisorReport {
            attempts: state.attempt(),
            state,
            result,
        }
    }

    /// Runs discovery only, without creating directories or downloading
    pub async fn discover_only(
        &self,
        seed_url: &str,
        download_dir: &Path,
    ) -> Result<Vec<FetchTask>, TrawlError> {
        let mut session = CrawlSession::new(download_dir);
        let deadline = Instant::now() + self.policy.attempt_timeout;

        tokio::time::timeout_at(
            deadline,
            self.crawler.discover(seed_url, &mut session, &self.cancel),
        )
        .await
        .map_err(|_| TrawlError::Timeout(self.policy.attempt_timeout))?
    }

    /// One attempt; returns the event for the state machine and the scheduler's result
    async fn run_attempt(
        &self,
        seed_url: &str,
        download_dir: &Path,
    ) -> (SupervisorEvent, Option<CrawlResult>) {
        if let Err(source) = tokio::fs::create_dir_all(download_dir).await {
            let error = TrawlError::Directory {
                path: download_dir.to_path_buf(),
                source,
            };
            return (SupervisorEvent::from_error(&error), None);
        }

        let attempt_token = self.cancel.child_token();
        let deadline = Instant::now() + self.policy.attempt_timeout;
        let mut session = CrawlSession::new(download_dir);

        let discovered = tokio::time::timeout_at(
            deadline,
            self.crawler.discover(seed_url, &mut session, &attempt_token),
        )
        .await;

        let tasks = match discovered {
            Err(_) => {
                tracing::warn!("Discovery did not finish within {:?}", self.policy.attempt_timeout);
                return (SupervisorEvent::AttemptTimedOut, None);
            }
            Ok(Err(error)) => {
                tracing::warn!("Discovery failed: {}", error);
                return (SupervisorEvent::from_error(&error), None);
            }
            Ok(Ok(tasks)) => tasks,
        };
        drop(session);

        self.observer.on_tasks_identified(tasks.len());

        let outcome = self
            .scheduler
            .run(tasks, Arc::clone(&self.fetcher), Some(deadline), &attempt_token)
            .await;

        log_summary(&outcome.result);

        let event = match outcome.status {
            RunStatus::Completed => SupervisorEvent::AttemptCompleted {
                success_count: outcome.result.success_count,
            },
            RunStatus::TimedOut => SupervisorEvent::AttemptTimedOut,
            RunStatus::Cancelled => SupervisorEvent::from_error(&TrawlError::Cancelled),
        };

        (event, Some(outcome.result))
    }

    fn write_index(&self, download_dir: &Path, result: &CrawlResult, seed_url: &str) {
        let Some(index_file) = &self.index_file else {
            return;
        };

        match write_master_index(download_dir, index_file, &result.completed, seed_url) {
            Ok(path) => tracing::info!(
                "Wrote index of {} files to {}",
                result.completed.len(),
                path.display()
            ),
            Err(e) => tracing::warn!("Failed to write {}: {}", index_file, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_enters_first_attempt() {
        let state = transition(&SupervisorState::Idle, &SupervisorEvent::Start, 3);
        assert_eq!(state, SupervisorState::Attempting { attempt: 1 });
    }

    #[test]
    fn test_success_requires_a_download() {
        let attempting = SupervisorState::Attempting { attempt: 2 };

        let state = transition(
            &attempting,
            &SupervisorEvent::AttemptCompleted { success_count: 4 },
            3,
        );
        assert_eq!(state, SupervisorState::Succeeded { attempt: 2 });

        let state = transition(
            &attempting,
            &SupervisorEvent::AttemptCompleted { success_count: 0 },
            3,
        );
        assert!(matches!(state, SupervisorState::FailedRetryable { attempt: 2, .. }));
    }

    #[test]
    fn test_timeout_is_retryable() {
        let state = transition(
            &SupervisorState::Attempting { attempt: 1 },
            &SupervisorEvent::AttemptTimedOut,
            3,
        );
        assert!(matches!(state, SupervisorState::FailedRetryable { attempt: 1, .. }));

        let state = transition(&state, &SupervisorEvent::RetryElapsed, 3);
        assert_eq!(state, SupervisorState::Attempting { attempt: 2 });
    }

    #[test]
    fn test_fatal_errors_stop_immediately() {
        let dns = TrawlError::Dns {
            url: "https://nowhere.invalid/".to_string(),
            message: "dns error".to_string(),
        };
        let state = transition(
            &SupervisorState::Attempting { attempt: 1 },
            &SupervisorEvent::from_error(&dns),
            3,
        );
        assert!(matches!(state, SupervisorState::FailedFatal { attempt: 1, .. }));

        // Terminal states ignore further events
        assert_eq!(transition(&state, &SupervisorEvent::RetryElapsed, 3), state);
    }

    #[test]
    fn test_retries_bounded_by_max_attempts() {
        let state = SupervisorState::FailedRetryable {
            attempt: 3,
            reason: "attempt timed out".to_string(),
        };
        assert_eq!(transition(&state, &SupervisorEvent::RetryElapsed, 3), state);
    }

    #[test]
    fn test_cancel_during_retry_wait() {
        let state = SupervisorState::FailedRetryable {
            attempt: 1,
            reason: "no documents were downloaded".to_string(),
        };
        let state = transition(&state, &SupervisorEvent::Cancelled, 3);
        assert!(matches!(state, SupervisorState::FailedFatal { attempt: 1, .. }));
    }

    #[test]
    fn test_policy_from_config() {
        let policy = SupervisorPolicy::from_config(&CrawlerConfig::default());
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.retry_delay, Duration::from_secs(5));
        assert_eq!(policy.attempt_timeout, Duration::from_secs(600));
    }

    #[test]
    fn test_report_success() {
        let report = SupervisorReport {
            state: SupervisorState::Succeeded { attempt: 1 },
            attempts: 1,
            result: CrawlResult::default(),
        };
        assert!(report.success());

        let report = SupervisorReport {
            state: SupervisorState::FailedFatal {
                attempt: 1,
                reason: "Operation cancelled".to_string(),
            },
            attempts: 1,
            result: CrawlResult::default(),
        };
        assert!(!report.success());
    }

    #[tokio::test]
    async fn test_directory_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let mut config = Config::default();
        config.crawler.retry_delay_secs = 0;
        let supervisor = Supervisor::from_config(&config).unwrap();
        assert_eq!(supervisor.policy().max_attempts, 3);
        assert_eq!(supervisor.policy().retry_delay, Duration::ZERO);

        let report = supervisor
            .execute("http://127.0.0.1:9/", &blocker.join("downloads"))
            .await;

        assert!(!report.success());
        assert_eq!(report.attempts, 1);
        assert!(matches!(report.state, SupervisorState::FailedFatal { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = Supervisor::from_config(&Config::default()).unwrap();
        supervisor.cancellation_token().cancel();

        let report = supervisor
            .execute("http://127.0.0.1:9/", dir.path())
            .await;

        assert!(matches!(report.state, SupervisorState::FailedFatal { attempt: 1, .. }));
    }
}
