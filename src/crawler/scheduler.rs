//! Scheduler for running fetch tasks under a concurrency ceiling
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Fanning tasks out onto the tokio runtime
//! - Aggregating per-task outcomes into a [`CrawlResult`]
//! - Honouring the caller's deadline and cancellation token

use crate::crawler::fetcher::{FetchError, FetchOutcome, Fetcher};
use crate::crawler::task::{CrawlResult, FetchTask};
use crate::output::DownloadObserver;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How long in-flight tasks get to observe cancellation before they are aborted
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// How a scheduler run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every task reached a terminal outcome
    Completed,

    /// The deadline passed first; unfinished tasks were counted as failures
    TimedOut,

    /// The parent token fired first; unfinished tasks were counted as failures
    Cancelled,
}

/// Result of one [`Scheduler::run`]
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    pub result: CrawlResult,
    pub status: RunStatus,
}

type Joined = (FetchTask, Result<FetchOutcome, FetchError>);

/// Runs fetch tasks with at most `max_concurrent` in flight
///
/// One tokio task is spawned per fetch task. Each acquires a semaphore permit
/// before calling the fetcher, so admission is bounded while all tasks are
/// already queued on the runtime. Outcomes are aggregated on the calling
/// task as they are joined, which keeps the counters lock-free.
pub struct Scheduler {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    observer: Arc<dyn DownloadObserver>,
    grace_period: Duration,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `max_concurrent` - Maximum number of fetches in flight (at least 1)
    /// * `observer` - Receives per-task progress events
    pub fn new(max_concurrent: usize, observer: Arc<dyn DownloadObserver>) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            observer,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Runs every task to a terminal outcome, or until the deadline or cancellation
    ///
    /// A failing task never affects its siblings. When the deadline passes or
    /// `cancel` fires, the run's own child token is cancelled, in-flight tasks
    /// get a short grace period to return, and stragglers are aborted. Any
    /// task without a successful outcome is counted as a failure, so
    /// `success_count + failure_count` always equals the number of tasks.
    ///
    /// # Arguments
    ///
    /// * `tasks` - The fetch tasks to run
    /// * `fetcher` - Performs each individual fetch
    /// * `deadline` - Optional instant after which the run is cut short
    /// * `cancel` - Parent cancellation token
    pub async fn run(
        &self,
        tasks: Vec<FetchTask>,
        fetcher: Arc<dyn Fetcher>,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> ScheduleOutcome {
        let run_token = cancel.child_token();
        // Keyed by runtime task id so duplicate file names are still counted apart
        let mut pending: HashMap<Id, String> = HashMap::with_capacity(tasks.len());
        let mut set: JoinSet<Joined> = JoinSet::new();

        for task in tasks {
            let file_name = task.file_name.clone();

            let semaphore = Arc::clone(&self.semaphore);
            let fetcher = Arc::clone(&fetcher);
            let observer = Arc::clone(&self.observer);
            let token = run_token.clone();

            let handle = set.spawn(async move {
                let outcome =
                    fetch_with_permit(&task, &semaphore, fetcher.as_ref(), observer.as_ref(), &token)
                        .await;
                (task, outcome)
            });
            pending.insert(handle.id(), file_name);
        }

        let mut result = CrawlResult::default();

        let expiry = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(expiry);

        let status = loop {
            tokio::select! {
                joined = set.join_next_with_id() => match joined {
                    Some(joined) => record(&mut result, &mut pending, joined),
                    None => break RunStatus::Completed,
                },
                _ = &mut expiry => break RunStatus::TimedOut,
                _ = cancel.cancelled() => break RunStatus::Cancelled,
            }
        };

        if status != RunStatus::Completed {
            tracing::warn!(
                "Download run {:?} with {} tasks unfinished; cancelling",
                status,
                pending.len()
            );
            run_token.cancel();

            let grace = tokio::time::sleep(self.grace_period);
            tokio::pin!(grace);
            loop {
                tokio::select! {
                    joined = set.join_next_with_id() => match joined {
                        Some(joined) => record(&mut result, &mut pending, joined),
                        None => break,
                    },
                    _ = &mut grace => break,
                }
            }

            // Keep outcomes that landed before the abort; the rest stay in `pending`
            set.abort_all();
            while let Some(joined) = set.join_next_with_id().await {
                match joined {
                    Err(e) if e.is_cancelled() => {}
                    joined => record(&mut result, &mut pending, joined),
                }
            }

            let reason = match status {
                RunStatus::TimedOut => "timed out",
                _ => "was cancelled",
            };
            for (_, file_name) in pending.drain() {
                result.record_failure(format!("Download of {} {}", file_name, reason));
            }
        }

        self.observer.on_complete(result.success_count);

        ScheduleOutcome { result, status }
    }
}

/// Waits for a permit, then fetches and reports the outcome to the observer
async fn fetch_with_permit(
    task: &FetchTask,
    semaphore: &Arc<Semaphore>,
    fetcher: &dyn Fetcher,
    observer: &dyn DownloadObserver,
    token: &CancellationToken,
) -> Result<FetchOutcome, FetchError> {
    let _permit = tokio::select! {
        _ = token.cancelled() => return Err(FetchError::Cancelled),
        permit = Arc::clone(semaphore).acquire_owned() => permit.map_err(|_| FetchError::Cancelled)?,
    };

    observer.on_task_start(task);
    let outcome = fetcher.fetch(task, token).await;

    match &outcome {
        Ok(FetchOutcome::AlreadyPresent { bytes }) => {
            tracing::debug!("{} already on disk ({} bytes)", task.file_name, bytes);
            observer.on_task_complete(task);
        }
        Ok(FetchOutcome::Downloaded { bytes, attempts }) => {
            tracing::debug!(
                "{} downloaded ({} bytes, {} attempt(s))",
                task.file_name,
                bytes,
                attempts
            );
            observer.on_task_complete(task);
        }
        Err(e) => observer.on_task_error(task, e),
    }

    outcome
}

fn record(
    result: &mut CrawlResult,
    pending: &mut HashMap<Id, String>,
    joined: Result<(Id, Joined), JoinError>,
) {
    match joined {
        Ok((id, (task, Ok(_)))) => {
            pending.remove(&id);
            result.record_success(task);
        }
        Ok((id, (task, Err(e)))) => {
            pending.remove(&id);
            result.record_failure(format!("Failed to download {}: {}", task.file_name, e));
        }
        Err(e) => {
            let file_name = pending.remove(&e.id()).unwrap_or_default();
            tracing::error!("Download task for {} did not complete: {}", file_name, e);
            result.record_failure(format!("Download of {} did not complete: {}", file_name, e));
        }
    }
}
