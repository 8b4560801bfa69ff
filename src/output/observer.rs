//! Progress reporting hooks
//!
//! The crawler and scheduler report every lifecycle event through a
//! [`DownloadObserver`]. Observers are called from worker tasks, so
//! implementations must be `Send + Sync`.

use crate::crawler::{FetchError, FetchTask};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Receives progress events for one supervisor run
pub trait DownloadObserver: Send + Sync {
    fn on_start(&self, message: &str);

    fn on_tasks_identified(&self, count: usize);

    fn on_task_start(&self, task: &FetchTask);

    fn on_task_complete(&self, task: &FetchTask);

    fn on_task_error(&self, task: &FetchTask, error: &FetchError);

    /// Called once at the end of every scheduler run
    fn on_complete(&self, success_count: usize);

    fn on_error(&self, message: &str);
}

/// Observer that turns every event into a `tracing` event
///
/// Tasks are numbered in the order they start so interleaved log lines from
/// concurrent downloads can be told apart.
#[derive(Debug, Default)]
pub struct TracingObserver {
    counter: AtomicUsize,
    numbers: Mutex<HashMap<String, usize>>,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn take_number(&self, task: &FetchTask) -> Option<usize> {
        self.numbers
            .lock()
            .ok()
            .and_then(|mut numbers| numbers.remove(&task.file_name))
    }
}

impl DownloadObserver for TracingObserver {
    fn on_start(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn on_tasks_identified(&self, count: usize) {
        tracing::info!("Found {} documents to download", count);
    }

    fn on_task_start(&self, task: &FetchTask) {
        let number = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        if let Ok(mut numbers) = self.numbers.lock() {
            numbers.insert(task.file_name.clone(), number);
        }
        tracing::info!("[{}] Downloading: {}", number, task.file_name);
    }

    fn on_task_complete(&self, task: &FetchTask) {
        match self.take_number(task) {
            Some(number) => tracing::info!("[{}] Completed: {}", number, task.file_name),
            None => tracing::info!("Completed: {}", task.file_name),
        }
    }

    fn on_task_error(&self, task: &FetchTask, error: &FetchError) {
        match self.take_number(task) {
            Some(number) => tracing::error!("[{}] Failed: {} - {}", number, task.file_name, error),
            None => tracing::error!("Failed: {} - {}", task.file_name, error),
        }
    }

    fn on_complete(&self, success_count: usize) {
        tracing::info!("Download run finished: {} files downloaded", success_count);
    }

    fn on_error(&self, message: &str) {
        tracing::warn!("{}", message);
    }
}
