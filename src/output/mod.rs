//! Output module for progress reporting and run artifacts
//!
//! This module handles:
//! - Progress events through the [`DownloadObserver`] hooks
//! - Writing the master index of downloaded documents
//! - Logging end-of-attempt summaries

pub mod index;
mod observer;
pub mod summary;

pub use index::write_master_index;
pub use observer::{DownloadObserver, TracingObserver};
pub use summary::log_summary;
