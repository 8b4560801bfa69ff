//! End-of-attempt summary logging

use crate::crawler::CrawlResult;

/// Logs success, failure and total counts, then every recorded error
pub fn log_summary(result: &CrawlResult) {
    tracing::info!(
        "Summary: {} succeeded, {} failed, {} total",
        result.success_count,
        result.failure_count,
        result.total_attempted()
    );

    for error in &result.errors {
        tracing::warn!("  {}", error);
    }
}

/// One-line form of the counts, used in the final status message
pub fn format_counts(result: &CrawlResult) -> String {
    format!(
        "{}/{} documents downloaded",
        result.success_count,
        result.total_attempted()
    )
}
