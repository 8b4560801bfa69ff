//! Master index generation
//!
//! The master index is a plain-text file listing every downloaded document
//! next to the anchor text it was linked under.

use crate::crawler::FetchTask;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes the master index into `dir`
///
/// # Arguments
///
/// * `dir` - The download directory
/// * `file_name` - Name of the index file (e.g. `Master.txt`)
/// * `completed` - Tasks whose document is on disk
/// * `source_url` - The seed URL the documents were discovered from
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path of the written index
/// * `Err(io::Error)` - Failed to create or write the file
pub fn write_master_index(
    dir: &Path,
    file_name: &str,
    completed: &[FetchTask],
    source_url: &str,
) -> std::io::Result<PathBuf> {
    let path = dir.join(file_name);
    let content = format_master_index(completed, source_url);

    let mut file = File::create(&path)?;
    file.write_all(content.as_bytes())?;

    Ok(path)
}

/// Formats the index contents, entries sorted by file name
pub fn format_master_index(completed: &[FetchTask], source_url: &str) -> String {
    let generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");

    let mut entries: Vec<&FetchTask> = completed.iter().collect();
    entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    let mut out = String::new();
    out.push_str("DOWNLOADS - MASTER INDEX\n");
    out.push_str(&"=".repeat(50));
    out.push('\n');
    out.push_str(&format!("Generated: {}\n", generated));
    out.push_str(&format!("Source: {}\n", source_url));
    out.push_str(&format!("Total Files: {}\n\n", entries.len()));

    out.push_str("FILE MAPPINGS:\n");
    out.push_str(&"-".repeat(50));
    out.push('\n');

    for task in entries {
        let title = if task.title.is_empty() {
            task.source_url.as_str()
        } else {
            task.title.as_str()
        };
        out.push_str(&format!("{:<25} → {}\n", task.file_name, title));
    }

    out
}
