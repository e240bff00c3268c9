//! Output collaborators - status files and poll summaries.
//!
//! The pipeline proper ends at canonical records; this module holds the two
//! small consumers the watch tooling uses. Records are either appended to
//! per-sender status files bucketed into fixed-width time windows, or printed
//! as a one-line-per-poll summary of which devices were heard from.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::decode::{Message, SENDER_KEY};
use crate::error::Result;
use crate::normalize::value_label;

/// Default width of one status-file time window.
pub const DEFAULT_BUCKET_WIDTH: Duration = Duration::from_secs(3600);

/// Appends records to per-sender status files.
///
/// Files are named `status-{sender_node_id}-T{bucket}.json`, one JSON line per
/// record, where `bucket` is the wall-clock time divided into fixed-width
/// windows. Re-running within the same window appends to the same file.
pub struct StatusWriter {
    out_dir: PathBuf,
    bucket_width: Duration,
}

impl StatusWriter {
    /// Writer targeting `out_dir` with the default one-hour windows.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            bucket_width: DEFAULT_BUCKET_WIDTH,
        }
    }

    /// Set the time-window width.
    pub fn with_bucket_width(mut self, bucket_width: Duration) -> Self {
        self.bucket_width = bucket_width;
        self
    }

    /// Append each record to its sender's file for the current window.
    ///
    /// Returns the paths written to, in record order.
    pub fn write(&self, records: &[Message]) -> Result<Vec<PathBuf>> {
        let bucket = self.current_bucket();
        let mut paths = Vec::with_capacity(records.len());

        for record in records {
            let path = self.out_dir.join(self.file_name(record, bucket));
            let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
            let line = serde_json::to_string(record)?;
            writeln!(file, "{}", line)?;
            paths.push(path);
        }

        Ok(paths)
    }

    fn current_bucket(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        now / self.bucket_width.as_secs().max(1)
    }

    fn file_name(&self, record: &Message, bucket: u64) -> String {
        let sender = record
            .get(SENDER_KEY)
            .map(value_label)
            .unwrap_or_else(|| "unknown".to_string());
        format!("status-{}-T{}.json", sender, bucket)
    }

    /// The target directory.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

/// Format the one-line-per-poll summary: timestamp, batch size and the
/// distinct sender ids heard from, followed by one line per record.
pub fn poll_summary(records: &[Message]) -> String {
    let mut senders: Vec<String> = records
        .iter()
        .filter_map(|r| r.get(SENDER_KEY))
        .map(value_label)
        .collect();
    senders.sort();
    senders.dedup();

    let devices = if senders.is_empty() {
        "none".to_string()
    } else {
        senders.join(", ")
    };

    let mut out = format!(
        "--- {} | found {} statuses | devices: {} ---",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        records.len(),
        devices,
    );

    for record in records {
        let sender = record
            .get(SENDER_KEY)
            .map(value_label)
            .unwrap_or_else(|| "?".to_string());
        let line = serde_json::to_string(record).unwrap_or_default();
        out.push_str(&format!("\n{} {}", sender, line));
    }

    out
}
