//! Scanning the public OpenAlex snapshot for an institution's works.
//!
//! Snapshot data files are gzip-compressed JSON lines, one work per
//! line. Only the first few files of the manifest are scanned; this is a
//! sample, not a full pass over the snapshot.

use std::io::{BufRead, BufReader};

use aphrc_core::work::OpenAlexWork;
use flate2::read::GzDecoder;
use futures::stream::{self, StreamExt};

use crate::api::{OpenAlexApi, OpenAlexError};

/// Lines between progress log messages while scanning a file.
const PROGRESS_EVERY: usize = 10_000;

#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Number of manifest entries scanned.
    pub max_files: usize,
    /// Files downloaded and scanned concurrently.
    pub concurrency: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            max_files: 10,
            concurrency: 4,
        }
    }
}

/// Outcome of scanning one data file.
#[derive(Debug, Clone, Default)]
pub struct FileScan {
    pub matched: Vec<OpenAlexWork>,
    pub lines: usize,
    /// Lines that were not valid work JSON.
    pub malformed: usize,
}

/// Decompress `gz` and keep the works affiliated with `institution_id`.
///
/// A decompression error ends the scan of this file but keeps what was
/// matched before it.
pub fn scan_gzip_lines(gz: &[u8], institution_id: &str) -> FileScan {
    let reader = BufReader::new(GzDecoder::new(gz));
    let mut scan = FileScan::default();

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, lines = scan.lines, "Stopped reading corrupt snapshot file");
                break;
            }
        };
        scan.lines += 1;
        if scan.lines % PROGRESS_EVERY == 0 {
            tracing::debug!(lines = scan.lines, matched = scan.matched.len(), "Scanning snapshot file");
        }
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<OpenAlexWork>(&line) {
            Ok(work) if work.is_affiliated_with(institution_id) => scan.matched.push(work),
            Ok(_) => {}
            Err(_) => scan.malformed += 1,
        }
    }

    scan
}

/// Scan the first [`SnapshotConfig::max_files`] works files of the
/// snapshot. Files that fail to download are logged and skipped.
pub async fn scan_snapshot(
    api: &OpenAlexApi,
    institution_id: &str,
    config: &SnapshotConfig,
) -> Result<Vec<OpenAlexWork>, OpenAlexError> {
    let manifest = api.get_manifest().await?;
    let total_files = manifest.entries.len();
    let urls: Vec<String> = manifest
        .entries
        .into_iter()
        .take(config.max_files)
        .map(|e| e.url)
        .collect();

    tracing::info!(scanning = urls.len(), total_files, "Scanning snapshot files");

    let scans: Vec<(String, Result<FileScan, OpenAlexError>)> = stream::iter(urls)
        .map(|url| async move {
            let result = scan_file(api, &url, institution_id).await;
            (url, result)
        })
        .buffer_unordered(config.concurrency.max(1))
        .collect()
        .await;

    let mut works = Vec::new();
    for (url, result) in scans {
        match result {
            Ok(scan) => {
                tracing::info!(
                    url = %url,
                    lines = scan.lines,
                    matched = scan.matched.len(),
                    malformed = scan.malformed,
                    "Scanned snapshot file",
                );
                works.extend(scan.matched);
            }
            Err(e) => tracing::warn!(url = %url, error = %e, "Skipping snapshot file"),
        }
    }

    Ok(works)
}

async fn scan_file(
    api: &OpenAlexApi,
    url: &str,
    institution_id: &str,
) -> Result<FileScan, OpenAlexError> {
    let bytes = api.download_snapshot_file(url).await?;
    let institution_id = institution_id.to_string();
    tokio::task::spawn_blocking(move || scan_gzip_lines(&bytes, &institution_id))
        .await
        .map_err(|e| OpenAlexError::Decode(format!("scan task failed: {e}")))
}
