//! Directory ingestion orchestrator
//!
//! Resolves the expected file for each of the last N business days, refuses to
//! start if any is missing, then ingests the files concurrently. Each worker
//! consults the ledger, optionally deletes the day's trades when forced, parses
//! the file and records the day in the ledger.

use super::group::TaskGroup;
use super::parser::{self, DEFAULT_BATCH_SIZE};
use super::store::TradeStore;
use crate::calendar;
use crate::error::{AppError, Result};
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// File name layout, DD-MM-YYYY
pub const FILE_DATE_FORMAT: &str = "%d-%m-%Y";

/// Fixed suffix following the date in every input file name
pub const FILE_SUFFIX: &str = "_NEGOCIOSAVISTA.txt";

/// Upper bound for both the day window and worker parallelism
pub const MAX_DAYS: usize = 7;

/// Options for one ingestion run
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Business days to ingest, clamped to 1..=7
    pub days: i64,
    /// Concurrent workers; 0 or less picks min(7, available cores)
    pub parallelism: i64,
    /// Re-ingest days already recorded in the ledger
    pub force: bool,
    pub batch_size: usize,
    /// Last calendar day of the window; today at the exchange when unset
    pub as_of: Option<NaiveDate>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            days: MAX_DAYS as i64,
            parallelism: 0,
            force: false,
            batch_size: DEFAULT_BATCH_SIZE,
            as_of: None,
        }
    }
}

impl IngestOptions {
    pub fn effective_days(&self) -> usize {
        self.days.clamp(1, MAX_DAYS as i64) as usize
    }

    pub fn effective_parallelism(&self) -> usize {
        if self.parallelism > 0 {
            return self.parallelism.min(MAX_DAYS as i64) as usize;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(MAX_DAYS)
    }
}

/// What happened to one file
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Ingested {
        day: NaiveDate,
        file: String,
        rows: usize,
        /// Earlier data for the day was deleted first
        replaced: bool,
    },
    Skipped {
        day: NaiveDate,
        file: String,
    },
}

impl FileOutcome {
    pub fn day(&self) -> NaiveDate {
        match self {
            FileOutcome::Ingested { day, .. } | FileOutcome::Skipped { day, .. } => *day,
        }
    }
}

/// Summary of a successful run, most recent day first
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub files: Vec<FileOutcome>,
}

impl IngestReport {
    pub fn rows(&self) -> usize {
        self.files
            .iter()
            .map(|f| match f {
                FileOutcome::Ingested { rows, .. } => *rows,
                FileOutcome::Skipped { .. } => 0,
            })
            .sum()
    }

    pub fn skipped(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f, FileOutcome::Skipped { .. }))
            .count()
    }
}

/// Expected file name for a business day
pub fn file_name_for(day: NaiveDate) -> String {
    format!("{}{}", day.format(FILE_DATE_FORMAT), FILE_SUFFIX)
}

/// Business day encoded in an input file name
pub fn date_from_file_name(name: &str) -> Result<NaiveDate> {
    let date_part = name.strip_suffix(FILE_SUFFIX).unwrap_or(name);
    NaiveDate::parse_from_str(date_part, FILE_DATE_FORMAT).map_err(|source| {
        AppError::FilenameDate {
            file: name.to_string(),
            source,
        }
    })
}

/// Expected file paths for the run window, most recent day first.
///
/// Fails with every missing name before any work starts.
pub fn resolve_files(dir: &Path, days: &[NaiveDate]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::with_capacity(days.len());
    let mut missing = Vec::new();

    for day in days {
        let name = file_name_for(*day);
        let full = dir.join(&name);
        match std::fs::metadata(&full) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => missing.push(name),
            Err(e) => return Err(AppError::Io(e).in_file(full)),
        }
        files.push(full);
    }

    if !missing.is_empty() {
        return Err(AppError::MissingFiles(missing));
    }
    Ok(files)
}

/// Ingest the last `options.days` business days of files from `dir`.
///
/// Returns the first worker error; already-ingested days are skipped unless
/// `options.force` is set.
pub async fn process_directory(
    cancel: &CancellationToken,
    dir: &Path,
    store: Arc<dyn TradeStore>,
    options: &IngestOptions,
) -> Result<IngestReport> {
    let days = options.effective_days();
    let as_of = options.as_of.unwrap_or_else(calendar::exchange_today);
    let dates = calendar::business_days_ending(days, as_of);

    let started = Instant::now();
    let files = resolve_files(dir, &dates)?;
    info!(files = files.len(), dir = %dir.display(), "ingestion start");

    let max_parallel = options.effective_parallelism();
    info!(max_parallel, force = options.force, "ingestion configured");

    let total = files.len();
    let outcomes: Arc<Mutex<Vec<FileOutcome>>> = Arc::new(Mutex::new(Vec::with_capacity(total)));
    let mut group = TaskGroup::new(cancel, max_parallel);

    for (idx, file) in files.into_iter().enumerate() {
        let store = store.clone();
        let outcomes = outcomes.clone();
        let job = FileJob {
            idx: idx + 1,
            total,
            path: file,
            force: options.force,
            batch_size: options.batch_size,
        };

        group
            .spawn_blocking(move |cancel| {
                let outcome = job.run(&cancel, store.as_ref())?;
                outcomes.lock().push(outcome);
                Ok(())
            })
            .await?;
    }

    group.wait().await?;

    let mut files = std::mem::take(&mut *outcomes.lock());
    files.sort_by(|a, b| b.day().cmp(&a.day()));
    let report = IngestReport { files };
    info!(
        files = report.files.len(),
        rows = report.rows(),
        skipped = report.skipped(),
        elapsed = ?started.elapsed(),
        "ingestion complete"
    );
    Ok(report)
}

/// One file's strictly sequential steps
struct FileJob {
    idx: usize,
    total: usize,
    path: PathBuf,
    force: bool,
    batch_size: usize,
}

impl FileJob {
    fn run(&self, cancel: &CancellationToken, store: &dyn TradeStore) -> Result<FileOutcome> {
        let start = Instant::now();
        let base = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if cancel.is_cancelled() {
            info!(idx = self.idx, total = self.total, file = %base, "cancelled before start");
            return Err(AppError::Cancelled.in_file(&self.path));
        }
        info!(idx = self.idx, total = self.total, file = %base, "file start");

        let day = date_from_file_name(&base).map_err(|e| {
            error!(file = %base, "invalid date in file name: {}", e);
            e.in_file(&self.path)
        })?;

        let exists = store.has_ingestion_for_date(day).map_err(|e| {
            error!(file = %base, "check ingestion log failed: {}", e);
            e.in_file(&self.path)
        })?;

        if exists && !self.force {
            info!(idx = self.idx, total = self.total, file = %base, skipped = true, "already ingested");
            return Ok(FileOutcome::Skipped { day, file: base });
        }

        if exists {
            // a day must never lose its trades while keeping its ledger entry
            if cancel.is_cancelled() {
                return Err(AppError::Cancelled.in_file(&self.path));
            }
            store.delete_trades_by_date(day).map_err(|e| {
                error!(file = %base, "delete existing failed: {}", e);
                e.in_file(&self.path)
            })?;
        }

        let rows = parser::parse_file(cancel, &self.path, store, self.batch_size).map_err(|e| {
            error!(file = %base, elapsed = ?start.elapsed(), "file failed: {}", e);
            e.in_file(&self.path)
        })?;

        store.upsert_ingestion_log(day, &base, rows).map_err(|e| {
            error!(file = %base, "update ingestion log failed: {}", e);
            e.in_file(&self.path)
        })?;

        info!(
            idx = self.idx,
            total = self.total,
            file = %base,
            rows,
            elapsed = ?start.elapsed(),
            force = self.force,
            "file done"
        );

        Ok(FileOutcome::Ingested {
            day,
            file: base,
            rows,
            replaced: exists,
        })
    }
}
