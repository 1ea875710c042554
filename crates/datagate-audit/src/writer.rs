//! Audit sinks: JSONL and 3-table CSV, with size-based rotation and
//! optional batching. Every file mutation happens under one lock per
//! logger, so concurrent callers never interleave writes or race a
//! rotation.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::AuditError;
use crate::record::{
    AssessmentOutcome, AuditRecord, DataInfo, ExecutionContext, FailedCheck, PerformanceMetrics,
};

const MAIN_COLUMNS: [&str; 13] = [
    "assessment_id",
    "timestamp",
    "function_name",
    "environment",
    "standard_id",
    "standard_version",
    "data_checksum",
    "row_count",
    "overall_score",
    "passed",
    "action_taken",
    "duration_ms",
    "rows_per_second",
];
const DIMENSION_COLUMNS: [&str; 4] = ["assessment_id", "dimension", "earned", "ceiling"];
const FAILED_COLUMNS: [&str; 6] = [
    "assessment_id",
    "rule",
    "dimension",
    "score",
    "weight",
    "narrative",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditFormat {
    Jsonl,
    Csv,
}

#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub enabled: bool,
    pub log_dir: PathBuf,
    pub file_prefix: String,
    pub format: AuditFormat,
    /// Rotate the active file once it exceeds this size.
    pub max_log_size_bytes: u64,
    /// 0 writes immediately; otherwise records accumulate until the
    /// batch fills or `flush` is called.
    pub batch_size: usize,
    pub include_data_samples: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_dir: PathBuf::from("audit_logs"),
            file_prefix: "datagate".to_string(),
            format: AuditFormat::Jsonl,
            max_log_size_bytes: 10 * 1024 * 1024,
            batch_size: 0,
            include_data_samples: false,
        }
    }
}

#[derive(Debug, Default)]
struct LoggerState {
    batch: Vec<AuditRecord>,
}

/// Thread-safe audit sink.
#[derive(Debug)]
pub struct AuditLogger {
    config: AuditConfig,
    state: Mutex<LoggerState>,
}

impl AuditLogger {
    pub fn new(config: AuditConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LoggerState::default()),
        }
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Build and persist a record. Disabled trails return `Ok(None)` and
    /// touch nothing.
    pub fn log_assessment(
        &self,
        outcome: &AssessmentOutcome,
        context: &ExecutionContext,
        data: &DataInfo,
        performance: Option<PerformanceMetrics>,
        failed_checks: &[FailedCheck],
    ) -> Result<Option<AuditRecord>, AuditError> {
        if !self.config.enabled {
            return Ok(None);
        }

        let record = AuditRecord::build(outcome, context, data, performance, failed_checks);
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if self.config.batch_size > 0 {
            state.batch.push(record.clone());
            if state.batch.len() >= self.config.batch_size {
                let batch = std::mem::take(&mut state.batch);
                self.write_records(&batch)?;
            }
        } else {
            self.write_records(std::slice::from_ref(&record))?;
        }

        debug!(
            assessment_id = %record.assessment_metadata.assessment_id,
            action = %record.action_taken,
            "audit record logged"
        );
        Ok(Some(record))
    }

    /// Persist any batched records immediately.
    pub fn flush(&self) -> Result<(), AuditError> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if state.batch.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut state.batch);
        // The lock stays held across the write so file mutations never
        // interleave between callers.
        self.write_records(&batch)
    }

    /// Records currently held in the batch buffer.
    pub fn pending(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.batch.len())
            .unwrap_or(0)
    }

    fn write_records(&self, records: &[AuditRecord]) -> Result<(), AuditError> {
        fs::create_dir_all(&self.config.log_dir)
            .map_err(|e| AuditError::io(&self.config.log_dir, e))?;
        match self.config.format {
            AuditFormat::Jsonl => self.write_jsonl(records),
            AuditFormat::Csv => self.write_csv(records),
        }
    }

    fn jsonl_path(&self) -> PathBuf {
        self.config
            .log_dir
            .join(format!("{}.jsonl", self.config.file_prefix))
    }

    fn csv_path(&self, suffix: &str) -> PathBuf {
        self.config
            .log_dir
            .join(format!("{}_{suffix}.csv", self.config.file_prefix))
    }

    fn write_jsonl(&self, records: &[AuditRecord]) -> Result<(), AuditError> {
        let path = self.jsonl_path();
        rotate_if_oversized(&path, self.config.max_log_size_bytes)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AuditError::io(&path, e))?;
        for record in records {
            let value = record.to_json(self.config.include_data_samples)?;
            serde_json::to_writer(&mut file, &value).map_err(|e| AuditError::Serialize {
                message: e.to_string(),
            })?;
            file.write_all(b"\n").map_err(|e| AuditError::io(&path, e))?;
        }
        Ok(())
    }

    fn write_csv(&self, records: &[AuditRecord]) -> Result<(), AuditError> {
        let main_path = self.csv_path("audit");
        // Rotation is driven by the main table; the side tables rotate
        // with it so the three files stay aligned per assessment id.
        // A fresh post-rotation file gets its headers re-written below.
        if rotate_if_oversized(&main_path, self.config.max_log_size_bytes)? {
            rotate_now(&self.csv_path("dimensions"))?;
            rotate_now(&self.csv_path("failed_checks"))?;
        }

        let mut main = open_csv(&main_path, &MAIN_COLUMNS)?;
        let mut dimensions = open_csv(&self.csv_path("dimensions"), &DIMENSION_COLUMNS)?;
        let mut failed = open_csv(&self.csv_path("failed_checks"), &FAILED_COLUMNS)?;

        for record in records {
            let tables = record.to_tables();
            write_row(&mut main, &main_path, &MAIN_COLUMNS, &tables.main)?;
            for row in &tables.dimensions {
                write_row(&mut dimensions, &self.csv_path("dimensions"), &DIMENSION_COLUMNS, row)?;
            }
            for row in &tables.failed_checks {
                write_row(&mut failed, &self.csv_path("failed_checks"), &FAILED_COLUMNS, row)?;
            }
        }
        for (writer, path) in [
            (&mut main, self.csv_path("audit")),
            (&mut dimensions, self.csv_path("dimensions")),
            (&mut failed, self.csv_path("failed_checks")),
        ] {
            writer.flush().map_err(|e| AuditError::io(&path, e))?;
        }
        Ok(())
    }
}

/// Rotate `path` to `<stem>.<yyyymmddHHMMSS>.<ext>` when oversized.
/// Returns whether a rotation happened.
fn rotate_if_oversized(path: &Path, max_bytes: u64) -> Result<bool, AuditError> {
    let Ok(metadata) = fs::metadata(path) else {
        return Ok(false);
    };
    if metadata.len() <= max_bytes {
        return Ok(false);
    }
    rotate_now(path)?;
    Ok(true)
}

fn rotate_now(path: &Path) -> Result<(), AuditError> {
    if !path.exists() {
        return Ok(());
    }
    let stamp = Utc::now().format("%Y%m%d%H%M%S");
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audit");
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("log");
    // The stamp is second-granular; a second rotation in the same second
    // must not overwrite the first, so bump a counter suffix until free.
    let mut rotated = path.with_file_name(format!("{stem}.{stamp}.{extension}"));
    let mut attempt = 1u32;
    while rotated.exists() {
        rotated = path.with_file_name(format!("{stem}.{stamp}.{attempt}.{extension}"));
        attempt += 1;
    }
    fs::rename(path, &rotated).map_err(|e| AuditError::io(path, e))?;
    debug!(from = %path.display(), to = %rotated.display(), "audit log rotated");
    Ok(())
}

/// Open for append; a file that did not exist yet gets its header row.
fn open_csv(path: &Path, columns: &[&str]) -> Result<csv::Writer<File>, AuditError> {
    let fresh = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AuditError::io(path, e))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if fresh {
        writer
            .write_record(columns)
            .map_err(|e| AuditError::csv(path, e))?;
    }
    Ok(writer)
}

fn write_row(
    writer: &mut csv::Writer<File>,
    path: &Path,
    columns: &[&str],
    row: &std::collections::BTreeMap<String, JsonValue>,
) -> Result<(), AuditError> {
    let cells: Vec<String> = columns
        .iter()
        .map(|column| match row.get(*column) {
            Some(JsonValue::String(s)) => s.clone(),
            Some(JsonValue::Null) | None => String::new(),
            Some(other) => other.to_string(),
        })
        .collect();
    writer
        .write_record(&cells)
        .map_err(|e| AuditError::csv(path, e))
}
