//! Persistence of the price history.
//!
//! The analytics only need two operations from a store: read every record, and
//! append new ones. Any failure here is fatal for the run, because analysing or
//! extending a partially read history would break the one-record-per-day
//! guarantee.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::domain::HistoricalRecord;
use crate::error::AppError;
use crate::series::History;

/// Where the historical baseline lives.
pub trait HistoryStore {
    /// Read the full history (an absent store is an empty history).
    fn load(&self) -> Result<History, AppError>;

    /// Persist records produced by a merge. Existing records are never touched.
    fn append(&mut self, records: &[HistoricalRecord]) -> Result<(), AppError>;
}

/// Flat CSV file: `product_id,date,price,observed_at`.
#[derive(Debug, Clone)]
pub struct CsvHistoryStore {
    path: PathBuf,
}

impl CsvHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the single-writer lock for this store.
    pub fn lock(&self) -> Result<RunLock, AppError> {
        RunLock::acquire(lock_path(&self.path))
    }
}

impl HistoryStore for CsvHistoryStore {
    fn load(&self) -> Result<History, AppError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no history store yet, starting empty");
                return Ok(History::new());
            }
            Err(e) => {
                return Err(AppError::store(format!(
                    "Failed to open history '{}': {e}",
                    self.path.display()
                )));
            }
        };

        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);
        let mut records = Vec::new();
        for (idx, result) in reader.deserialize::<HistoricalRecord>().enumerate() {
            let record = result.map_err(|e| {
                AppError::store(format!(
                    "Corrupt history '{}' at line {}: {e}",
                    self.path.display(),
                    idx + 2
                ))
            })?;
            records.push(record);
        }

        let stored = records.len();
        let history = History::from_records(records);
        if history.len() != stored {
            tracing::warn!(
                path = %self.path.display(),
                ignored = stored - history.len(),
                "history store holds repeated product/day records; keeping the first of each"
            );
        }
        Ok(history)
    }

    fn append(&mut self, records: &[HistoricalRecord]) -> Result<(), AppError> {
        if records.is_empty() {
            return Ok(());
        }

        let needs_header = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AppError::store(format!("Failed to open history '{}' for append: {e}", self.path.display())))?;

        // A file written by other tools may lack the final line terminator.
        let unterminated = ends_without_newline(&mut file)
            .map_err(|e| AppError::store(format!("Failed to read history '{}': {e}", self.path.display())))?;
        if unterminated {
            file.write_all(b"\n")
                .map_err(|e| AppError::store(format!("Failed to append to history: {e}")))?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        for record in records {
            writer
                .serialize(record)
                .map_err(|e| AppError::store(format!("Failed to append to history: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| AppError::store(format!("Failed to flush history: {e}")))?;

        Ok(())
    }
}

/// In-process store, handy for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    records: Vec<HistoricalRecord>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[HistoricalRecord] {
        &self.records
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> Result<History, AppError> {
        Ok(History::from_records(self.records.iter().cloned()))
    }

    fn append(&mut self, records: &[HistoricalRecord]) -> Result<(), AppError> {
        self.records.extend_from_slice(records);
        Ok(())
    }
}

/// Exclusive lock file next to the history store; removed on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(path: PathBuf) -> Result<Self, AppError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => AppError::store(format!(
                    "History store is locked by another run ('{}'). Remove the lock file if no run is in progress.",
                    path.display()
                )),
                _ => AppError::store(format!("Failed to create lock file '{}': {e}", path.display())),
            })?;

        // The pid is informational only.
        let _ = writeln!(file, "{}", std::process::id());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// `true` when the file is non-empty and its last byte is not `\n`.
fn ends_without_newline(file: &mut File) -> std::io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

fn lock_path(store: &Path) -> PathBuf {
    let mut name = OsString::from(store.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn record(id: &str, day: u32, price: f64) -> HistoricalRecord {
        let date = NaiveDate::from_ymd_opt(2024, 10, day).unwrap();
        HistoricalRecord {
            product_id: id.to_string(),
            date,
            price,
            observed_at: date.and_time(NaiveTime::from_hms_milli_opt(9, 30, 0, 250).unwrap()),
        }
    }

    #[test]
    fn missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvHistoryStore::new(dir.path().join("history.csv"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn appends_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvHistoryStore::new(dir.path().join("history.csv"));

        store.append(&[record("milk", 1, 1.25), record("milk", 2, 1.3)]).unwrap();
        store.append(&[record("bread", 1, 2.0)]).unwrap();
        store.append(&[]).unwrap();

        let history = store.load().unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history.records()[0], record("milk", 1, 1.25));
        assert_eq!(history.records()[2], record("bread", 1, 2.0));

        // A single header line.
        let text = fs::read_to_string(store.path()).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with("product_id")).count(), 1);
        assert!(text.starts_with("product_id,date,price,observed_at"));
    }

    #[test]
    fn append_after_unterminated_last_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        fs::write(
            &path,
            "product_id,date,price,observed_at\nmilk,2024-10-01,1.0,2024-10-01T00:00:00",
        )
        .unwrap();

        let mut store = CsvHistoryStore::new(&path);
        assert_eq!(store.load().unwrap().len(), 1);
        store.append(&[record("milk", 2, 1.1)]).unwrap();

        let history = store.load().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.records()[1], record("milk", 2, 1.1));
        assert!(!fs::read_to_string(&path).unwrap().contains("\n\n"));
    }

    #[test]
    fn corrupt_history_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        fs::write(&path, "product_id,date,price,observed_at\nmilk,not-a-date,1.0,2024-10-01T00:00:00\n").unwrap();

        let err = CsvHistoryStore::new(&path).load().unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_STORE);
        assert!(err.message().contains("line 2"));
    }

    #[test]
    fn lock_is_exclusive_and_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvHistoryStore::new(dir.path().join("history.csv"));

        let lock = store.lock().unwrap();
        assert!(lock.path().exists());
        assert!(lock.path().to_string_lossy().ends_with("history.csv.lock"));

        let err = store.lock().unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_STORE);

        let lock_file = lock.path().to_path_buf();
        drop(lock);
        assert!(!lock_file.exists());
        assert!(store.lock().is_ok());
    }

    #[test]
    fn memory_store_round_trips() {
        let mut store = MemoryHistoryStore::new();
        store.append(&[record("tea", 3, 4.0)]).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
        assert_eq!(store.records().len(), 1);
    }
}
