//! Log sink backends.

use async_trait::async_trait;
use herald_core::{SinkBackend, SinkConfig};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::error::SinkError;
use crate::record::LogRecord;

/// Receives records emitted by the dispatcher.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Take ownership of a record and deliver it.
    async fn emit(&self, record: LogRecord) -> Result<(), SinkError>;
}

/// Create a sink based on configuration.
pub fn create_sink(config: &SinkConfig) -> Result<Arc<dyn LogSink>, SinkError> {
    match config.backend {
        SinkBackend::Console => Ok(Arc::new(ConsoleSink)),
        SinkBackend::File => Ok(Arc::new(FileSink::new(&config.file_path)?)),
        SinkBackend::Null => Ok(Arc::new(NullSink)),
    }
}

/// Console sink (human-readable lines on stdout).
pub struct ConsoleSink;

#[async_trait]
impl LogSink for ConsoleSink {
    async fn emit(&self, record: LogRecord) -> Result<(), SinkError> {
        println!("{}", record.to_log_line());
        Ok(())
    }
}

/// File sink (appends JSON Lines).
pub struct FileSink {
    path: PathBuf,
    // serializes appends from concurrent dispatches
    write_lock: Mutex<()>,
}

impl FileSink {
    /// Create a new file sink, creating the file if it does not exist.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl LogSink for FileSink {
    async fn emit(&self, record: LogRecord) -> Result<(), SinkError> {
        let json = serde_json::to_string(&record)?;

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }
}

/// Keeps every record in memory.
#[derive(Default)]
pub struct MemorySink {
    records: RwLock<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records emitted so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LogSink for MemorySink {
    async fn emit(&self, record: LogRecord) -> Result<(), SinkError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| SinkError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        records.push(record);
        Ok(())
    }
}

/// Discards every record.
pub struct NullSink;

#[async_trait]
impl LogSink for NullSink {
    async fn emit(&self, _record: LogRecord) -> Result<(), SinkError> {
        Ok(())
    }
}
