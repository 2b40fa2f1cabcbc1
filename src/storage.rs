use std::fmt::{Display, Formatter};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::domain::{FieldNaming, Reading, denormalize};

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    JsonDecode(serde_json::Error),
    JsonEncode(serde_json::Error),
    Unsupported(&'static str),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::JsonDecode(err) => write!(f, "failed to parse readings file: {err}"),
            StorageError::JsonEncode(err) => write!(f, "failed to encode readings: {err}"),
            StorageError::Unsupported(operation) => {
                write!(f, "storage backend does not support {operation}")
            }
        }
    }
}

impl std::error::Error for StorageError {}

/// Durable home of the reading array. Rows are keyed by `timestamp`.
pub trait StorageBackend {
    /// Raw rows as stored; the record store normalizes them.
    fn load_all(&mut self) -> Result<Vec<Value>, StorageError>;

    /// Inserts or replaces the row with the same timestamp.
    fn put(&mut self, reading: &Reading) -> Result<(), StorageError>;

    fn delete(&mut self, _timestamp: i64) -> Result<(), StorageError> {
        Err(StorageError::Unsupported("delete"))
    }

    fn clear(&mut self) -> Result<(), StorageError>;

    fn describe(&self) -> String;
}

/// A JSON array on disk, rewritten in full on every change.
pub struct JsonFileBackend {
    path: PathBuf,
    naming: FieldNaming,
    rows: Option<Vec<Value>>,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            naming: FieldNaming::Canonical,
            rows: None,
        }
    }

    /// Key set for rows written from now on. Existing rows keep theirs until replaced.
    pub fn with_naming(mut self, naming: FieldNaming) -> Self {
        self.naming = naming;
        self
    }

    fn rows_mut(&mut self) -> Result<&mut Vec<Value>, StorageError> {
        if self.rows.is_none() {
            self.rows = Some(read_rows(&self.path)?);
        }
        Ok(self.rows.get_or_insert_with(Vec::new))
    }

    fn flush(&self) -> Result<(), StorageError> {
        let rows = self.rows.as_deref().unwrap_or_default();
        write_rows(&self.path, rows)
    }
}

impl StorageBackend for JsonFileBackend {
    fn load_all(&mut self) -> Result<Vec<Value>, StorageError> {
        let rows = read_rows(&self.path)?;
        self.rows = Some(rows.clone());
        Ok(rows)
    }

    fn put(&mut self, reading: &Reading) -> Result<(), StorageError> {
        let row = denormalize(reading, self.naming).map_err(StorageError::JsonEncode)?;
        let rows = self.rows_mut()?;
        upsert_row(rows, reading.timestamp, row);
        self.flush()
    }

    fn delete(&mut self, timestamp: i64) -> Result<(), StorageError> {
        let rows = self.rows_mut()?;
        rows.retain(|row| row_timestamp(row) != Some(timestamp));
        self.flush()
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.rows = Some(Vec::new());
        self.flush()
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Keeps rows for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    rows: Vec<Value>,
}

impl MemoryBackend {
    #[cfg(test)]
    pub fn with_rows(rows: Vec<Value>) -> Self {
        Self { rows }
    }
}

impl StorageBackend for MemoryBackend {
    fn load_all(&mut self) -> Result<Vec<Value>, StorageError> {
        Ok(self.rows.clone())
    }

    fn put(&mut self, reading: &Reading) -> Result<(), StorageError> {
        let row = denormalize(reading, FieldNaming::Canonical).map_err(StorageError::JsonEncode)?;
        upsert_row(&mut self.rows, reading.timestamp, row);
        Ok(())
    }

    fn delete(&mut self, timestamp: i64) -> Result<(), StorageError> {
        self.rows.retain(|row| row_timestamp(row) != Some(timestamp));
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.rows.clear();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

fn read_rows(path: &Path) -> Result<Vec<Value>, StorageError> {
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(StorageError::Io(err)),
    };

    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<Value>(&raw).map_err(StorageError::JsonDecode)? {
        Value::Array(rows) => Ok(rows),
        Value::Object(mut wrapper) => match wrapper.remove("readings") {
            Some(Value::Array(rows)) => Ok(rows),
            _ => Ok(Vec::new()),
        },
        _ => Ok(Vec::new()),
    }
}

fn write_rows(path: &Path, rows: &[Value]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }
    }

    let encoded = serde_json::to_string_pretty(rows).map_err(StorageError::JsonEncode)?;
    let mut temp_path = path.as_os_str().to_owned();
    temp_path.push(".tmp");
    let temp_path = PathBuf::from(temp_path);

    let mut file = fs::File::create(&temp_path).map_err(StorageError::Io)?;
    file.write_all(encoded.as_bytes()).map_err(StorageError::Io)?;
    file.write_all(b"\n").map_err(StorageError::Io)?;
    file.sync_all().map_err(StorageError::Io)?;
    fs::rename(&temp_path, path).map_err(StorageError::Io)?;

    Ok(())
}

fn upsert_row(rows: &mut Vec<Value>, timestamp: i64, row: Value) {
    if let Some(existing) = rows
        .iter_mut()
        .find(|existing| row_timestamp(existing) == Some(timestamp))
    {
        *existing = row;
    } else {
        rows.push(row);
    }
}

fn row_timestamp(row: &Value) -> Option<i64> {
    crate::domain::normalize_record(row)
        .map(|reading| reading.timestamp)
        .or_else(|| row.get("timestamp").and_then(Value::as_i64))
}
