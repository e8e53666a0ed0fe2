//! Durable storage backends for the snapshot document
//!
//! A backend stores one opaque byte document. Writes are all-or-nothing:
//! after `write` returns either the new document is durable or the previous
//! one is still in place.
//!
//! - [`FileBackend`] - JSON file, replaced through an atomic rename
//! - [`MemoryBackend`] - in-process, for tests and embedding
//! - `RocksBackend` - single key in RocksDB (feature `rocksdb`)

use crate::{config::StorageConfig, Error, Result};
use parking_lot::Mutex;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Byte-level snapshot persistence
pub trait Backend: Send + Sync {
    /// Read the stored document, `None` when nothing was stored yet
    fn read(&self) -> Result<Option<Vec<u8>>>;

    /// Replace the stored document
    fn write(&self, bytes: &[u8]) -> Result<()>;

    /// Short name for logs
    fn describe(&self) -> String;
}

/// Open the backend selected by configuration
pub fn open_backend(config: &StorageConfig) -> Result<Box<dyn Backend>> {
    match config.backend.as_str() {
        "file" => Ok(Box::new(FileBackend::open(&config.data_dir, &config.state_file)?)),
        "memory" => Ok(Box::new(MemoryBackend::new())),
        #[cfg(feature = "rocksdb")]
        "rocksdb" => Ok(Box::new(RocksBackend::open(&config.data_dir, &config.state_key)?)),
        other => Err(Error::Config(format!("Unknown storage backend: {}", other))),
    }
}

/// Snapshot stored as a single file
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
    path: PathBuf,
}

impl FileBackend {
    /// Open (and create) the data directory
    pub fn open(data_dir: impl AsRef<Path>, file_name: &str) -> Result<Self> {
        let dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(file_name);

        tracing::info!(path = %path.display(), "Opened file snapshot backend");

        Ok(Self { dir, path })
    }

    /// Location of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Backend for FileBackend {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        // Temp file in the same directory so the rename stays on one filesystem
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| Error::Storage(format!("Failed to replace snapshot: {}", e)))?;

        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "Snapshot written");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// Snapshot kept in memory only
#[derive(Debug, Default)]
pub struct MemoryBackend {
    document: Mutex<Option<Vec<u8>>>,
}

impl MemoryBackend {
    /// Empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-loaded with a document
    pub fn with_document(bytes: Vec<u8>) -> Self {
        Self {
            document: Mutex::new(Some(bytes)),
        }
    }
}

impl Backend for MemoryBackend {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.document.lock().clone())
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        *self.document.lock() = Some(bytes.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Snapshot stored under one key in RocksDB
#[cfg(feature = "rocksdb")]
pub struct RocksBackend {
    db: rocksdb::DB,
    key: String,
}

#[cfg(feature = "rocksdb")]
impl RocksBackend {
    /// Open or create database
    pub fn open(data_dir: impl AsRef<Path>, key: &str) -> Result<Self> {
        let path = data_dir.as_ref();
        std::fs::create_dir_all(path)?;

        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = rocksdb::DB::open(&opts, path)?;
        tracing::info!(path = ?path, key, "Opened RocksDB snapshot backend");

        Ok(Self {
            db,
            key: key.to_string(),
        })
    }
}

#[cfg(feature = "rocksdb")]
impl Backend for RocksBackend {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(self.key.as_bytes())?)
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        let mut write_opts = rocksdb::WriteOptions::default();
        write_opts.set_sync(true);
        self.db.put_opt(self.key.as_bytes(), bytes, &write_opts)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("rocksdb:{}", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_backend_missing_file_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path(), "books.json").unwrap();
        assert!(backend.read().unwrap().is_none());
    }

    #[test]
    fn test_file_backend_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path().join("nested"), "books.json").unwrap();

        backend.write(b"{\"a\":1}").unwrap();
        backend.write(b"{\"a\":2}").unwrap();

        assert_eq!(backend.read().unwrap().unwrap(), b"{\"a\":2}".to_vec());
        // Only the snapshot file remains, no stray temp files
        let entries = std::fs::read_dir(dir.path().join("nested")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_memory_backend() {
        let backend = MemoryBackend::new();
        assert!(backend.read().unwrap().is_none());
        backend.write(b"x").unwrap();
        assert_eq!(backend.read().unwrap(), Some(b"x".to_vec()));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let config = StorageConfig {
            backend: "floppy".to_string(),
            ..StorageConfig::default()
        };
        assert!(matches!(open_backend(&config), Err(Error::Config(_))));
    }
}
