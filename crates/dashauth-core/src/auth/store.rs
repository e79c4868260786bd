use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::debug;

use crate::models::{TokenKind, TokenPair, TokenRecord};

/// Token file name in the data directory
const TOKEN_FILE: &str = "tokens.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Token file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token record is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Keychain access failed: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Key-value access to the two persisted tokens.
///
/// Implementors only provide whole-record `load`/`save`; the per-kind
/// operations are read-modify-write over that record.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<TokenRecord, StoreError>;

    fn save(&self, record: &TokenRecord) -> Result<(), StoreError>;

    fn get(&self, kind: TokenKind) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.get(kind).map(str::to_owned))
    }

    fn set(&self, kind: TokenKind, value: &str) -> Result<(), StoreError> {
        let mut record = self.load()?;
        record.set(kind, value.to_owned());
        self.save(&record)
    }

    fn clear(&self, kind: TokenKind) -> Result<(), StoreError> {
        let mut record = self.load()?;
        record.clear(kind);
        self.save(&record)
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        self.save(&TokenRecord::default())
    }

    /// Persist a newly issued pair as one write
    fn store_pair(&self, pair: &TokenPair) -> Result<(), StoreError> {
        let mut record = self.load()?;
        record.apply(pair);
        self.save(&record)
    }
}

/// Token record stored as `tokens.json` under a data directory.
pub struct FileTokenStore {
    dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }

    /// Write to a sibling temp file, then rename over the record.
    fn write_atomic(path: &Path, contents: &str) -> Result<(), StoreError> {
        let tmp = path.with_extension("json.tmp");

        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&tmp)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
        }

        #[cfg(not(unix))]
        fs::write(&tmp, contents)?;

        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<TokenRecord, StoreError> {
        let path = self.path();
        if !path.exists() {
            return Ok(TokenRecord::default());
        }
        let contents = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, record: &TokenRecord) -> Result<(), StoreError> {
        if record.is_empty() {
            return self.clear_all();
        }
        fs::create_dir_all(&self.dir)?;
        let contents = serde_json::to_string_pretty(record)?;
        Self::write_atomic(&self.path(), &contents)?;
        debug!(path = %self.path().display(), "Token record saved");
        Ok(())
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        let path = self.path();
        if path.exists() {
            fs::remove_file(&path)?;
            debug!(path = %path.display(), "Token record removed");
        }
        Ok(())
    }
}

/// Process-local token storage.
#[derive(Default)]
pub struct MemoryTokenStore {
    record: Mutex<TokenRecord>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: TokenRecord) -> Self {
        Self {
            record: Mutex::new(record),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<TokenRecord, StoreError> {
        Ok(self
            .record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, record: &TokenRecord) -> Result<(), StoreError> {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = record.clone();
        Ok(())
    }
}
