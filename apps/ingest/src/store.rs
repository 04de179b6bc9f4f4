use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

/// One decoded form submission: field name to the list of submitted values.
///
/// Repeated form fields accumulate into the value list in submission order.
/// The map itself is what gets serialized onto the wire and into the store
/// document, as a JSON object of string to array-of-string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(BTreeMap<String, Vec<String>>);

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_value(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store document at {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("store document at {path} is not a JSON object")]
    NotAnObject { path: PathBuf },
    #[error("failed to encode store document: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("store {op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// The single JSON document holding every accepted message, keyed by a
/// microsecond-precision UTC timestamp.
///
/// The store owns its path; callers only get `append` and `read_document`.
/// Appends are serialized through an internal mutex and rewrite the document
/// through a temp-file-plus-rename replace, so readers observe either the
/// prior document or the new one, never a partial write.
#[derive(Clone)]
pub struct MessageStore {
    path: PathBuf,
    append_lock: Arc<Mutex<()>>,
}

impl MessageStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the containing directory and seeds an empty `{}` document when
    /// the file does not exist yet. Existing documents are left untouched.
    pub async fn bootstrap(&self) -> Result<(), StoreError> {
        match tokio::fs::metadata(&self.path).await {
            Ok(_) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                self.persist(&Map::new()).await
            }
            Err(source) => Err(StoreError::Io {
                op: "stat",
                source,
            }),
        }
    }

    /// Appends `message` under a fresh timestamp key and returns that key.
    ///
    /// The full document is re-read from disk on every call; an existing file
    /// that fails to parse refuses the append with `StoreError::Parse` rather
    /// than overwriting whatever is there.
    pub async fn append(&self, message: Message) -> Result<String, StoreError> {
        let _guard = self.append_lock.lock().await;

        let mut document = self.read_document().await?;
        let key = next_key(&document, Utc::now());
        let value = serde_json::to_value(&message).map_err(StoreError::Encode)?;
        document.insert(key.clone(), value);
        self.persist(&document).await?;

        tracing::debug!(
            target: "formrelay.store",
            key = %key,
            entries = document.len(),
            "message appended",
        );
        Ok(key)
    }

    /// Parses the current on-disk document. Absent or empty files read as `{}`.
    pub async fn read_document(&self) -> Result<Map<String, Value>, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Map::new());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    op: "read",
                    source,
                });
            }
        };

        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        let value: Value = serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        match value {
            Value::Object(document) => Ok(document),
            _ => Err(StoreError::NotAnObject {
                path: self.path.clone(),
            }),
        }
    }

    async fn persist(&self, document: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| StoreError::Io {
                        op: "create directory",
                        source,
                    })?;
            }
        }

        let payload = serde_json::to_vec_pretty(document).map_err(StoreError::Encode)?;

        let temp_path = self
            .path
            .with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&temp_path, payload)
            .await
            .map_err(|source| StoreError::Io {
                op: "write",
                source,
            })?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|source| StoreError::Io {
                op: "rename",
                source,
            })
    }
}

/// Formats `now` as a microsecond-precision key; when two appends land inside
/// the same microsecond the later one takes a ` #2`, ` #3`, ... suffix so no
/// entry is ever overwritten.
pub(crate) fn next_key(document: &Map<String, Value>, now: DateTime<Utc>) -> String {
    let base = now.format("%Y-%m-%d %H:%M:%S%.6f").to_string();
    if !document.contains_key(&base) {
        return base;
    }
    let mut attempt = 2u32;
    loop {
        let candidate = format!("{base} #{attempt}");
        if !document.contains_key(&candidate) {
            return candidate;
        }
        attempt += 1;
    }
}
