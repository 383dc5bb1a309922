//! Flat staging directory shared by uploads and surgery outputs.
//!
//! Uploads are stored as `<millis>-<original name>`; outputs as
//! `nice_<original name>`. The millisecond stamp is forced to be strictly
//! increasing within the process, so two uploads never share a stored name
//! even when they land in the same millisecond.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

/// Only presentations are accepted.
pub const ACCEPTED_EXTENSION: &str = "pptx";

/// Prefix of the file a surgery pass writes.
pub const OUTPUT_PREFIX: &str = "nice_";

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("Only .pptx files are allowed!")]
    InvalidExtension { name: String },

    #[error("Invalid file name: {name:?}")]
    InvalidName { name: String },

    #[error("File not found: {name}")]
    NotFound { name: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A file accepted into the staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub stored_name: String,
    pub original_name: String,
    pub path: PathBuf,
}

pub struct Staging {
    root: PathBuf,
    last_stamp: AtomicU64,
}

impl Staging {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            last_stamp: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the staging directory if missing. Idempotent and safe to race.
    pub async fn ensure_dir(&self) -> Result<(), StagingError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StagingError::Io {
                path: self.root.clone(),
                source,
            })
    }

    /// Validate an uploaded file name and reserve a unique stored name for
    /// it. Nothing is written yet apart from the directory itself.
    pub async fn allocate(&self, uploaded_name: &str) -> Result<StagedFile, StagingError> {
        let original_name = base_name(uploaded_name)?;
        if !has_accepted_extension(&original_name) {
            return Err(StagingError::InvalidExtension {
                name: original_name,
            });
        }

        self.ensure_dir().await?;

        let stored_name = format!("{}-{}", self.next_stamp(), original_name);
        let path = self.root.join(&stored_name);
        Ok(StagedFile {
            stored_name,
            original_name,
            path,
        })
    }

    /// Map a client-supplied name to a path inside the staging directory
    /// without checking that it exists.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, StagingError> {
        validate_plain_name(name)?;
        Ok(self.root.join(name))
    }

    /// Like [`Staging::path_for`], but the file must exist.
    pub async fn resolve(&self, name: &str) -> Result<PathBuf, StagingError> {
        let path = self.path_for(name)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(StagingError::NotFound {
                name: name.to_string(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StagingError::NotFound {
                name: name.to_string(),
            }),
            Err(source) => Err(StagingError::Io { path, source }),
        }
    }

    /// Output name for a surgery pass over `original_name`.
    pub fn output_name(&self, original_name: &str) -> Result<String, StagingError> {
        let base = base_name(original_name)?;
        Ok(format!("{OUTPUT_PREFIX}{base}"))
    }

    /// Best-effort recovery of the original name from a stored name.
    pub fn original_name_of(stored_name: &str) -> &str {
        match stored_name.split_once('-') {
            Some((stamp, rest)) if is_stamp(stamp) && !rest.is_empty() => rest,
            _ => stored_name,
        }
    }

    fn next_stamp(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let mut last = self.last_stamp.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self.last_stamp.compare_exchange_weak(
                last,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

fn is_stamp(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn has_accepted_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ACCEPTED_EXTENSION))
}

/// Last path component of a browser-supplied file name. Browsers on Windows
/// may send full paths with backslashes.
fn base_name(name: &str) -> Result<String, StagingError> {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    validate_plain_name(base).map_err(|_| StagingError::InvalidName {
        name: name.to_string(),
    })?;
    Ok(base.to_string())
}

fn validate_plain_name(name: &str) -> Result<(), StagingError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(StagingError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}
