//! Versioned artifact persistence
//!
//! Every artifact file is a small envelope around a bincode payload:
//!
//! ```text
//! magic [4] | format version u32 LE | xxh3 checksum u64 LE | payload length u64 LE | payload
//! ```
//!
//! Loading verifies each header field before decoding and fails with a
//! specific error instead of returning partially valid data. Files are
//! written to a temporary sibling and renamed into place.

use crate::error::{PipelineError, Result};
use crate::preprocessing::FittedTransform;
use crate::training::PreparedDataset;
use ndarray::{Array1, Array2};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::xxh3_64;

pub const PREPROCESSOR_FILE: &str = "preprocessor.bin";
pub const X_TRAIN_FILE: &str = "x_train.bin";
pub const X_TEST_FILE: &str = "x_test.bin";
pub const Y_TRAIN_FILE: &str = "y_train.bin";
pub const Y_TEST_FILE: &str = "y_test.bin";

const HEADER_LEN: usize = 4 + 4 + 8 + 8;

/// A value that can be stored in an artifact envelope
pub trait Artifact: Serialize + DeserializeOwned {
    /// Identifies the kind of payload
    const MAGIC: [u8; 4];
    /// Bumped whenever the payload layout changes
    const FORMAT_VERSION: u32;
}

impl Artifact for FittedTransform {
    const MAGIC: [u8; 4] = *b"MLPT";
    const FORMAT_VERSION: u32 = 1;
}

impl Artifact for Array2<f64> {
    const MAGIC: [u8; 4] = *b"MLX2";
    const FORMAT_VERSION: u32 = 1;
}

impl Artifact for Array1<i64> {
    const MAGIC: [u8; 4] = *b"MLY1";
    const FORMAT_VERSION: u32 = 1;
}

/// Payload checksum stored in the envelope header
pub fn checksum(data: &[u8]) -> u64 {
    xxh3_64(data)
}

/// Serialize `value` into an envelope
pub fn encode<A: Artifact>(value: &A) -> Result<Vec<u8>> {
    let payload = bincode::serialize(value)?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&A::MAGIC);
    bytes.extend_from_slice(&A::FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&checksum(&payload).to_le_bytes());
    bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode an envelope produced by [`encode`]. `source` names the origin in errors.
pub fn decode<A: Artifact>(bytes: &[u8], source: &str) -> Result<A> {
    let corrupt = |reason: String| PipelineError::ArtifactCorrupt {
        path: source.to_string(),
        reason,
    };

    if bytes.len() < HEADER_LEN {
        return Err(corrupt(format!(
            "file is {} bytes, shorter than the {}-byte header",
            bytes.len(),
            HEADER_LEN
        )));
    }

    let (header, payload) = bytes.split_at(HEADER_LEN);
    let magic = &header[0..4];
    if magic != A::MAGIC {
        return Err(corrupt(format!(
            "bad magic {:?}, expected {:?}",
            String::from_utf8_lossy(magic),
            String::from_utf8_lossy(&A::MAGIC)
        )));
    }

    let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if version != A::FORMAT_VERSION {
        return Err(PipelineError::UnsupportedVersion {
            path: source.to_string(),
            found: version,
            supported: A::FORMAT_VERSION,
        });
    }

    let mut word = [0u8; 8];
    word.copy_from_slice(&header[8..16]);
    let stored_checksum = u64::from_le_bytes(word);
    word.copy_from_slice(&header[16..24]);
    let length = u64::from_le_bytes(word);

    if payload.len() as u64 != length {
        return Err(corrupt(format!(
            "payload is {} bytes, header declares {}",
            payload.len(),
            length
        )));
    }
    if checksum(payload) != stored_checksum {
        return Err(corrupt("checksum mismatch".to_string()));
    }

    bincode::deserialize(payload).map_err(|e| corrupt(format!("undecodable payload: {}", e)))
}

fn sibling(path: &Path, prefix: &str, suffix: &str) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| PipelineError::InvalidInput(format!("not a file path: {}", path.display())))?;
    Ok(path.with_file_name(format!("{}{}{}", prefix, file_name, suffix)))
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Write an artifact atomically: temporary sibling file, then rename
pub fn write_artifact<A: Artifact>(path: &Path, value: &A) -> Result<()> {
    let bytes = encode(value)?;
    let tmp = sibling(path, ".", ".tmp")?;

    let written = write_synced(&tmp, &bytes).and_then(|_| fs::rename(&tmp, path));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    debug!(path = %path.display(), bytes = bytes.len(), "Wrote artifact");
    Ok(())
}

/// One file of a multi-file commit
struct Staged {
    dest: PathBuf,
    tmp: PathBuf,
    backup: PathBuf,
    bytes: Vec<u8>,
}

/// Replace several artifact files as a unit.
///
/// Every payload is written to a temporary sibling before anything is
/// renamed. Existing files are moved aside and restored if any rename fails,
/// so a failed commit leaves the previous set of files in place.
fn commit_all(files: Vec<(PathBuf, Vec<u8>)>) -> Result<()> {
    let mut staged = Vec::with_capacity(files.len());
    for (dest, bytes) in files {
        if dest.exists() && !dest.is_file() {
            return Err(PipelineError::InvalidInput(format!(
                "{} exists and is not a regular file",
                dest.display()
            )));
        }
        staged.push(Staged {
            tmp: sibling(&dest, ".", ".tmp")?,
            backup: sibling(&dest, ".", ".bak")?,
            dest,
            bytes,
        });
    }

    for (i, file) in staged.iter().enumerate() {
        if let Err(e) = write_synced(&file.tmp, &file.bytes) {
            for written in &staged[..=i] {
                let _ = fs::remove_file(&written.tmp);
            }
            return Err(e.into());
        }
    }

    let mut backed_up: Vec<&Staged> = Vec::new();
    let mut installed: Vec<&Staged> = Vec::new();
    let outcome = (|| -> std::io::Result<()> {
        for file in &staged {
            if file.dest.is_file() {
                fs::rename(&file.dest, &file.backup)?;
                backed_up.push(file);
            }
        }
        for file in &staged {
            fs::rename(&file.tmp, &file.dest)?;
            installed.push(file);
        }
        Ok(())
    })();

    match outcome {
        Ok(()) => {
            for file in backed_up {
                let _ = fs::remove_file(&file.backup);
            }
            Ok(())
        }
        Err(e) => {
            for file in installed {
                let _ = fs::remove_file(&file.dest);
            }
            for file in backed_up {
                if let Err(restore) = fs::rename(&file.backup, &file.dest) {
                    warn!(path = %file.dest.display(), error = %restore, "Could not restore artifact");
                }
            }
            for file in &staged {
                let _ = fs::remove_file(&file.tmp);
            }
            Err(e.into())
        }
    }
}

/// Read and verify an artifact file
pub fn read_artifact<A: Artifact>(path: &Path) -> Result<A> {
    if !path.is_file() {
        return Err(PipelineError::ArtifactNotFound(path.display().to_string()));
    }
    let bytes = fs::read(path)?;
    decode(&bytes, &path.display().to_string())
}

/// Arrays written next to the transform by [`ArtifactStore::save_prepared`]
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDataset {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<i64>,
    pub y_test: Array1<i64>,
}

/// Size of one stored file
#[derive(Debug, Clone)]
pub struct ArtifactInfo {
    pub name: String,
    pub size_bytes: u64,
}

/// Directory of pipeline artifacts
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of a file in the store
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn save<A: Artifact>(&self, name: &str, value: &A) -> Result<PathBuf> {
        self.ensure_root()?;
        let path = self.path(name);
        write_artifact(&path, value)?;
        Ok(path)
    }

    pub fn load<A: Artifact>(&self, name: &str) -> Result<A> {
        read_artifact(&self.path(name))
    }

    pub fn save_transform(&self, transform: &FittedTransform) -> Result<PathBuf> {
        self.save(PREPROCESSOR_FILE, transform)
    }

    pub fn load_transform(&self) -> Result<FittedTransform> {
        self.load(PREPROCESSOR_FILE)
    }

    /// Load the transform and check that `columns` is exactly the set it
    /// was fitted on
    pub fn load_transform_for(&self, columns: &[String]) -> Result<FittedTransform> {
        let transform = self.load_transform()?;
        transform.check_columns(columns)?;
        Ok(transform)
    }

    /// Write the transform and all four arrays.
    ///
    /// Either all five files are replaced or none are.
    pub fn save_prepared(&self, prepared: &PreparedDataset) -> Result<()> {
        self.ensure_root()?;
        commit_all(vec![
            (self.path(PREPROCESSOR_FILE), encode(&prepared.transform)?),
            (self.path(X_TRAIN_FILE), encode(&prepared.x_train)?),
            (self.path(X_TEST_FILE), encode(&prepared.x_test)?),
            (self.path(Y_TRAIN_FILE), encode(&prepared.y_train)?),
            (self.path(Y_TEST_FILE), encode(&prepared.y_test)?),
        ])?;

        info!(
            dir = %self.root.display(),
            train_rows = prepared.x_train.nrows(),
            test_rows = prepared.x_test.nrows(),
            "Saved prepared dataset artifacts"
        );
        Ok(())
    }

    /// Load the four arrays written by [`save_prepared`](Self::save_prepared)
    pub fn load_dataset(&self) -> Result<StoredDataset> {
        Ok(StoredDataset {
            x_train: self.load(X_TRAIN_FILE)?,
            x_test: self.load(X_TEST_FILE)?,
            y_train: self.load(Y_TRAIN_FILE)?,
            y_test: self.load(Y_TEST_FILE)?,
        })
    }

    /// Known artifact files currently present
    pub fn list(&self) -> Vec<ArtifactInfo> {
        [PREPROCESSOR_FILE, X_TRAIN_FILE, X_TEST_FILE, Y_TRAIN_FILE, Y_TEST_FILE]
            .iter()
            .filter_map(|name| {
                fs::metadata(self.path(name)).ok().map(|m| ArtifactInfo {
                    name: name.to_string(),
                    size_bytes: m.len(),
                })
            })
            .collect()
    }
}
