//! Checksummed, compressed index snapshots
//!
//! Layout: `RSNP` magic, one format-version byte, the 32-byte BLAKE3 digest of
//! the compressed payload, then the zstd-compressed bincode payload.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

const MAGIC: &[u8; 4] = b"RSNP";
const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 1 + blake3::OUT_LEN;
const COMPRESSION_LEVEL: i32 = 3;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Decoding failed: {0}")]
    Decode(String),

    #[error("Not a snapshot file: {0}")]
    BadMagic(PathBuf),

    #[error("Unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u8, expected: u8 },

    #[error("Checksum mismatch in {0}")]
    ChecksumMismatch(PathBuf),
}

/// Serialize `value` and atomically write it to `path`
///
/// Returns the number of bytes written.
pub fn write_snapshot<T: Serialize>(path: &Path, value: &T) -> Result<u64, SnapshotError> {
    let encoded = bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| SnapshotError::Encode(e.to_string()))?;

    let compressed =
        zstd::encode_all(&encoded[..], COMPRESSION_LEVEL).map_err(|e| SnapshotError::Io {
            source: e,
            context: "Failed to compress snapshot".to_string(),
        })?;
    let digest = blake3::hash(&compressed);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| SnapshotError::Io {
            source: e,
            context: format!("Failed to create snapshot directory: {}", parent.display()),
        })?;
    }

    // Write to temporary file first (atomic write)
    let temp_path = temp_path(path);
    let mut file = fs::File::create(&temp_path).map_err(|e| SnapshotError::Io {
        source: e,
        context: format!("Failed to create temp snapshot: {}", temp_path.display()),
    })?;

    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(MAGIC);
    header.push(FORMAT_VERSION);
    header.extend_from_slice(digest.as_bytes());

    file.write_all(&header)
        .and_then(|_| file.write_all(&compressed))
        .and_then(|_| file.sync_all())
        .map_err(|e| SnapshotError::Io {
            source: e,
            context: format!("Failed to write snapshot: {}", temp_path.display()),
        })?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| SnapshotError::Io {
        source: e,
        context: format!(
            "Failed to move snapshot into place: {} -> {}",
            temp_path.display(),
            path.display()
        ),
    })?;

    let written = (header.len() + compressed.len()) as u64;
    tracing::debug!("Wrote snapshot {} ({} bytes)", path.display(), written);
    Ok(written)
}

/// Read and verify a snapshot written by [`write_snapshot`]
pub fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<T, SnapshotError> {
    let data = fs::read(path).map_err(|e| SnapshotError::Io {
        source: e,
        context: format!("Failed to read snapshot: {}", path.display()),
    })?;

    if data.len() < HEADER_LEN || &data[..MAGIC.len()] != MAGIC {
        return Err(SnapshotError::BadMagic(path.to_path_buf()));
    }

    let version = data[MAGIC.len()];
    if version != FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            found: version,
            expected: FORMAT_VERSION,
        });
    }

    let expected_digest = &data[MAGIC.len() + 1..HEADER_LEN];
    let payload = &data[HEADER_LEN..];
    if blake3::hash(payload).as_bytes()[..] != expected_digest[..] {
        return Err(SnapshotError::ChecksumMismatch(path.to_path_buf()));
    }

    let decompressed = zstd::decode_all(payload).map_err(|e| SnapshotError::Io {
        source: e,
        context: format!("Failed to decompress snapshot: {}", path.display()),
    })?;

    let (value, _) = bincode::serde::decode_from_slice(&decompressed, bincode::config::standard())
        .map_err(|e| SnapshotError::Decode(e.to_string()))?;
    Ok(value)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
