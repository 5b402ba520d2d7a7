// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Checksummed file framing shared by commit log segments and the base snapshot
//!
//! Binary Format:
//! - Magic (4 bytes): u32, identifies the file kind
//! - Version (2 bytes): u16, FORMAT_VERSION
//! - Payload Length (8 bytes): u64
//! - Payload (variable): bincode-encoded body
//! - Checksum (4 bytes): CRC32 over everything before it
//!
//! Files are always written to a sibling `.tmp` file, synced, and renamed
//! into place, so a reader either sees a complete file or no file at all.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::StorageError;

/// Current on-disk format version
pub const FORMAT_VERSION: u16 = 1;
/// Suffix of files that are still being written
pub const TEMP_SUFFIX: &str = ".tmp";

const HEADER_LEN: usize = 4 + 2 + 8;
const CHECKSUM_LEN: usize = 4;

/// Encode `body` with bincode and frame it
pub fn encode<T: Serialize>(magic: u32, body: &T) -> Result<Vec<u8>, StorageError> {
    let payload =
        bincode::serialize(body).map_err(|e| StorageError::Serialization(e.to_string()))?;

    let mut buffer = Vec::with_capacity(HEADER_LEN + payload.len() + CHECKSUM_LEN);
    buffer.extend_from_slice(&magic.to_le_bytes());
    buffer.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buffer.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    buffer.extend_from_slice(&payload);

    let checksum = crc32fast::hash(&buffer);
    buffer.extend_from_slice(&checksum.to_le_bytes());

    Ok(buffer)
}

/// Verify the framing of `data` and decode its body
pub fn decode<T: DeserializeOwned>(path: &Path, magic: u32, data: &[u8]) -> Result<T, StorageError> {
    if data.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(StorageError::corrupted(path, "file too small"));
    }

    let found_magic = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    if found_magic != magic {
        return Err(StorageError::corrupted(path, "invalid magic number"));
    }

    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != FORMAT_VERSION {
        return Err(StorageError::corrupted(
            path,
            format!("unsupported format version {}", version),
        ));
    }

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&data[6..HEADER_LEN]);
    let payload_end = usize::try_from(u64::from_le_bytes(len_bytes))
        .ok()
        .and_then(|payload_len| HEADER_LEN.checked_add(payload_len))
        .filter(|end| end.checked_add(CHECKSUM_LEN) == Some(data.len()))
        .ok_or_else(|| StorageError::corrupted(path, "truncated payload"))?;

    let mut checksum_bytes = [0u8; 4];
    checksum_bytes.copy_from_slice(&data[payload_end..]);
    let expected_checksum = u32::from_le_bytes(checksum_bytes);
    let actual_checksum = crc32fast::hash(&data[..payload_end]);
    if expected_checksum != actual_checksum {
        return Err(StorageError::corrupted(path, "checksum mismatch"));
    }

    bincode::deserialize(&data[HEADER_LEN..payload_end])
        .map_err(|e| StorageError::corrupted(path, format!("undecodable payload: {}", e)))
}

/// Atomically write a framed file: temp file, fsync, rename, directory sync
pub fn write_file<T: Serialize>(path: &Path, magic: u32, body: &T) -> Result<(), StorageError> {
    let bytes = encode(magic, body)?;
    let tmp = temp_path(path);

    {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)
            .map_err(|e| StorageError::io(&tmp, e))?;
        file.write_all(&bytes).map_err(|e| StorageError::io(&tmp, e))?;
        file.sync_all().map_err(|e| StorageError::io(&tmp, e))?;
    }

    fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))?;
    sync_parent(path)
}

/// Read and decode a framed file
pub fn read_file<T: DeserializeOwned>(path: &Path, magic: u32) -> Result<T, StorageError> {
    let mut file = File::open(path).map_err(|e| StorageError::io(path, e))?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)
        .map_err(|e| StorageError::io(path, e))?;
    decode(path, magic, &data)
}

/// Path of the temporary file used while writing `path`
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

/// Delete every leftover temp file in `dir`, returning how many were removed
pub fn remove_stray_temp_files(dir: &Path) -> Result<usize, StorageError> {
    let mut removed = 0;
    let entries = fs::read_dir(dir).map_err(|e| StorageError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| StorageError::io(dir, e))?;
        let is_temp = entry
            .file_name()
            .to_str()
            .map(|name| name.ends_with(TEMP_SUFFIX))
            .unwrap_or(false);
        if is_temp {
            let path = entry.path();
            log::warn!("Removing incomplete file {}", path.display());
            fs::remove_file(&path).map_err(|e| StorageError::io(&path, e))?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        let dir = File::open(parent).map_err(|e| StorageError::io(parent, e))?;
        dir.sync_all().map_err(|e| StorageError::io(parent, e))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> Result<(), StorageError> {
    Ok(())
}
