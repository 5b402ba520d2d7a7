// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Write-ahead commit log
//!
//! Every committed transaction with at least one mutation becomes exactly one
//! segment file, `commit-<N>`, holding that transaction's full mutation log.
//! Sequence numbers increase monotonically across the life of a store
//! directory; they continue past the `folded_through` mark of the base
//! snapshot so a folded segment number is never handed out again.
//!
//! Segments are written with the checksummed temp-then-rename framing of
//! [`crate::storage::persistent`], so a segment is either complete on disk
//! or absent.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::log::MutationEvent;
use crate::storage::persistent;
use crate::storage::StorageError;

/// File name prefix of commit log segments
pub const SEGMENT_PREFIX: &str = "commit-";
/// Magic number identifying segment files ("INVS")
const SEGMENT_MAGIC: u32 = 0x494E_5653;

#[derive(Serialize)]
struct SegmentBodyRef<'a> {
    sequence: u64,
    committed_at: DateTime<Utc>,
    events: &'a [MutationEvent],
}

/// Decoded content of one segment file
#[derive(Debug, Clone, Deserialize)]
pub struct Segment {
    pub sequence: u64,
    pub committed_at: DateTime<Utc>,
    pub events: Vec<MutationEvent>,
}

/// A segment file found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentInfo {
    pub sequence: u64,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Parse the sequence number out of a segment file name
pub fn parse_segment_name(name: &str) -> Option<u64> {
    name.strip_prefix(SEGMENT_PREFIX)?.parse().ok()
}

/// List the segments in `dir`, ascending by sequence number
pub fn list_segments(dir: &Path) -> Result<Vec<SegmentInfo>, StorageError> {
    let mut segments = Vec::new();
    let entries = fs::read_dir(dir).map_err(|e| StorageError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| StorageError::io(dir, e))?;
        let name = entry.file_name();
        let sequence = match name.to_str().and_then(parse_segment_name) {
            Some(sequence) => sequence,
            None => continue,
        };
        let path = entry.path();
        let bytes = entry
            .metadata()
            .map_err(|e| StorageError::io(&path, e))?
            .len();
        segments.push(SegmentInfo {
            sequence,
            path,
            bytes,
        });
    }
    segments.sort_by_key(|segment| segment.sequence);
    Ok(segments)
}

/// Read and verify one segment file
pub fn read_segment(path: &Path) -> Result<Segment, StorageError> {
    persistent::read_file(path, SEGMENT_MAGIC)
}

/// Remove the segment of a failed append so recovery cannot replay it
fn discard_segment(path: &Path) {
    if !path.is_file() {
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => log::warn!("Discarded segment {} of a failed commit", path.display()),
        Err(e) => log::error!(
            "Failed to discard segment {} of a failed commit: {}",
            path.display(),
            e
        ),
    }
}

/// Commit log over a store directory
#[derive(Debug)]
pub struct CommitLog {
    dir: PathBuf,
    /// Next sequence number to hand out
    next_sequence: AtomicU64,
}

impl CommitLog {
    /// Open the commit log in `dir`, continuing after both `folded_through`
    /// and the highest segment present
    pub fn open(dir: &Path, folded_through: u64) -> Result<Self, StorageError> {
        let highest = list_segments(dir)?
            .last()
            .map(|segment| segment.sequence)
            .unwrap_or(0);
        let next = highest.max(folded_through) + 1;
        log::debug!("Commit log in {} continues at sequence {}", dir.display(), next);

        Ok(Self {
            dir: dir.to_path_buf(),
            next_sequence: AtomicU64::new(next),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    pub fn segment_path(&self, sequence: u64) -> PathBuf {
        self.dir.join(format!("{}{}", SEGMENT_PREFIX, sequence))
    }

    /// Highest sequence number handed out so far (0 when none)
    pub fn last_allocated(&self) -> u64 {
        self.next_sequence.load(Ordering::SeqCst) - 1
    }

    /// Persist `events` as the next segment, returning its sequence number.
    ///
    /// On error no segment for the sequence is left behind, even when the
    /// failure came after the rename.
    pub fn append(&self, events: &[MutationEvent]) -> Result<u64, StorageError> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let body = SegmentBodyRef {
            sequence,
            committed_at: Utc::now(),
            events,
        };
        let path = self.segment_path(sequence);
        if let Err(e) = persistent::write_file(&path, SEGMENT_MAGIC, &body) {
            discard_segment(&path);
            return Err(e);
        }
        log::debug!("Wrote commit segment {} with {} events", sequence, events.len());
        Ok(sequence)
    }

    /// Segments currently on disk
    pub fn segments(&self) -> Result<Vec<SegmentInfo>, StorageError> {
        list_segments(&self.dir)
    }

    pub fn segment_count(&self) -> Result<usize, StorageError> {
        Ok(self.segments()?.len())
    }

    /// Delete every segment with a sequence number up to and including `sequence`
    pub fn delete_through(&self, sequence: u64) -> Result<usize, StorageError> {
        let mut deleted = 0;
        for segment in self.segments()? {
            if segment.sequence > sequence {
                break;
            }
            fs::remove_file(&segment.path).map_err(|e| StorageError::io(&segment.path, e))?;
            deleted += 1;
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ElementId, Vertex};

    fn event(id: u64) -> MutationEvent {
        MutationEvent::vertex_created(Vertex::new(ElementId::from_u64(id), "resource"))
    }

    #[test]
    fn test_parse_segment_name() {
        assert_eq!(parse_segment_name("commit-12"), Some(12));
        assert_eq!(parse_segment_name("commit-12.tmp"), None);
        assert_eq!(parse_segment_name("graph.snapshot"), None);
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let log = CommitLog::open(dir.path(), 0).unwrap();
        assert_eq!(log.last_allocated(), 0);

        let first = log.append(&[event(1), event(2)]).unwrap();
        let second = log.append(&[event(3)]).unwrap();
        assert_eq!((first, second), (1, 2));

        let segments = log.segments().unwrap();
        assert_eq!(segments.len(), 2);
        let segment = read_segment(&segments[0].path).unwrap();
        assert_eq!(segment.sequence, 1);
        assert_eq!(segment.events, vec![event(1), event(2)]);
    }

    #[test]
    fn test_segments_sort_numerically() {
        let dir = tempfile::tempdir().unwrap();
        let log = CommitLog::open(dir.path(), 8).unwrap();
        for i in 0..3 {
            log.append(&[event(i)]).unwrap();
        }
        let sequences: Vec<u64> = log.segments().unwrap().iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![9, 10, 11]);
    }

    #[test]
    fn test_open_continues_after_existing_segments() {
        let dir = tempfile::tempdir().unwrap();
        {
            let log = CommitLog::open(dir.path(), 0).unwrap();
            log.append(&[event(1)]).unwrap();
            log.append(&[event(2)]).unwrap();
        }
        let log = CommitLog::open(dir.path(), 1).unwrap();
        assert_eq!(log.last_allocated(), 2);
        assert_eq!(log.append(&[event(3)]).unwrap(), 3);
    }

    #[test]
    fn test_delete_through() {
        let dir = tempfile::tempdir().unwrap();
        let log = CommitLog::open(dir.path(), 0).unwrap();
        for i in 0..4 {
            log.append(&[event(i)]).unwrap();
        }
        assert_eq!(log.delete_through(2).unwrap(), 2);
        let remaining: Vec<u64> = log.segments().unwrap().iter().map(|s| s.sequence).collect();
        assert_eq!(remaining, vec![3, 4]);
    }

    #[test]
    fn test_failed_append_leaves_no_segment() {
        let dir = tempfile::tempdir().unwrap();
        let log = CommitLog::open(dir.path(), 0).unwrap();
        // A directory in the way of the temp file makes the write fail
        fs::create_dir(dir.path().join("commit-1.tmp")).unwrap();

        assert!(matches!(
            log.append(&[event(1)]),
            Err(StorageError::Io { .. })
        ));
        assert!(log.segments().unwrap().is_empty());
        assert_eq!(log.append(&[event(2)]).unwrap(), 2);
    }

    #[test]
    fn test_discard_segment_removes_renamed_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = CommitLog::open(dir.path(), 0).unwrap();
        let sequence = log.append(&[event(1)]).unwrap();
        let path = log.segment_path(sequence);

        discard_segment(&path);
        assert!(!path.exists());
        assert!(log.segments().unwrap().is_empty());

        // Nothing to remove is not an error
        discard_segment(&path);
    }
}
