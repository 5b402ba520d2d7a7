// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Background compaction task
//!
//! A dedicated thread that periodically folds the commit log into the base
//! snapshot. It is owned by the store and stopped through its channel.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::error::Result;

/// Messages understood by the compaction thread
#[derive(Debug)]
pub enum CompactionMessage {
    /// Compact now instead of waiting for the next interval
    Trigger,
    /// Stop the thread
    Shutdown,
}

/// Handle to the compaction thread
#[derive(Debug)]
pub struct CompactionTask {
    sender: Sender<CompactionMessage>,
    handle: Option<JoinHandle<()>>,
}

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

impl CompactionTask {
    /// Spawn a thread running `compact` every `interval` and on trigger
    pub fn spawn<F>(name: String, interval: Duration, compact: F) -> Result<Self>
    where
        F: Fn() -> Result<()> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || compaction_loop(receiver, interval, compact))
            .map_err(|e| crate::storage::StorageError::io("compaction thread", e))?;

        Ok(Self {
            sender,
            handle: Some(handle),
        })
    }

    /// Ask the thread to compact as soon as possible
    pub fn trigger(&self) {
        if self.sender.send(CompactionMessage::Trigger).is_err() {
            warn!("Compaction thread is no longer running");
        }
    }

    /// Stop the thread, waiting at most `timeout` for it to finish.
    /// Returns false when the thread was still running at the deadline.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => return true,
        };
        // A send error means the thread already exited
        let _ = self.sender.send(CompactionMessage::Shutdown);

        let deadline = Instant::now() + timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                warn!(
                    "Compaction thread did not stop within {:?}; detaching it",
                    timeout
                );
                return false;
            }
            thread::sleep(JOIN_POLL_INTERVAL);
        }

        if handle.join().is_err() {
            warn!("Compaction thread panicked");
        }
        true
    }
}

impl Drop for CompactionTask {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.sender.send(CompactionMessage::Shutdown);
        }
    }
}

fn compaction_loop<F>(receiver: Receiver<CompactionMessage>, interval: Duration, compact: F)
where
    F: Fn() -> Result<()>,
{
    loop {
        match receiver.recv_timeout(interval) {
            Ok(CompactionMessage::Trigger) | Err(RecvTimeoutError::Timeout) => {
                debug!("Running scheduled compaction");
                if let Err(e) = compact() {
                    warn!("Scheduled compaction failed: {}", e);
                }
            }
            Ok(CompactionMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("Compaction thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_runs_on_interval() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let mut task = CompactionTask::spawn(
            "compaction-test".to_string(),
            Duration::from_millis(10),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while runs.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(task.shutdown(Duration::from_secs(5)));
        assert!(runs.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_trigger_runs_immediately() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let mut task = CompactionTask::spawn(
            "compaction-test".to_string(),
            Duration::from_secs(3600),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .unwrap();

        task.trigger();
        let deadline = Instant::now() + Duration::from_secs(5);
        while runs.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(task.shutdown(Duration::from_secs(5)));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shutdown_gives_up_after_timeout() {
        let started = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&started);
        let mut task = CompactionTask::spawn(
            "compaction-test".to_string(),
            Duration::from_millis(1),
            move || {
                flag.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(500));
                Ok(())
            },
        )
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while started.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(!task.shutdown(Duration::from_millis(50)));
    }
}
