//! In-process job queues for the search and download stages.
//!
//! Each queue is FIFO with at most one pending job per key: adding a job
//! whose key is already pending keeps the existing job in place, and a job
//! can be withdrawn by key before a worker picks it up.

use std::collections::HashSet;
use std::sync::Mutex as StdMutex;

use thiserror::Error;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;

/// Error type for queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue's receiving side has been dropped.
    #[error("Queue closed")]
    Closed,
}

/// Returns the queue key for a track id.
pub fn job_key(track_id: i64) -> String {
    format!("id-{}", track_id)
}

/// A queued unit of work, keyed for dedup and withdrawal.
#[derive(Debug, Clone)]
pub struct Job<T> {
    pub key: String,
    pub payload: T,
}

/// FIFO queue with per-key dedup and removal.
///
/// Removal is lazy: withdrawn keys are dropped from the pending set and the
/// corresponding channel entries are skipped on receive.
pub struct JobQueue<T> {
    tx: UnboundedSender<Job<T>>,
    rx: Mutex<UnboundedReceiver<Job<T>>>,
    pending: StdMutex<HashSet<String>>,
}

impl<T> JobQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            pending: StdMutex::new(HashSet::new()),
        }
    }

    /// Enqueue a job. Returns false (keeping the existing job) if a job with
    /// the same key is already pending.
    pub fn add(&self, key: &str, payload: T) -> Result<bool, QueueError> {
        {
            let mut pending = self.pending.lock().unwrap();
            if !pending.insert(key.to_string()) {
                return Ok(false);
            }
        }

        self.tx
            .send(Job {
                key: key.to_string(),
                payload,
            })
            .map_err(|_| QueueError::Closed)?;
        Ok(true)
    }

    /// Withdraw a pending job by key. Returns false if no such job was
    /// pending. Has no effect on a job already handed to a worker.
    pub fn remove(&self, key: &str) -> bool {
        self.pending.lock().unwrap().remove(key)
    }

    /// Returns true if a job with the given key is pending.
    pub fn contains(&self, key: &str) -> bool {
        self.pending.lock().unwrap().contains(key)
    }

    /// Number of pending jobs.
    pub fn len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receive the next job, skipping entries withdrawn since they were
    /// enqueued. Waits until a job is available; returns Err when the queue
    /// is closed.
    pub async fn recv(&self) -> Result<Job<T>, QueueError> {
        let mut rx = self.rx.lock().await;
        loop {
            let job = rx.recv().await.ok_or(QueueError::Closed)?;
            // Only deliver jobs still marked pending; clear the mark so the
            // same key can be re-enqueued while the worker runs.
            if self.pending.lock().unwrap().remove(&job.key) {
                return Ok(job);
            }
        }
    }

    /// Non-blocking receive, used by tests and drain paths.
    pub fn try_recv(&self) -> Result<Option<Job<T>>, QueueError> {
        let mut rx = match self.rx.try_lock() {
            Ok(rx) => rx,
            Err(_) => return Ok(None),
        };
        loop {
            match rx.try_recv() {
                Ok(job) => {
                    if self.pending.lock().unwrap().remove(&job.key) {
                        return Ok(Some(job));
                    }
                }
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => return Err(QueueError::Closed),
            }
        }
    }
}

impl<T> Default for JobQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The two stage queues the pipeline runs on.
pub struct TrackQueues {
    pub search: JobQueue<i64>,
    pub download: JobQueue<i64>,
}

impl TrackQueues {
    pub fn new() -> Self {
        Self {
            search: JobQueue::new(),
            download: JobQueue::new(),
        }
    }

    /// Withdraw any pending work for a track from both queues.
    pub fn remove_track(&self, track_id: i64) {
        let key = job_key(track_id);
        self.search.remove(&key);
        self.download.remove(&key);
    }
}

impl Default for TrackQueues {
    fn default() -> Self {
        Self::new()
    }
}
