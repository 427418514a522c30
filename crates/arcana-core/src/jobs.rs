//! In-memory job table with a submit/poll lifecycle.
//!
//! One mutex over one map. Records move strictly forward through
//! pending -> running -> done; `done` is terminal and carries the result,
//! success or failure alike (there is no failed status). The lock is held
//! only for table mutation, never across an RPC call.
//!
//! Mutators return whether they found the record: an id may have been
//! evicted or never issued, and callers treat that as a normal outcome.

use crate::config::JobConfig;
use crate::rpc::protocol::{ReadingRequest, RpcResponse};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
}

/// One submitted unit of work.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub payload: ReadingRequest,
    pub result: Option<RpcResponse>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Read-only projection served to pollers. Payload and id stay internal;
/// the poller already knows the id and supplied the payload.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub status: JobStatus,
    pub result: Option<RpcResponse>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Process-wide job table.
pub struct JobStore {
    table: Mutex<HashMap<String, Job>>,
    retention: TimeDelta,
}

impl JobStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            retention: TimeDelta::from_std(retention).unwrap_or(TimeDelta::MAX),
        }
    }

    pub fn with_default_retention() -> Self {
        Self::new(JobConfig::RETENTION)
    }

    /// Insert a fresh pending job and return its id. Expired terminal
    /// records are evicted first, so the table cannot grow without bound
    /// as long as submissions keep arriving.
    pub fn create(&self, payload: ReadingRequest) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let mut table = self.lock();

        let before = table.len();
        Self::evict_expired(&mut table, now, self.retention);
        let evicted = before - table.len();
        if evicted > 0 {
            debug!("Evicted {} expired job(s)", evicted);
        }

        table.insert(
            id.clone(),
            Job {
                id: id.clone(),
                status: JobStatus::Pending,
                payload,
                result: None,
                created_at: now,
                started_at: None,
                finished_at: None,
            },
        );
        id
    }

    /// Snapshot of a full record, if the id is known.
    pub fn get(&self, id: &str) -> Option<Job> {
        self.lock().get(id).cloned()
    }

    /// Poller-facing projection, if the id is known.
    pub fn view(&self, id: &str) -> Option<JobView> {
        self.lock().get(id).map(|job| JobView {
            status: job.status,
            result: job.result.clone(),
            created_at: job.created_at,
            started_at: job.started_at,
            finished_at: job.finished_at,
        })
    }

    /// Mark a pending job running. Returns false if the id is unknown or
    /// the job already left pending; transitions only move forward.
    pub fn transition_running(&self, id: &str) -> bool {
        let mut table = self.lock();
        match table.get_mut(id) {
            Some(job) if job.status == JobStatus::Pending => {
                job.status = JobStatus::Running;
                job.started_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }

    /// Mark a job done with its result. Returns false if the id is unknown
    /// or the job is already done; a terminal record is never mutated.
    pub fn complete(&self, id: &str, result: RpcResponse) -> bool {
        let mut table = self.lock();
        match table.get_mut(id) {
            Some(job) if job.status != JobStatus::Done => {
                job.status = JobStatus::Done;
                job.result = Some(result);
                job.finished_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Job>> {
        // A poisoned table is still a consistent table: every mutation
        // under the lock is a single map operation.
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn evict_expired(table: &mut HashMap<String, Job>, now: DateTime<Utc>, retention: TimeDelta) {
        // Only terminal records are evicted; a pending or running job still
        // has a background task that will come back to complete it.
        table.retain(|_, job| job.status != JobStatus::Done || now - job.created_at <= retention);
    }
}
