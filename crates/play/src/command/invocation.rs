//! Invocation records kept for transcript reconstruction and playback.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::basket::Args;
use crate::outcome::Outcome;

/// Status of a command invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    /// The command answered.
    Success,
    /// The command failed.
    Failed,
    /// The operator cancelled an interactive prompt.
    Cancelled,
}

impl InvocationStatus {
    pub fn of(outcome: &Outcome) -> Self {
        match outcome.message() {
            None => InvocationStatus::Success,
            Some(message) if message.ends_with(":cancelled") => InvocationStatus::Cancelled,
            Some(_) => InvocationStatus::Failed,
        }
    }
}

/// Record of a single command invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationRecord {
    pub id: Uuid,
    /// Dispatch token of the command.
    pub token: String,
    /// Command line as received.
    pub line: String,
    /// Arguments after binding.
    pub args: Args,
    /// Position in the call chain; 1 for operator-typed commands.
    pub depth: usize,
    pub recursive: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub status: InvocationStatus,
    pub outcome: Outcome,
}

impl InvocationRecord {
    /// Computes `duration_ms` and `status` from the timestamps and outcome.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        token: String,
        line: String,
        args: Args,
        depth: usize,
        recursive: bool,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        outcome: Outcome,
    ) -> Self {
        let duration_ms = (ended_at - started_at).num_milliseconds().max(0) as u64;
        Self {
            id: Uuid::new_v4(),
            token,
            line,
            args,
            depth,
            recursive,
            started_at,
            ended_at,
            duration_ms,
            status: InvocationStatus::of(&outcome),
            outcome,
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.depth <= 1
    }
}

/// Records kept by a log created with [`InvocationLog::new`].
pub const DEFAULT_LOG_CAPACITY: usize = 256;

/// Bounded log of invocations. Once full, each append drops the oldest
/// record.
#[derive(Debug)]
pub struct InvocationLog {
    records: Mutex<VecDeque<InvocationRecord>>,
    capacity: usize,
}

impl Default for InvocationLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl InvocationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn append(&self, record: InvocationRecord) {
        let mut records = self.lock();
        while records.len() >= self.capacity {
            if let Some(evicted) = records.pop_front() {
                tracing::trace!(token = %evicted.token, "invocation log full, oldest record dropped");
            }
        }
        records.push_back(record);
    }

    /// Retained records, oldest first.
    pub fn records(&self) -> Vec<InvocationRecord> {
        self.lock().iter().cloned().collect()
    }

    /// Records of operator-typed invocations, in order.
    pub fn top_level(&self) -> Vec<InvocationRecord> {
        self.lock()
            .iter()
            .filter(|record| record.is_top_level())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<InvocationRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
