//! In-process [`RemoteTaskStore`] with failure injection, used by tests and demos.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use farmboard_core::{Task, TaskId};
use thiserror::Error;

use crate::remote::RemoteTaskStore;

/// Errors produced by [`MemoryTaskStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryStoreError {
    /// A failure was injected for this operation.
    #[error("store rejected {operation} of '{target}'")]
    Rejected {
        /// Operation that was rejected.
        operation: &'static str,
        /// Task id or title the rejection was keyed on.
        target: String,
    },
    /// No task with this id exists.
    #[error("task not found: {0}")]
    NotFound(TaskId),
    /// Every call fails while the store is offline.
    #[error("store is offline")]
    Offline,
}

/// Number of calls received per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `get_all` calls.
    pub get_all: usize,
    /// `create` calls.
    pub create: usize,
    /// `update` calls.
    pub update: usize,
    /// `delete` calls.
    pub delete: usize,
}

impl CallCounts {
    /// Calls that would have written to the store.
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.create + self.update + self.delete
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    tasks: Vec<Task>,
    next_id: u64,
    offline: bool,
    reject_updates: HashSet<TaskId>,
    reject_deletes: HashSet<TaskId>,
    reject_creates: HashSet<String>,
    calls: CallCounts,
}

impl MemoryState {
    fn position(&self, id: TaskId) -> Result<usize, MemoryStoreError> {
        self.tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or(MemoryStoreError::NotFound(id))
    }
}

/// Task store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    state: Mutex<MemoryState>,
    latency: Duration,
}

impl MemoryTaskStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records; ids are kept as given.
    #[must_use]
    pub fn with_tasks(self, tasks: Vec<Task>) -> Self {
        {
            let mut state = self.lock();
            state.next_id = tasks
                .iter()
                .filter_map(|task| match task.id {
                    TaskId::Remote(id) => Some(id),
                    TaskId::Local(_) => None,
                })
                .max()
                .unwrap_or_default();
            state.tasks = tasks;
        }
        self
    }

    /// Delay every call by `latency` before it takes effect.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Reject every future update of `id`.
    pub fn reject_updates_for(&self, id: TaskId) {
        self.lock().reject_updates.insert(id);
    }

    /// Reject every future delete of `id`.
    pub fn reject_deletes_for(&self, id: TaskId) {
        self.lock().reject_deletes.insert(id);
    }

    /// Reject every future create whose title equals `title`.
    pub fn reject_creates_titled(&self, title: impl Into<String>) {
        self.lock().reject_creates.insert(title.into());
    }

    /// Make every call fail (or succeed again).
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Clear every injected failure.
    pub fn heal(&self) {
        let mut state = self.lock();
        state.offline = false;
        state.reject_updates.clear();
        state.reject_deletes.clear();
        state.reject_creates.clear();
    }

    /// Calls received so far.
    #[must_use]
    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    /// Records currently stored.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn settle(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn rejected(operation: &'static str, target: impl ToString) -> MemoryStoreError {
        MemoryStoreError::Rejected {
            operation,
            target: target.to_string(),
        }
    }
}

impl RemoteTaskStore for MemoryTaskStore {
    type Error = MemoryStoreError;

    async fn get_all(&self) -> Result<Vec<Task>, Self::Error> {
        self.lock().calls.get_all += 1;
        self.settle().await;
        let state = self.lock();
        if state.offline {
            return Err(MemoryStoreError::Offline);
        }
        Ok(state.tasks.clone())
    }

    async fn create(&self, task: &Task) -> Result<Task, Self::Error> {
        self.lock().calls.create += 1;
        self.settle().await;
        let mut state = self.lock();
        if state.offline {
            return Err(MemoryStoreError::Offline);
        }
        if state.reject_creates.contains(&task.title) {
            return Err(Self::rejected("create", &task.title));
        }
        state.next_id += 1;
        let mut saved = task.clone();
        saved.id = TaskId::Remote(state.next_id);
        state.tasks.push(saved.clone());
        drop(state);
        Ok(saved)
    }

    async fn update(&self, id: TaskId, task: &Task) -> Result<Task, Self::Error> {
        self.lock().calls.update += 1;
        self.settle().await;
        let mut state = self.lock();
        if state.offline {
            return Err(MemoryStoreError::Offline);
        }
        if state.reject_updates.contains(&id) {
            return Err(Self::rejected("update", id));
        }
        let idx = state.position(id)?;
        let mut saved = task.clone();
        saved.id = id;
        state.tasks[idx] = saved.clone();
        drop(state);
        Ok(saved)
    }

    async fn delete(&self, id: TaskId) -> Result<(), Self::Error> {
        self.lock().calls.delete += 1;
        self.settle().await;
        let mut state = self.lock();
        if state.offline {
            return Err(MemoryStoreError::Offline);
        }
        if state.reject_deletes.contains(&id) {
            return Err(Self::rejected("delete", id));
        }
        let idx = state.position(id)?;
        state.tasks.remove(idx);
        drop(state);
        Ok(())
    }
}
