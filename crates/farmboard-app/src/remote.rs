//! Asynchronous CRUD contract the board controller talks to.

use std::sync::Arc;

use anyhow::Error;
use farmboard_core::{Task, TaskId};
use farmboard_store_file::{FileStore, FileStoreError};

/// Remote task store consumed by [`crate::controller::TransitionController`].
///
/// Every call may fail independently; callers treat any error as a rejected
/// write and never assume partial application of a single call.
#[allow(async_fn_in_trait)]
pub trait RemoteTaskStore: Send + Sync {
    /// Error type bubbled up from the backing store.
    type Error: Into<Error> + Send;

    /// Load every task.
    ///
    /// # Errors
    /// Returns a store-specific error when the listing fails.
    async fn get_all(&self) -> Result<Vec<Task>, Self::Error>;

    /// Persist a new task and return the stored record with its permanent id.
    ///
    /// # Errors
    /// Returns a store-specific error when the store rejects the record.
    async fn create(&self, task: &Task) -> Result<Task, Self::Error>;

    /// Replace task `id` with `task` and return the stored record.
    ///
    /// # Errors
    /// Returns a store-specific error when the store rejects the update.
    async fn update(&self, id: TaskId, task: &Task) -> Result<Task, Self::Error>;

    /// Remove task `id`.
    ///
    /// # Errors
    /// Returns a store-specific error when the store rejects the delete.
    async fn delete(&self, id: TaskId) -> Result<(), Self::Error>;

    /// Create several tasks, reporting each outcome separately.
    ///
    /// The default implementation issues one [`create`](Self::create) per record.
    async fn create_batch(&self, tasks: &[Task]) -> Vec<Result<Task, Self::Error>> {
        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            results.push(self.create(task).await);
        }
        results
    }

    /// Delete several tasks, reporting each outcome separately.
    ///
    /// The default implementation issues one [`delete`](Self::delete) per id.
    async fn delete_batch(&self, ids: &[TaskId]) -> Vec<Result<(), Self::Error>> {
        let mut results = Vec::with_capacity(ids.len());
        for &id in ids {
            results.push(self.delete(id).await);
        }
        results
    }
}

impl<S: RemoteTaskStore> RemoteTaskStore for Arc<S> {
    type Error = S::Error;

    async fn get_all(&self) -> Result<Vec<Task>, Self::Error> {
        (**self).get_all().await
    }

    async fn create(&self, task: &Task) -> Result<Task, Self::Error> {
        (**self).create(task).await
    }

    async fn update(&self, id: TaskId, task: &Task) -> Result<Task, Self::Error> {
        (**self).update(id, task).await
    }

    async fn delete(&self, id: TaskId) -> Result<(), Self::Error> {
        (**self).delete(id).await
    }

    async fn create_batch(&self, tasks: &[Task]) -> Vec<Result<Task, Self::Error>> {
        (**self).create_batch(tasks).await
    }

    async fn delete_batch(&self, ids: &[TaskId]) -> Vec<Result<(), Self::Error>> {
        (**self).delete_batch(ids).await
    }
}

/// Run a blocking store call on the blocking pool.
async fn run_blocking<T, F>(call: F) -> Result<T, FileStoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, FileStoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| FileStoreError::Other(format!("Task join error: {e}")))?
}

impl RemoteTaskStore for FileStore {
    type Error = FileStoreError;

    async fn get_all(&self) -> Result<Vec<Task>, Self::Error> {
        let store = self.clone();
        run_blocking(move || store.list_tasks()).await
    }

    async fn create(&self, task: &Task) -> Result<Task, Self::Error> {
        let store = self.clone();
        let task = task.clone();
        run_blocking(move || store.create_task(&task)).await
    }

    async fn update(&self, id: TaskId, task: &Task) -> Result<Task, Self::Error> {
        let store = self.clone();
        let task = task.clone();
        run_blocking(move || store.update_task(id, &task)).await
    }

    async fn delete(&self, id: TaskId) -> Result<(), Self::Error> {
        let store = self.clone();
        run_blocking(move || store.delete_task(id)).await
    }
}
