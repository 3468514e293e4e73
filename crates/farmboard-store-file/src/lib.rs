//! JSON-file storage backend for farmboard.
//!
//! The whole board lives in one document. Every write goes to a sibling
//! temporary file first and is then renamed over the original, so readers
//! never observe a half-written board.

/// Store error type.
pub mod error;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, anyhow};
use farmboard_core::{Expense, Task, TaskId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use crate::error::FileStoreError;

type Result<T> = std::result::Result<T, FileStoreError>;

/// On-disk shape of the board file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoardFile {
    #[serde(default = "first_id")]
    next_id: u64,
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    expenses: Vec<Expense>,
}

const fn first_id() -> u64 {
    1
}

impl BoardFile {
    fn issue_id(&mut self) -> u64 {
        let id = self.next_id.max(first_id());
        self.next_id = id + 1;
        id
    }

    fn position(&self, id: TaskId) -> Result<usize> {
        if !id.is_remote() {
            return Err(FileStoreError::NotRemote(id));
        }
        self.tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or(FileStoreError::TaskNotFound(id))
    }
}

/// Task store persisted as a single JSON document.
///
/// Cloning is cheap; clones share the same lock and therefore serialize
/// their writes.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl FileStore {
    /// Open the store at `path`. The file is created on the first write.
    ///
    /// # Errors
    /// Returns an error if the parent directory cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create store directory {}", parent.display()))?;
        }
        debug!(path = %path.display(), "Opened file store");
        Ok(Self {
            path: Arc::new(path),
            lock: Arc::new(Mutex::new(())),
        })
    }

    /// Location of the board file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.lock.lock().map_err(|_| FileStoreError::LockError)
    }

    fn read_board(&self) -> Result<BoardFile> {
        match fs::read(self.path.as_path()) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BoardFile::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BoardFile::default()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_board(&self, board: &BoardFile) -> Result<()> {
        let body = serde_json::to_vec_pretty(board)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, self.path.as_path())?;
        Ok(())
    }

    fn modify<T>(&self, apply: impl FnOnce(&mut BoardFile) -> Result<T>) -> Result<T> {
        let _guard = self.guard()?;
        let mut board = self.read_board()?;
        let out = apply(&mut board)?;
        self.write_board(&board)?;
        Ok(out)
    }

    /// Load every stored task.
    ///
    /// # Errors
    /// Returns an error if the board file cannot be read or parsed.
    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        let _guard = self.guard()?;
        let tasks = self.read_board()?.tasks;
        debug!(count = tasks.len(), "Loaded tasks");
        Ok(tasks)
    }

    /// Persist a new task and return it with its store-issued id.
    ///
    /// # Errors
    /// Returns an error if the board file cannot be read or written.
    pub fn create_task(&self, task: &Task) -> Result<Task> {
        let saved = self.modify(|board| {
            let mut saved = task.clone();
            saved.id = TaskId::Remote(board.issue_id());
            board.tasks.push(saved.clone());
            Ok(saved)
        })?;
        info!(task = %saved.id, title = %saved.title, "Created task");
        Ok(saved)
    }

    /// Replace the stored task `id` with `task`.
    ///
    /// # Errors
    /// Returns [`FileStoreError::TaskNotFound`] when no such task exists and
    /// [`FileStoreError::NotRemote`] for ids the store never issued.
    pub fn update_task(&self, id: TaskId, task: &Task) -> Result<Task> {
        let saved = self.modify(|board| {
            let idx = board.position(id)?;
            let mut saved = task.clone();
            saved.id = id;
            board.tasks[idx] = saved.clone();
            Ok(saved)
        })?;
        info!(task = %id, status = saved.status().column_id(), "Updated task");
        Ok(saved)
    }

    /// Remove the stored task `id`.
    ///
    /// # Errors
    /// Returns [`FileStoreError::TaskNotFound`] when no such task exists.
    pub fn delete_task(&self, id: TaskId) -> Result<()> {
        self.modify(|board| {
            let idx = board.position(id)?;
            board.tasks.remove(idx);
            Ok(())
        })?;
        info!(task = %id, "Deleted task");
        Ok(())
    }

    /// Load every recorded expense.
    ///
    /// # Errors
    /// Returns an error if the board file cannot be read or parsed.
    pub fn list_expenses(&self) -> Result<Vec<Expense>> {
        let _guard = self.guard()?;
        Ok(self.read_board()?.expenses)
    }

    /// Record an expense, assigning it a fresh id.
    ///
    /// # Errors
    /// Returns an error if the amount is not finite or the file cannot be written.
    pub fn add_expense(&self, expense: &Expense) -> Result<Expense> {
        if !expense.amount.is_finite() {
            return Err(anyhow!("Expense amount must be a finite number").into());
        }
        let saved = self.modify(|board| {
            let mut saved = expense.clone();
            saved.id = board.issue_id();
            board.expenses.push(saved.clone());
            Ok(saved)
        })?;
        info!(expense = saved.id, amount = saved.amount, "Recorded expense");
        Ok(saved)
    }
}
