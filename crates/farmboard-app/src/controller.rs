//! Single owner of the in-memory task collection.
//!
//! Drag-and-drop moves are applied optimistically and rolled back when the
//! remote store rejects them. Form submits, edits and deletes wait for the
//! store before touching local state. Every mutation that reaches the store
//! produces exactly one notification.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

use farmboard_core::filter::{self, FilterCriteria, SortSpec};
use farmboard_core::recurrence::{self, Recurrence, RecurrenceError};
use farmboard_core::{Task, TaskId, TaskStatus, TaskTemplate, ValidationError};
use thiserror::Error;
use time::Date;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::notify::{Notification, Notifier};
use crate::remote::RemoteTaskStore;
use crate::task_edit::TaskEdit;

/// Where a card was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    /// An empty area of a column.
    Column(TaskStatus),
    /// Another card; the task joins that card's column.
    Card(TaskId),
}

/// Result of a drag-and-drop gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Dropped onto its own column; nothing happened.
    Unchanged,
    /// The store accepted the move.
    Confirmed(Task),
    /// The store rejected the move and the prior record was restored.
    RolledBack,
    /// The task already has a request in flight; the gesture was ignored.
    Busy,
    /// The board was detached before the store answered.
    Discarded,
}

/// Errors surfaced by controller entry points.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Form input failed validation; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The task has a request in flight.
    #[error("task {0} is waiting for the store")]
    Busy(TaskId),
    /// A form submission is already waiting for the store.
    #[error("another submission is waiting for the store")]
    Submitting,
    /// No task with this id is on the board.
    #[error("unknown task {0}")]
    UnknownTask(TaskId),
    /// The store rejected the request.
    #[error("{context}: {cause:#}")]
    Remote {
        /// What was being attempted.
        context: &'static str,
        /// Underlying store error.
        cause: anyhow::Error,
    },
    /// The board was torn down; the response was ignored.
    #[error("board has been detached")]
    Detached,
}

/// One item of a batch the store rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// Id the item had when it was submitted.
    pub id: TaskId,
    /// Title of the item.
    pub title: String,
    /// Store error rendered as text.
    pub reason: String,
}

/// Aggregate outcome of a batch create or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport<T> {
    /// Items the store accepted.
    pub succeeded: Vec<T>,
    /// Items the store rejected.
    pub failed: Vec<BatchFailure>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BatchReport<T> {
    /// Returns true when every item succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of submitted items.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    fn failure_summary(&self) -> String {
        let mut summary = String::new();
        for (idx, failure) in self.failed.iter().enumerate() {
            if idx > 0 {
                summary.push_str(", ");
            }
            let _ = write!(summary, "{} ({})", failure.title, failure.reason);
        }
        summary
    }
}

#[derive(Debug, Default)]
struct BoardState {
    tasks: Vec<Task>,
    in_flight: HashSet<TaskId>,
    submitting: bool,
    detached: bool,
}

impl BoardState {
    const fn ensure_attached(&self) -> Result<(), ControllerError> {
        if self.detached {
            return Err(ControllerError::Detached);
        }
        Ok(())
    }

    fn index_of(&self, id: TaskId) -> Result<usize, ControllerError> {
        self.tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or(ControllerError::UnknownTask(id))
    }

    fn ensure_idle(&self, id: TaskId) -> Result<(), ControllerError> {
        if self.in_flight.contains(&id) {
            return Err(ControllerError::Busy(id));
        }
        Ok(())
    }

    fn resolve(&self, target: DropTarget) -> Result<TaskStatus, ControllerError> {
        match target {
            DropTarget::Column(status) => Ok(status),
            DropTarget::Card(card) => Ok(self.tasks[self.index_of(card)?].status()),
        }
    }

    fn replace(&mut self, task: Task) {
        if let Some(slot) = self.tasks.iter_mut().find(|slot| slot.id == task.id) {
            *slot = task;
        }
    }

    /// Merge a record the store just confirmed. A reload that finished while
    /// the request was outstanding may already hold it.
    fn upsert(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|slot| slot.id == task.id) {
            Some(slot) => *slot = task,
            None => self.tasks.push(task),
        }
    }
}

const MISSING_RESULT: &str = "store returned no result";

/// Mediates between board gestures and the remote store.
pub struct TransitionController<S, N> {
    store: S,
    notifier: N,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<BoardState>>,
}

impl<S, N> TransitionController<S, N>
where
    S: RemoteTaskStore,
    N: Notifier,
{
    /// Create a controller with an empty board.
    pub fn new(store: S, notifier: N) -> Self {
        Self {
            store,
            notifier,
            clock: Arc::new(SystemClock::default()),
            state: Arc::new(Mutex::new(BoardState::default())),
        }
    }

    /// Replace the clock used for completion stamps and due buckets.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// The backing store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Today's date according to the controller clock.
    pub fn today(&self) -> Date {
        self.clock.today()
    }

    fn success(&self, message: impl Into<String>) {
        self.notifier.notify(Notification::success(message));
    }

    fn failure(&self, message: impl Into<String>) {
        self.notifier.notify(Notification::error(message));
    }

    /// Replace the board with the store's records.
    ///
    /// Tasks with a request in flight keep their local version.
    ///
    /// # Errors
    /// Returns [`ControllerError::Remote`] when the store cannot be read.
    pub async fn load(&self) -> Result<usize, ControllerError> {
        self.state.lock().await.ensure_attached()?;
        let loaded = self.store.get_all().await.map_err(Into::<anyhow::Error>::into);

        let mut state = self.state.lock().await;
        state.ensure_attached()?;
        match loaded {
            Ok(mut tasks) => {
                for task in &mut tasks {
                    if state.in_flight.contains(&task.id)
                        && let Some(local) = state.tasks.iter().find(|local| local.id == task.id)
                    {
                        local.clone_into(task);
                    }
                }
                state.tasks = tasks;
                let count = state.tasks.len();
                drop(state);
                info!(count, "Loaded board");
                Ok(count)
            }
            Err(cause) => {
                drop(state);
                warn!(error = %cause, "Failed to load board");
                self.failure("Failed to load tasks");
                Err(ControllerError::Remote {
                    context: "failed to load tasks",
                    cause,
                })
            }
        }
    }

    /// Clone of every task on the board, in collection order.
    pub async fn snapshot(&self) -> Vec<Task> {
        self.state.lock().await.tasks.clone()
    }

    /// One task by id.
    pub async fn get(&self, id: TaskId) -> Option<Task> {
        let state = self.state.lock().await;
        state.tasks.iter().find(|task| task.id == id).cloned()
    }

    /// Filtered and sorted snapshot for a view.
    pub async fn view(&self, criteria: &FilterCriteria, sort: SortSpec) -> Vec<Task> {
        let today = self.today();
        let state = self.state.lock().await;
        filter::view(&state.tasks, criteria, sort, today)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Returns true while `id` has a request in flight.
    pub async fn is_busy(&self, id: TaskId) -> bool {
        self.state.lock().await.in_flight.contains(&id)
    }

    /// Handle a card drop.
    ///
    /// The new status is applied immediately; the store is then asked to
    /// persist the full record. A rejection restores the exact record that
    /// existed before the drop.
    ///
    /// # Errors
    /// Returns [`ControllerError::UnknownTask`] when the card or the drop
    /// target is not on the board, and [`ControllerError::Detached`] after
    /// [`detach`](Self::detach).
    pub async fn move_task(&self, id: TaskId, target: DropTarget) -> Result<MoveOutcome, ControllerError> {
        let (before, optimistic) = {
            let mut state = self.state.lock().await;
            state.ensure_attached()?;
            let idx = state.index_of(id)?;
            let status = state.resolve(target)?;
            if state.in_flight.contains(&id) {
                debug!(task = %id, "Ignoring drop on busy task");
                return Ok(MoveOutcome::Busy);
            }
            let before = state.tasks[idx].clone();
            if before.status() == status {
                return Ok(MoveOutcome::Unchanged);
            }
            state.tasks[idx].set_status(status, self.today());
            state.in_flight.insert(id);
            (before, state.tasks[idx].clone())
        };
        debug!(
            task = %id,
            from = before.status().column_id(),
            to = optimistic.status().column_id(),
            "Applied optimistic move"
        );

        let result = self.store.update(id, &optimistic).await.map_err(Into::<anyhow::Error>::into);

        let mut state = self.state.lock().await;
        state.in_flight.remove(&id);
        if state.detached {
            debug!(task = %id, "Discarding move response after detach");
            return Ok(MoveOutcome::Discarded);
        }
        match result {
            Ok(saved) => {
                state.replace(saved.clone());
                drop(state);
                info!(task = %id, status = saved.status().column_id(), "Move confirmed");
                self.success(format!("Task moved to {}", saved.status().label()));
                Ok(MoveOutcome::Confirmed(saved))
            }
            Err(cause) => {
                state.replace(before);
                drop(state);
                warn!(task = %id, error = %cause, "Move rejected, rolled back");
                self.failure("Failed to update task status");
                Ok(MoveOutcome::RolledBack)
            }
        }
    }

    /// Submit a new task from a form.
    ///
    /// # Errors
    /// Returns [`ControllerError::Validation`] for incomplete forms and
    /// [`ControllerError::Remote`] when the store rejects the record.
    pub async fn create(&self, template: &TaskTemplate) -> Result<Task, ControllerError> {
        let draft = match Task::from_template(template) {
            Ok(draft) => draft,
            Err(err) => return Err(self.reject_form(err)),
        };
        self.begin_submit().await?;

        let result = self.store.create(&draft).await.map_err(Into::<anyhow::Error>::into);

        let mut state = self.state.lock().await;
        state.submitting = false;
        state.ensure_attached()?;
        match result {
            Ok(saved) => {
                state.upsert(saved.clone());
                drop(state);
                info!(task = %saved.id, title = %saved.title, "Created task");
                self.success("Task created successfully!");
                Ok(saved)
            }
            Err(cause) => {
                drop(state);
                warn!(title = %draft.title, error = %cause, "Create rejected");
                self.failure("Failed to create task");
                Err(ControllerError::Remote {
                    context: "failed to create task",
                    cause,
                })
            }
        }
    }

    /// Submit a task form that may carry a repetition rule.
    ///
    /// The template is expanded into its instances, all of which are sent in
    /// one batch. Accepted instances join the board even when others fail,
    /// and a single notification summarizes the batch.
    ///
    /// # Errors
    /// Returns [`ControllerError::Validation`] for incomplete forms.
    pub async fn create_recurring(
        &self,
        template: &TaskTemplate,
        recurrence: Option<Recurrence>,
    ) -> Result<BatchReport<Task>, ControllerError> {
        let expanded = match recurrence {
            Some(rule) => template
                .validate()
                .map_err(RecurrenceError::from)
                .and_then(|_| recurrence::expand(template, rule.frequency, rule.until)),
            None => Task::from_template(template)
                .map(|task| vec![task])
                .map_err(RecurrenceError::from),
        };
        let instances = match expanded {
            Ok(instances) => instances,
            Err(RecurrenceError::Invalid(err)) => return Err(self.reject_form(err)),
        };
        self.begin_submit().await?;
        debug!(count = instances.len(), "Submitting recurring batch");

        let results = self.store.create_batch(&instances).await;

        let mut state = self.state.lock().await;
        state.submitting = false;
        state.ensure_attached()?;
        let mut report = BatchReport::default();
        let mut results = results.into_iter();
        for draft in &instances {
            let reason = match results.next().map(|result| result.map_err(Into::<anyhow::Error>::into)) {
                Some(Ok(saved)) => {
                    state.upsert(saved.clone());
                    report.succeeded.push(saved);
                    continue;
                }
                Some(Err(cause)) => format!("{cause:#}"),
                None => MISSING_RESULT.to_owned(),
            };
            report.failed.push(BatchFailure {
                id: draft.id,
                title: draft.title.clone(),
                reason,
            });
        }
        drop(state);

        let created = report.succeeded.len();
        if report.is_complete() {
            info!(count = created, "Created recurring batch");
            if created == 1 {
                self.success("Task created successfully!");
            } else {
                self.success(format!("{created} recurring tasks created!"));
            }
        } else {
            warn!(created, failed = report.failed.len(), "Recurring batch partially rejected");
            self.failure(format!(
                "Created {created} of {} tasks; failed: {}",
                report.total(),
                report.failure_summary()
            ));
        }
        Ok(report)
    }

    /// Apply a form edit to one task.
    ///
    /// An edit that changes nothing returns the current record without a
    /// store call.
    ///
    /// # Errors
    /// Returns [`ControllerError::Busy`] while the task has a request in
    /// flight, [`ControllerError::Validation`] for a blank title, and
    /// [`ControllerError::Remote`] when the store rejects the update.
    pub async fn update(&self, id: TaskId, edit: &TaskEdit) -> Result<Task, ControllerError> {
        self.commit(id, |current, today| edit.apply(current, today), "Task updated successfully!")
            .await
    }

    /// Flip the completion checkbox of a task.
    ///
    /// # Errors
    /// Same as [`update`](Self::update).
    pub async fn toggle_completed(&self, id: TaskId) -> Result<Task, ControllerError> {
        self.commit(
            id,
            |current, today| {
                let mut task = current.clone();
                task.set_completed(!current.completed(), today);
                Ok(task)
            },
            "Task updated successfully!",
        )
        .await
    }

    /// Move a task to another due date, as when an event is dropped on the calendar.
    ///
    /// # Errors
    /// Same as [`update`](Self::update).
    pub async fn reschedule(&self, id: TaskId, due_date: Date) -> Result<Task, ControllerError> {
        let edit = TaskEdit::reschedule(due_date);
        self.commit(id, |current, today| edit.apply(current, today), "Task rescheduled successfully!")
            .await
    }

    async fn commit<F>(&self, id: TaskId, edit: F, success: &str) -> Result<Task, ControllerError>
    where
        F: FnOnce(&Task, Date) -> Result<Task, ValidationError>,
    {
        let (current, edited) = {
            let mut state = self.state.lock().await;
            state.ensure_attached()?;
            let idx = state.index_of(id)?;
            state.ensure_idle(id)?;
            let current = state.tasks[idx].clone();
            let edited = match edit(&current, self.today()) {
                Ok(edited) => edited,
                Err(err) => {
                    drop(state);
                    return Err(self.reject_form(err));
                }
            };
            if edited == current {
                return Ok(current);
            }
            state.in_flight.insert(id);
            (current, edited)
        };

        let result = self.store.update(id, &edited).await.map_err(Into::<anyhow::Error>::into);

        let mut state = self.state.lock().await;
        state.in_flight.remove(&id);
        state.ensure_attached()?;
        match result {
            Ok(saved) => {
                state.replace(saved.clone());
                drop(state);
                info!(task = %id, "Updated task");
                self.success(success);
                Ok(saved)
            }
            Err(cause) => {
                drop(state);
                warn!(task = %id, title = %current.title, error = %cause, "Update rejected");
                self.failure("Failed to update task");
                Err(ControllerError::Remote {
                    context: "failed to update task",
                    cause,
                })
            }
        }
    }

    /// Delete one or more tasks.
    ///
    /// Accepted deletes are applied even when others fail; one notification
    /// summarizes the whole request.
    ///
    /// # Errors
    /// Returns [`ControllerError::UnknownTask`] or [`ControllerError::Busy`]
    /// before anything is sent when an id cannot be deleted right now.
    pub async fn delete(&self, ids: &[TaskId]) -> Result<BatchReport<TaskId>, ControllerError> {
        let mut unique = Vec::with_capacity(ids.len());
        let titles = {
            let mut state = self.state.lock().await;
            state.ensure_attached()?;
            let mut titles = Vec::with_capacity(ids.len());
            for &id in ids {
                if unique.contains(&id) {
                    continue;
                }
                let idx = state.index_of(id)?;
                state.ensure_idle(id)?;
                titles.push(state.tasks[idx].title.clone());
                unique.push(id);
            }
            if unique.is_empty() {
                return Ok(BatchReport::default());
            }
            state.in_flight.extend(unique.iter().copied());
            titles
        };

        let results = self.store.delete_batch(&unique).await;

        let mut state = self.state.lock().await;
        for id in &unique {
            state.in_flight.remove(id);
        }
        state.ensure_attached()?;
        let mut report = BatchReport::default();
        let mut results = results.into_iter();
        for (id, title) in unique.iter().zip(titles) {
            let reason = match results.next().map(|result| result.map_err(Into::<anyhow::Error>::into)) {
                Some(Ok(())) => {
                    report.succeeded.push(*id);
                    continue;
                }
                Some(Err(cause)) => format!("{cause:#}"),
                None => MISSING_RESULT.to_owned(),
            };
            report.failed.push(BatchFailure { id: *id, title, reason });
        }
        state.tasks.retain(|task| !report.succeeded.contains(&task.id));
        drop(state);

        let deleted = report.succeeded.len();
        if report.is_complete() {
            info!(count = deleted, "Deleted tasks");
            if deleted == 1 {
                self.success("Task deleted successfully!");
            } else {
                self.success(format!("{deleted} tasks deleted successfully!"));
            }
        } else {
            warn!(deleted, failed = report.failed.len(), "Delete partially rejected");
            self.failure(format!(
                "Deleted {deleted} of {} tasks; failed: {}",
                report.total(),
                report.failure_summary()
            ));
        }
        Ok(report)
    }

    /// Tear the board down. Responses that arrive afterwards are ignored.
    pub async fn detach(&self) {
        self.state.lock().await.detached = true;
        debug!("Board detached");
    }

    async fn begin_submit(&self) -> Result<(), ControllerError> {
        let mut state = self.state.lock().await;
        state.ensure_attached()?;
        if state.submitting {
            return Err(ControllerError::Submitting);
        }
        state.submitting = true;
        Ok(())
    }

    fn reject_form(&self, err: ValidationError) -> ControllerError {
        debug!(error = %err, "Rejected form");
        self.failure(capitalize(&err.to_string()));
        ControllerError::Validation(err)
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
