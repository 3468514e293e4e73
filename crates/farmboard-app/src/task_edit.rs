use farmboard_core::{Priority, Task, TaskStatus, TaskType, ValidationError};
use time::Date;

/// Patch for an optional text field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextPatch {
    /// Overwrite with a new value; blank values clear the field.
    Set(String),
    /// Clear the field.
    Clear,
}

impl TextPatch {
    fn apply(&self, field: &mut Option<String>) {
        *field = match self {
            Self::Set(value) => {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_owned())
            }
            Self::Clear => None,
        };
    }
}

/// Field overwrites submitted by an edit form. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    /// New title.
    pub title: Option<String>,
    /// Description change.
    pub description: Option<TextPatch>,
    /// New priority.
    pub priority: Option<Priority>,
    /// New due date.
    pub due_date: Option<Date>,
    /// New column.
    pub status: Option<TaskStatus>,
    /// New location.
    pub location: Option<String>,
    /// Assignee change.
    pub assignee: Option<TextPatch>,
    /// New task type.
    pub task_type: Option<TaskType>,
}

impl TaskEdit {
    /// Edit that only moves the due date.
    #[must_use]
    pub fn reschedule(due_date: Date) -> Self {
        Self {
            due_date: Some(due_date),
            ..Self::default()
        }
    }

    /// Edit that only changes the column.
    #[must_use]
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Returns true when the edit touches no field.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.status.is_none()
            && self.location.is_none()
            && self.assignee.is_none()
            && self.task_type.is_none()
    }

    /// Produce the edited copy of `current`; `current` itself is left alone.
    ///
    /// # Errors
    /// Returns [`ValidationError::MissingTitle`] when the new title is blank.
    pub fn apply(&self, current: &Task, today: Date) -> Result<Task, ValidationError> {
        let mut task = current.clone();
        if let Some(title) = &self.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(ValidationError::MissingTitle);
            }
            title.clone_into(&mut task.title);
        }
        if let Some(patch) = &self.description {
            patch.apply(&mut task.description);
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(status) = self.status {
            task.set_status(status, today);
        }
        if let Some(location) = &self.location {
            let location = location.trim();
            if !location.is_empty() {
                location.clone_into(&mut task.location);
            }
        }
        if let Some(patch) = &self.assignee {
            patch.apply(&mut task.assignee);
        }
        if let Some(task_type) = self.task_type {
            task.task_type = task_type;
        }
        Ok(task)
    }
}
