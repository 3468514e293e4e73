use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::Date;

use crate::id::TaskId;
use crate::record::ViewRecord;

/// Location used when configuration does not provide one.
pub const DEFAULT_LOCATION: &str = "North Field";

/// Urgency of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Can wait.
    Low,
    /// Regular work.
    #[default]
    Medium,
    /// Needs attention first.
    High,
}

impl Priority {
    /// Every priority from lowest to highest.
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Display name, also used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// Kanban column a task currently occupies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Not started.
    #[default]
    Todo,
    /// Being worked on.
    InProgress,
    /// Waiting for a second look.
    Review,
    /// Finished.
    Done,
}

impl TaskStatus {
    /// Columns in board order.
    pub const ALL: [Self; 4] = [Self::Todo, Self::InProgress, Self::Review, Self::Done];

    /// Column identifier used by drop targets.
    #[must_use]
    pub const fn column_id(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "inprogress",
            Self::Review => "review",
            Self::Done => "done",
        }
    }

    /// Column heading.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Review => "Review",
            Self::Done => "Done",
        }
    }
}

/// Kind of field work a task represents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum TaskType {
    #[default]
    Watering,
    Fertilizing,
    Weeding,
    Harvesting,
    Planting,
    PestControl,
    Maintenance,
    Inspection,
    Irrigation,
    Pruning,
    SoilTesting,
    EquipmentMaintenance,
}

impl TaskType {
    /// Every task type in form order.
    pub const ALL: [Self; 12] = [
        Self::Watering,
        Self::Fertilizing,
        Self::Weeding,
        Self::Harvesting,
        Self::Planting,
        Self::PestControl,
        Self::Maintenance,
        Self::Inspection,
        Self::Irrigation,
        Self::Pruning,
        Self::SoilTesting,
        Self::EquipmentMaintenance,
    ];

    /// Wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Watering => "watering",
            Self::Fertilizing => "fertilizing",
            Self::Weeding => "weeding",
            Self::Harvesting => "harvesting",
            Self::Planting => "planting",
            Self::PestControl => "pest_control",
            Self::Maintenance => "maintenance",
            Self::Inspection => "inspection",
            Self::Irrigation => "irrigation",
            Self::Pruning => "pruning",
            Self::SoilTesting => "soil_testing",
            Self::EquipmentMaintenance => "equipment_maintenance",
        }
    }
}

/// Error returned when a user-facing token does not name a known variant.
#[derive(Debug, Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// Offending input.
    pub value: String,
}

fn normalize_token(token: &str) -> String {
    token.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

impl FromStr for Priority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(UnknownVariant {
                kind: "priority",
                value: s.to_owned(),
            }),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "todo" | "to_do" => Ok(Self::Todo),
            "inprogress" | "in_progress" => Ok(Self::InProgress),
            "review" => Ok(Self::Review),
            "done" => Ok(Self::Done),
            _ => Err(UnknownVariant {
                kind: "status",
                value: s.to_owned(),
            }),
        }
    }
}

impl FromStr for TaskType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_token(s);
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownVariant {
                kind: "task type",
                value: s.to_owned(),
            })
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow position plus the completion stamp that must follow it.
///
/// `completed` is derived from the status and `completion_date` is present
/// exactly when the status is [`TaskStatus::Done`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProgressRecord", into = "ProgressRecord")]
pub struct Progress {
    status: TaskStatus,
    completion_date: Option<Date>,
}

impl Progress {
    /// Current column.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// True iff the status is `Done`.
    #[must_use]
    pub fn completed(&self) -> bool {
        self.status == TaskStatus::Done
    }

    /// Day the task entered `Done`.
    #[must_use]
    pub const fn completion_date(&self) -> Option<Date> {
        self.completion_date
    }

    /// Move to `status`, stamping or clearing the completion date.
    pub fn set_status(&mut self, status: TaskStatus, today: Date) {
        self.completion_date = match (self.status, status) {
            (TaskStatus::Done, TaskStatus::Done) => self.completion_date.or(Some(today)),
            (_, TaskStatus::Done) => Some(today),
            _ => None,
        };
        self.status = status;
    }

    /// Completion toggle used by list views; maps onto `Done` / `Todo`.
    pub fn set_completed(&mut self, completed: bool, today: Date) {
        let status = if completed { TaskStatus::Done } else { TaskStatus::Todo };
        self.set_status(status, today);
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressRecord {
    #[serde(default)]
    status: Option<TaskStatus>,
    #[serde(default)]
    completed: Option<bool>,
    #[serde(default, with = "crate::iso_date::option")]
    completion_date: Option<Date>,
}

impl TryFrom<ProgressRecord> for Progress {
    type Error = String;

    fn try_from(record: ProgressRecord) -> Result<Self, Self::Error> {
        let status = match (record.status, record.completed) {
            (Some(status), Some(completed)) if completed != (status == TaskStatus::Done) => {
                return Err(format!(
                    "completed={completed} contradicts status '{}'",
                    status.column_id()
                ));
            }
            (Some(status), _) => status,
            (None, Some(true)) => TaskStatus::Done,
            (None, _) => TaskStatus::Todo,
        };
        if (status == TaskStatus::Done) != record.completion_date.is_some() {
            return Err(format!(
                "completion date must be set exactly when the task is done (status '{}')",
                status.column_id()
            ));
        }
        Ok(Self {
            status,
            completion_date: record.completion_date,
        })
    }
}

impl From<Progress> for ProgressRecord {
    fn from(progress: Progress) -> Self {
        Self {
            status: Some(progress.status),
            completed: Some(progress.completed()),
            completion_date: progress.completion_date,
        }
    }
}

/// Values filled into new tasks when the form leaves them out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefaults {
    /// Field or greenhouse assigned to new tasks.
    pub location: String,
    /// Initial priority.
    pub priority: Priority,
    /// Initial task type.
    pub task_type: TaskType,
}

impl Default for TaskDefaults {
    fn default() -> Self {
        Self {
            location: DEFAULT_LOCATION.to_owned(),
            priority: Priority::default(),
            task_type: TaskType::default(),
        }
    }
}

/// Validation failures detected before any state change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Title is empty or whitespace.
    #[error("task title must not be empty")]
    MissingTitle,
    /// No due date was provided.
    #[error("task due date is required")]
    MissingDueDate,
}

/// Task as submitted by a form, before it has been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTemplate {
    /// Provisional identity; generated instances derive theirs from it.
    pub id: TaskId,
    /// Title entered by the user.
    pub title: String,
    /// Free-form notes.
    pub description: Option<String>,
    /// Urgency.
    pub priority: Priority,
    /// Due date; required.
    pub due_date: Option<Date>,
    /// Initial column.
    pub progress: Progress,
    /// Field or greenhouse.
    pub location: String,
    /// Person responsible.
    pub assignee: Option<String>,
    /// Category.
    pub task_type: TaskType,
}

impl TaskTemplate {
    /// Start a template with a fresh local id and configured defaults.
    #[must_use]
    pub fn new(title: impl Into<String>, defaults: &TaskDefaults) -> Self {
        Self {
            id: TaskId::local(),
            title: title.into(),
            description: None,
            priority: defaults.priority,
            due_date: None,
            progress: Progress::default(),
            location: defaults.location.clone(),
            assignee: None,
            task_type: defaults.task_type,
        }
    }

    /// Set the due date.
    #[must_use]
    pub const fn due(mut self, date: Date) -> Self {
        self.due_date = Some(date);
        self
    }

    /// Set the priority.
    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the assignee.
    #[must_use]
    pub fn assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    /// Override the location.
    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Set the task type.
    #[must_use]
    pub const fn task_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    /// Place the task in `status` from the start.
    #[must_use]
    pub fn status(mut self, status: TaskStatus, today: Date) -> Self {
        self.progress.set_status(status, today);
        self
    }

    /// Check required fields and return the due date.
    ///
    /// # Errors
    /// Returns [`ValidationError`] when the title is blank or the due date is missing.
    pub fn validate(&self) -> Result<Date, ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        self.due_date.ok_or(ValidationError::MissingDueDate)
    }

    pub(crate) fn instantiate(&self, id: TaskId, title: String, due_date: Date) -> Task {
        Task {
            id,
            title,
            description: non_blank(self.description.as_deref()),
            priority: self.priority,
            due_date,
            progress: self.progress,
            location: self.location.trim().to_owned(),
            assignee: non_blank(self.assignee.as_deref()),
            task_type: self.task_type,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// Concrete dated task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Identity, local until the store assigns a permanent id.
    pub id: TaskId,
    /// Human-readable title.
    pub title: String,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Urgency.
    #[serde(default)]
    pub priority: Priority,
    /// Day the work is due.
    #[serde(with = "crate::iso_date")]
    pub due_date: Date,
    #[serde(flatten)]
    progress: Progress,
    /// Field or greenhouse.
    pub location: String,
    /// Person responsible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// Category.
    #[serde(default)]
    pub task_type: TaskType,
}

impl Task {
    /// Build a task from a validated template.
    ///
    /// # Errors
    /// Returns [`ValidationError`] when required template fields are missing.
    pub fn from_template(template: &TaskTemplate) -> Result<Self, ValidationError> {
        let due = template.validate()?;
        Ok(template.instantiate(template.id, template.title.trim().to_owned(), due))
    }

    /// Current column.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.progress.status()
    }

    /// True iff the task is in `Done`.
    #[must_use]
    pub fn completed(&self) -> bool {
        self.progress.completed()
    }

    /// Day the task entered `Done`.
    #[must_use]
    pub const fn completion_date(&self) -> Option<Date> {
        self.progress.completion_date()
    }

    /// Workflow state together with its completion stamp.
    #[must_use]
    pub const fn progress(&self) -> Progress {
        self.progress
    }

    /// Move the task to `status`, keeping `completed` and `completion_date` in step.
    pub fn set_status(&mut self, status: TaskStatus, today: Date) {
        self.progress.set_status(status, today);
    }

    /// Mark the task complete (`Done`) or reopen it (`Todo`).
    pub fn set_completed(&mut self, completed: bool, today: Date) {
        self.progress.set_completed(completed, today);
    }
}

impl ViewRecord for Task {
    fn date(&self) -> Option<Date> {
        Some(self.due_date)
    }

    fn name(&self) -> &str {
        &self.title
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        fields.extend(self.description.as_deref());
        fields
    }

    fn priority(&self) -> Option<Priority> {
        Some(self.priority)
    }

    fn assignee(&self) -> Option<&str> {
        self.assignee.as_deref()
    }

    fn category(&self) -> Option<&str> {
        Some(self.task_type.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn template() -> TaskTemplate {
        TaskTemplate::new("Water field", &TaskDefaults::default()).due(date!(2024 - 03 - 01))
    }

    #[test]
    fn template_fills_defaults_once() {
        let template = template();
        assert_eq!(template.location, DEFAULT_LOCATION);
        assert_eq!(template.priority, Priority::Medium);
        assert_eq!(template.task_type, TaskType::Watering);
        assert_eq!(template.progress.status(), TaskStatus::Todo);
    }

    #[test]
    fn validation_requires_title_and_due_date() {
        let defaults = TaskDefaults::default();
        let blank = TaskTemplate::new("   ", &defaults).due(date!(2024 - 03 - 01));
        assert_eq!(blank.validate(), Err(ValidationError::MissingTitle));

        let undated = TaskTemplate::new("Weed rows", &defaults);
        assert_eq!(undated.validate(), Err(ValidationError::MissingDueDate));
        assert_eq!(Task::from_template(&undated), Err(ValidationError::MissingDueDate));
    }

    #[test]
    fn from_template_trims_and_drops_blank_optionals() {
        let template = template().assignee("  ").description(" soak beds ");
        let task = Task::from_template(&template).unwrap_or_else(|err| panic!("valid: {err}"));
        assert_eq!(task.id, template.id);
        assert_eq!(task.assignee, None);
        assert_eq!(task.description.as_deref(), Some("soak beds"));
        assert!(!task.completed());
        assert_eq!(task.completion_date(), None);
    }

    #[test]
    fn status_changes_keep_completion_consistent() {
        let mut task = Task::from_template(&template()).unwrap_or_else(|err| panic!("valid: {err}"));
        let first_day = date!(2024 - 03 - 02);

        task.set_status(TaskStatus::Done, first_day);
        assert!(task.completed());
        assert_eq!(task.completion_date(), Some(first_day));

        task.set_status(TaskStatus::Done, date!(2024 - 03 - 05));
        assert_eq!(task.completion_date(), Some(first_day));

        task.set_status(TaskStatus::Review, date!(2024 - 03 - 06));
        assert!(!task.completed());
        assert_eq!(task.completion_date(), None);

        task.set_completed(true, date!(2024 - 03 - 07));
        assert_eq!(task.status(), TaskStatus::Done);
        task.set_completed(false, date!(2024 - 03 - 08));
        assert_eq!(task.status(), TaskStatus::Todo);
        assert_eq!(task.completion_date(), None);
    }

    #[test]
    fn tasks_serialize_with_derived_completed_flag() {
        let mut task = Task::from_template(&template()).unwrap_or_else(|err| panic!("valid: {err}"));
        task.set_status(TaskStatus::Done, date!(2024 - 03 - 04));
        let json = serde_json::to_value(&task).unwrap_or_else(|err| panic!("serialize: {err}"));
        assert_eq!(json["status"], "done");
        assert_eq!(json["completed"], true);
        assert_eq!(json["completionDate"], "2024-03-04");
        assert_eq!(json["dueDate"], "2024-03-01");
        assert_eq!(json["taskType"], "watering");

        let back: Task = serde_json::from_value(json).unwrap_or_else(|err| panic!("deserialize: {err}"));
        assert_eq!(back, task);
    }

    #[test]
    fn inconsistent_records_are_rejected() {
        let contradictory = serde_json::json!({
            "id": "7",
            "title": "Harvest",
            "dueDate": "2024-03-01",
            "status": "todo",
            "completed": true,
            "location": "North Field"
        });
        assert!(serde_json::from_value::<Task>(contradictory).is_err());

        let unstamped = serde_json::json!({
            "id": "8",
            "title": "Harvest",
            "dueDate": "2024-03-01",
            "status": "done",
            "location": "North Field"
        });
        assert!(serde_json::from_value::<Task>(unstamped).is_err());
    }

    #[test]
    fn status_is_derived_from_completed_when_missing() {
        let legacy = serde_json::json!({
            "id": "9",
            "title": "Prune",
            "dueDate": "2024-03-01",
            "completed": true,
            "completionDate": "2024-03-02",
            "location": "Greenhouse A"
        });
        let task: Task = serde_json::from_value(legacy).unwrap_or_else(|err| panic!("deserialize: {err}"));
        assert_eq!(task.status(), TaskStatus::Done);
        assert_eq!(task.priority, Priority::Medium);
    }

    #[test]
    fn tokens_parse_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().ok(), Some(Priority::High));
        assert_eq!("In Progress".parse::<TaskStatus>().ok(), Some(TaskStatus::InProgress));
        assert_eq!("inprogress".parse::<TaskStatus>().ok(), Some(TaskStatus::InProgress));
        assert_eq!("pest-control".parse::<TaskType>().ok(), Some(TaskType::PestControl));
        assert!("urgent".parse::<Priority>().is_err());
    }
}
