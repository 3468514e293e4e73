//! Expansion of a repeating task into dated instances.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Date, Duration};

use crate::date::add_months;
use crate::task::{Task, TaskTemplate, UnknownVariant, ValidationError};

/// Upper bound on instances produced by one expansion.
pub const MAX_OCCURRENCES: usize = 52;

/// Step between two generated instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// One day.
    Daily,
    /// Seven days.
    Weekly,
    /// One calendar month.
    Monthly,
}

impl Frequency {
    /// Word used in the ordinal title suffix.
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Daily => "Day",
            Self::Weekly => "Week",
            Self::Monthly => "Month",
        }
    }

    /// Date of the `steps`-th occurrence after `anchor`.
    fn advance(self, anchor: Date, steps: u32) -> Option<Date> {
        match self {
            Self::Daily => anchor.checked_add(Duration::days(i64::from(steps))),
            Self::Weekly => anchor.checked_add(Duration::weeks(i64::from(steps))),
            Self::Monthly => add_months(anchor, steps),
        }
    }
}

impl FromStr for Frequency {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            _ => Err(UnknownVariant {
                kind: "frequency",
                value: s.to_owned(),
            }),
        }
    }
}

/// Repetition rule submitted alongside a task form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    /// Step between instances.
    pub frequency: Frequency,
    /// Last day an instance may fall on.
    #[serde(with = "crate::iso_date::option")]
    pub until: Option<Date>,
}

/// Errors raised before any instance is generated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecurrenceError {
    /// Template has no usable due date.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Expand `template` into dated instances repeating every `frequency` until `until`.
///
/// Without an `until` later than the template's due date the result is the
/// template alone. Otherwise instances start on the due date, carry an ordinal
/// suffix such as `(Week 3)`, and stop once the next date would pass `until`
/// or [`MAX_OCCURRENCES`] instances exist.
///
/// # Errors
/// Returns [`RecurrenceError`] when the template lacks a due date.
pub fn expand(
    template: &TaskTemplate,
    frequency: Frequency,
    until: Option<Date>,
) -> Result<Vec<Task>, RecurrenceError> {
    let due = template.due_date.ok_or(ValidationError::MissingDueDate)?;
    let title = template.title.trim();

    let Some(until) = until.filter(|until| *until > due) else {
        return Ok(vec![template.instantiate(template.id, title.to_owned(), due)]);
    };

    let mut instances = Vec::new();
    for ordinal in 1..=MAX_OCCURRENCES {
        let Ok(ordinal) = u16::try_from(ordinal) else {
            break;
        };
        let Some(date) = frequency.advance(due, u32::from(ordinal) - 1) else {
            break;
        };
        if date > until {
            break;
        }
        instances.push(template.instantiate(
            template.id.derive(ordinal),
            format!("{title} ({} {ordinal})", frequency.unit()),
            date,
        ));
    }
    Ok(instances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::TaskId;
    use crate::task::{Priority, TaskDefaults};
    use std::collections::HashSet;
    use time::macros::date;

    fn water_field() -> TaskTemplate {
        TaskTemplate::new("Water field", &TaskDefaults::default())
            .due(date!(2024 - 03 - 01))
            .priority(Priority::Medium)
    }

    fn dates(tasks: &[Task]) -> Vec<Date> {
        tasks.iter().map(|task| task.due_date).collect()
    }

    #[test]
    fn weekly_series_includes_both_ends() {
        let tasks = expand(&water_field(), Frequency::Weekly, Some(date!(2024 - 03 - 22)))
            .unwrap_or_else(|err| panic!("expand: {err}"));
        assert_eq!(
            dates(&tasks),
            vec![
                date!(2024 - 03 - 01),
                date!(2024 - 03 - 08),
                date!(2024 - 03 - 15),
                date!(2024 - 03 - 22)
            ]
        );
        let titles: Vec<&str> = tasks.iter().map(|task| task.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Water field (Week 1)",
                "Water field (Week 2)",
                "Water field (Week 3)",
                "Water field (Week 4)"
            ]
        );
        assert!(tasks.iter().all(|task| task.priority == Priority::Medium));
    }

    #[test]
    fn missing_or_early_until_yields_template_only() {
        let template = water_field();
        for until in [None, Some(date!(2024 - 03 - 01)), Some(date!(2024 - 02 - 01))] {
            let tasks = expand(&template, Frequency::Daily, until).unwrap_or_else(|err| panic!("expand: {err}"));
            assert_eq!(tasks.len(), 1);
            assert_eq!(tasks[0].id, template.id);
            assert_eq!(tasks[0].title, "Water field");
        }
    }

    #[test]
    fn long_ranges_are_capped() {
        let tasks = expand(&water_field(), Frequency::Daily, Some(date!(2025 - 03 - 01)))
            .unwrap_or_else(|err| panic!("expand: {err}"));
        assert_eq!(tasks.len(), MAX_OCCURRENCES);
        assert_eq!(tasks[51].title, "Water field (Day 52)");
    }

    #[test]
    fn dates_strictly_increase_and_stay_in_range() {
        let until = date!(2024 - 12 - 31);
        for frequency in [Frequency::Daily, Frequency::Weekly, Frequency::Monthly] {
            let tasks = expand(&water_field(), frequency, Some(until)).unwrap_or_else(|err| panic!("expand: {err}"));
            assert!((1..=MAX_OCCURRENCES).contains(&tasks.len()));
            let series = dates(&tasks);
            assert!(series.windows(2).all(|pair| pair[0] < pair[1]));
            assert!(series.iter().all(|date| *date >= date!(2024 - 03 - 01) && *date <= until));
        }
    }

    #[test]
    fn monthly_series_clamps_short_months() {
        let template = TaskTemplate::new("Soil test", &TaskDefaults::default()).due(date!(2024 - 01 - 31));
        let tasks = expand(&template, Frequency::Monthly, Some(date!(2024 - 04 - 30)))
            .unwrap_or_else(|err| panic!("expand: {err}"));
        assert_eq!(
            dates(&tasks),
            vec![
                date!(2024 - 01 - 31),
                date!(2024 - 02 - 29),
                date!(2024 - 03 - 31),
                date!(2024 - 04 - 30)
            ]
        );
        assert_eq!(tasks[2].title, "Soil test (Month 3)");
    }

    #[test]
    fn instances_get_distinct_ids() {
        let template = water_field();
        let tasks = expand(&template, Frequency::Daily, Some(date!(2024 - 04 - 30)))
            .unwrap_or_else(|err| panic!("expand: {err}"));
        let ids: HashSet<TaskId> = tasks.iter().map(|task| task.id).collect();
        assert_eq!(ids.len(), tasks.len());
        assert!(!ids.contains(&template.id));
    }

    #[test]
    fn template_is_left_untouched() {
        let template = water_field();
        let before = template.clone();
        let _ = expand(&template, Frequency::Weekly, Some(date!(2024 - 06 - 01)));
        assert_eq!(template, before);
    }

    #[test]
    fn undated_template_is_rejected() {
        let template = TaskTemplate::new("Water field", &TaskDefaults::default());
        let err = expand(&template, Frequency::Weekly, Some(date!(2024 - 06 - 01)))
            .err()
            .unwrap_or_else(|| panic!("expected validation error"));
        assert_eq!(err, RecurrenceError::Invalid(ValidationError::MissingDueDate));
    }
}
