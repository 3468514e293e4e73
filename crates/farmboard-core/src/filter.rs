//! Shared filter-sort pipeline used by the calendar, kanban, and report views.

use std::cmp::Ordering;
use std::str::FromStr;

use time::Date;

use crate::date::days_until;
use crate::record::ViewRecord;
use crate::task::{Priority, UnknownVariant};
use crate::text_matcher::TextMatcher;

/// Either every value (`All`, the inactive sentinel) or one specific value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection<T> {
    /// Criterion is inactive.
    #[default]
    All,
    /// Only records carrying this value pass.
    Only(T),
}

impl<T> Selection<T> {
    /// Returns true when the criterion restricts the result.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Only(_))
    }

    fn accepts(&self, pred: impl FnOnce(&T) -> bool) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => pred(wanted),
        }
    }
}

/// Relative due-date bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DueBucket {
    /// No restriction.
    #[default]
    All,
    /// Due today.
    Today,
    /// Due within the next seven days, today included.
    ThisWeek,
    /// Due date already passed.
    Overdue,
}

impl DueBucket {
    fn contains(self, due: Date, today: Date) -> bool {
        let days = days_until(due, today);
        match self {
            Self::All => true,
            Self::Today => due == today,
            Self::ThisWeek => (0..=7).contains(&days),
            Self::Overdue => days < 0,
        }
    }
}

impl FromStr for DueBucket {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "" | "all" => Ok(Self::All),
            "today" => Ok(Self::Today),
            "week" | "this_week" => Ok(Self::ThisWeek),
            "overdue" => Ok(Self::Overdue),
            _ => Err(UnknownVariant {
                kind: "due-date bucket",
                value: s.to_owned(),
            }),
        }
    }
}

/// Inclusive numeric bounds on a record's amount.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AmountRange {
    /// Smallest accepted amount.
    pub min: Option<f64>,
    /// Largest accepted amount.
    pub max: Option<f64>,
}

impl AmountRange {
    /// Build bounds from raw form inputs; blank or non-numeric inputs are ignored.
    #[must_use]
    pub fn parse(min: &str, max: &str) -> Self {
        Self {
            min: parse_bound(min),
            max: parse_bound(max),
        }
    }

    /// Returns true when at least one bound is set.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    fn contains(&self, amount: f64) -> bool {
        self.min.is_none_or(|min| amount >= min) && self.max.is_none_or(|max| amount <= max)
    }
}

/// Parse one numeric bound, yielding `None` for blank or malformed input.
#[must_use]
pub fn parse_bound(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Inclusive absolute date window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    /// First accepted date.
    pub since: Option<Date>,
    /// Last accepted date.
    pub until: Option<Date>,
}

impl DateWindow {
    /// Returns true when at least one bound is set.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.since.is_some() || self.until.is_some()
    }

    fn contains(&self, date: Date) -> bool {
        self.since.is_none_or(|since| date >= since) && self.until.is_none_or(|until| date <= until)
    }
}

/// View-local filter state. Every active criterion must hold for a record to pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    /// Free-text query matched against searchable fields.
    pub search: String,
    /// Priority restriction.
    pub priority: Selection<Priority>,
    /// Assignee restriction.
    pub assignee: Selection<String>,
    /// Relative due-date bucket.
    pub due: DueBucket,
    /// Category restriction (task type, expense category).
    pub category: Selection<String>,
    /// Amount bounds.
    pub amount: AmountRange,
    /// Absolute date window.
    pub window: DateWindow,
}

impl FilterCriteria {
    /// Returns true when the record satisfies every active criterion.
    pub fn matches<R: ViewRecord + ?Sized>(&self, record: &R, today: Date) -> bool {
        self.matches_with(record, TextMatcher::new(&self.search).as_ref(), today)
    }

    fn matches_with<R: ViewRecord + ?Sized>(&self, record: &R, matcher: Option<&TextMatcher>, today: Date) -> bool {
        matcher.is_none_or(|matcher| matcher.matches(record))
            && self.priority.accepts(|wanted| record.priority() == Some(*wanted))
            && self
                .assignee
                .accepts(|wanted| record.assignee() == Some(wanted.as_str()))
            && self
                .category
                .accepts(|wanted| record.category().is_some_and(|category| category.eq_ignore_ascii_case(wanted)))
            && (self.due == DueBucket::All || record.date().is_some_and(|due| self.due.contains(due, today)))
            && (!self.amount.is_active() || record.amount().is_some_and(|amount| self.amount.contains(amount)))
            && (!self.window.is_active() || record.date().is_some_and(|date| self.window.contains(date)))
    }
}

/// Field a view is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Due date or expense date.
    #[default]
    Date,
    /// Amount or yield.
    Amount,
    /// Title or description, case-insensitive.
    Name,
    /// Priority, Low < Medium < High.
    Priority,
    /// Category, case-insensitive.
    Category,
}

impl FromStr for SortKey {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" | "due" | "due_date" => Ok(Self::Date),
            "amount" | "yield" => Ok(Self::Amount),
            "name" | "title" => Ok(Self::Name),
            "priority" => Ok(Self::Priority),
            "category" | "type" => Ok(Self::Category),
            _ => Err(UnknownVariant {
                kind: "sort key",
                value: s.to_owned(),
            }),
        }
    }
}

/// Direction of a sort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

impl SortOrder {
    /// The opposite direction, used by header-click toggles.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl FromStr for SortOrder {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            _ => Err(UnknownVariant {
                kind: "sort order",
                value: s.to_owned(),
            }),
        }
    }
}

/// Sort key plus direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortSpec {
    /// Field to compare.
    pub key: SortKey,
    /// Direction.
    pub order: SortOrder,
}

impl SortSpec {
    /// Construct a sort specification.
    #[must_use]
    pub const fn new(key: SortKey, order: SortOrder) -> Self {
        Self { key, order }
    }

    /// Compare two records under this specification.
    pub fn compare<R: ViewRecord + ?Sized>(&self, a: &R, b: &R) -> Ordering {
        let ordering = match self.key {
            SortKey::Date => a.date().cmp(&b.date()),
            SortKey::Amount => match (a.amount(), b.amount()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (x, y) => x.is_some().cmp(&y.is_some()),
            },
            SortKey::Name => a.name().to_lowercase().cmp(&b.name().to_lowercase()),
            SortKey::Priority => a.priority().cmp(&b.priority()),
            SortKey::Category => a
                .category()
                .map(str::to_lowercase)
                .cmp(&b.category().map(str::to_lowercase)),
        };
        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Derive the ordered, filtered view of `records`.
///
/// Inputs are never mutated. Records that compare equal keep their input order.
pub fn view<'a, R: ViewRecord>(
    records: &'a [R],
    criteria: &FilterCriteria,
    sort: SortSpec,
    today: Date,
) -> Vec<&'a R> {
    let matcher = TextMatcher::new(&criteria.search);
    let mut selected: Vec<&R> = records
        .iter()
        .filter(|record| criteria.matches_with(*record, matcher.as_ref(), today))
        .collect();
    selected.sort_by(|a, b| sort.compare(*a, *b));
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expense::Expense;
    use crate::id::TaskId;
    use crate::task::{Task, TaskDefaults, TaskTemplate, TaskType};
    use time::Duration;
    use time::macros::date;

    const TODAY: Date = date!(2024 - 03 - 10);

    fn task(title: &str, priority: Priority, due: Date) -> Task {
        let template = TaskTemplate::new(title, &TaskDefaults::default())
            .due(due)
            .priority(priority);
        Task::from_template(&template).unwrap_or_else(|err| panic!("valid template: {err}"))
    }

    fn ids(view: &[&Task]) -> Vec<TaskId> {
        view.iter().map(|task| task.id).collect()
    }

    fn sample() -> Vec<Task> {
        let mut weed = task("Weed beds", Priority::Low, date!(2024 - 03 - 12));
        weed.assignee = Some("Jane Smith".into());
        weed.task_type = TaskType::Weeding;
        let mut spray = task("Spray orchard", Priority::High, date!(2024 - 03 - 08));
        spray.description = Some("Pest control round".into());
        spray.task_type = TaskType::PestControl;
        vec![
            weed,
            spray,
            task("Harvest kale", Priority::Medium, TODAY),
            task("Order seed", Priority::High, date!(2024 - 03 - 25)),
        ]
    }

    #[test]
    fn empty_criteria_keep_everything() {
        let tasks = sample();
        let out = view(&tasks, &FilterCriteria::default(), SortSpec::default(), TODAY);
        assert_eq!(out.len(), tasks.len());
    }

    #[test]
    fn due_buckets_follow_day_offsets() {
        let tasks = sample();
        let by_bucket = |due| {
            let criteria = FilterCriteria {
                due,
                ..FilterCriteria::default()
            };
            view(&tasks, &criteria, SortSpec::default(), TODAY)
                .iter()
                .map(|task| task.title.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(by_bucket(DueBucket::Today), vec!["Harvest kale"]);
        assert_eq!(by_bucket(DueBucket::ThisWeek), vec!["Harvest kale", "Weed beds"]);
        assert_eq!(by_bucket(DueBucket::Overdue), vec!["Spray orchard"]);
    }

    #[test]
    fn week_bucket_includes_seventh_day_only() {
        let tasks = vec![
            task("day seven", Priority::Low, TODAY + Duration::days(7)),
            task("day eight", Priority::Low, TODAY + Duration::days(8)),
        ];
        let criteria = FilterCriteria {
            due: DueBucket::ThisWeek,
            ..FilterCriteria::default()
        };
        let out = view(&tasks, &criteria, SortSpec::default(), TODAY);
        assert_eq!(ids(&out), vec![tasks[0].id]);
    }

    #[test]
    fn search_matches_title_and_description() {
        let tasks = sample();
        let criteria = FilterCriteria {
            search: "PEST".into(),
            ..FilterCriteria::default()
        };
        let out = view(&tasks, &criteria, SortSpec::default(), TODAY);
        assert_eq!(ids(&out), vec![tasks[1].id]);
    }

    #[test]
    fn assignee_and_category_filters_are_exact() {
        let tasks = sample();
        let criteria = FilterCriteria {
            assignee: Selection::Only("Jane Smith".into()),
            category: Selection::Only("weeding".into()),
            ..FilterCriteria::default()
        };
        let out = view(&tasks, &criteria, SortSpec::default(), TODAY);
        assert_eq!(ids(&out), vec![tasks[0].id]);
    }

    #[test]
    fn high_priority_overdue_selects_exactly_the_matches_for_any_sort() {
        let mut tasks = Vec::new();
        for n in 0..28_i64 {
            let priority = if n % 2 == 0 { Priority::Low } else { Priority::Medium };
            tasks.push(task(&format!("routine {n}"), priority, TODAY + Duration::days(n - 14)));
        }
        tasks.push(task("late spray", Priority::High, TODAY - Duration::days(3)));
        tasks.push(task("late repair", Priority::High, TODAY - Duration::days(1)));
        tasks.push(task("future audit", Priority::High, TODAY + Duration::days(2)));
        let expected = [tasks[28].id, tasks[29].id];

        let criteria = FilterCriteria {
            priority: Selection::Only(Priority::High),
            due: DueBucket::Overdue,
            ..FilterCriteria::default()
        };
        for key in [SortKey::Date, SortKey::Amount, SortKey::Name, SortKey::Priority, SortKey::Category] {
            for order in [SortOrder::Asc, SortOrder::Desc] {
                let out = view(&tasks, &criteria, SortSpec::new(key, order), TODAY);
                let mut got = ids(&out);
                got.sort();
                let mut want = expected.to_vec();
                want.sort();
                assert_eq!(got, want, "sort {key:?} {order:?}");
            }
        }
    }

    #[test]
    fn dropping_a_criterion_never_shrinks_the_view() {
        let tasks = sample();
        let strict = FilterCriteria {
            search: "e".into(),
            priority: Selection::Only(Priority::High),
            due: DueBucket::Overdue,
            category: Selection::Only("pest_control".into()),
            ..FilterCriteria::default()
        };
        let relaxations = [
            FilterCriteria {
                search: String::new(),
                ..strict.clone()
            },
            FilterCriteria {
                priority: Selection::All,
                ..strict.clone()
            },
            FilterCriteria {
                due: DueBucket::All,
                ..strict.clone()
            },
            FilterCriteria {
                category: Selection::All,
                ..strict.clone()
            },
        ];
        let narrow = ids(&view(&tasks, &strict, SortSpec::default(), TODAY));
        for relaxed in &relaxations {
            let wide = ids(&view(&tasks, relaxed, SortSpec::default(), TODAY));
            assert!(narrow.iter().all(|id| wide.contains(id)));
        }
    }

    #[test]
    fn sorting_by_priority_descending_is_stable() {
        let tasks = sample();
        let out = view(
            &tasks,
            &FilterCriteria::default(),
            SortSpec::new(SortKey::Priority, SortOrder::Desc),
            TODAY,
        );
        let titles: Vec<&str> = out.iter().map(|task| task.title.as_str()).collect();
        assert_eq!(titles, vec!["Spray orchard", "Order seed", "Harvest kale", "Weed beds"]);
    }

    #[test]
    fn sorting_by_name_ignores_case() {
        let tasks = vec![
            task("beta", Priority::Low, TODAY),
            task("Alpha", Priority::Low, TODAY),
            task("gamma", Priority::Low, TODAY),
        ];
        let out = view(&tasks, &FilterCriteria::default(), SortSpec::new(SortKey::Name, SortOrder::Asc), TODAY);
        let titles: Vec<&str> = out.iter().map(|task| task.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "beta", "gamma"]);
    }

    #[test]
    fn view_leaves_input_untouched() {
        let tasks = sample();
        let before = tasks.clone();
        let _ = view(&tasks, &FilterCriteria::default(), SortSpec::new(SortKey::Name, SortOrder::Desc), TODAY);
        assert_eq!(tasks, before);
    }

    fn expense(id: u64, amount: f64, category: &str) -> Expense {
        Expense {
            id,
            date: TODAY,
            amount,
            category: category.into(),
            description: format!("purchase {id}"),
        }
    }

    #[test]
    fn expenses_filter_by_amount_and_sort_by_amount() {
        let expenses = vec![
            expense(1, 120.0, "Seeds"),
            expense(2, 15.5, "Fuel"),
            expense(3, 300.0, "Labor"),
        ];
        let criteria = FilterCriteria {
            amount: AmountRange::parse("20", ""),
            ..FilterCriteria::default()
        };
        let out = view(&expenses, &criteria, SortSpec::new(SortKey::Amount, SortOrder::Desc), TODAY);
        let got: Vec<u64> = out.iter().map(|expense| expense.id).collect();
        assert_eq!(got, vec![3, 1]);
    }

    #[test]
    fn malformed_amount_bounds_are_ignored() {
        let range = AmountRange::parse("abc", " ");
        assert!(!range.is_active());
        let expenses = vec![expense(1, 5.0, "Fuel")];
        let criteria = FilterCriteria {
            amount: range,
            ..FilterCriteria::default()
        };
        assert_eq!(view(&expenses, &criteria, SortSpec::default(), TODAY).len(), 1);
        assert_eq!(parse_bound("NaN"), None);
        assert_eq!(parse_bound(" 12.5 "), Some(12.5));
    }

    #[test]
    fn priority_filter_rejects_records_without_priority() {
        let expenses = vec![expense(1, 5.0, "Fuel")];
        let criteria = FilterCriteria {
            priority: Selection::Only(Priority::Low),
            ..FilterCriteria::default()
        };
        assert!(view(&expenses, &criteria, SortSpec::default(), TODAY).is_empty());
    }

    #[test]
    fn date_window_is_inclusive() {
        let tasks = sample();
        let criteria = FilterCriteria {
            window: DateWindow {
                since: Some(date!(2024 - 03 - 08)),
                until: Some(TODAY),
            },
            ..FilterCriteria::default()
        };
        let out = view(&tasks, &criteria, SortSpec::default(), TODAY);
        assert_eq!(ids(&out), vec![tasks[1].id, tasks[2].id]);
    }

    #[test]
    fn tokens_parse_into_pipeline_settings() {
        assert_eq!("this-week".parse::<DueBucket>().ok(), Some(DueBucket::ThisWeek));
        assert_eq!("yield".parse::<SortKey>().ok(), Some(SortKey::Amount));
        assert_eq!("DESC".parse::<SortOrder>().ok(), Some(SortOrder::Desc));
        assert_eq!(SortOrder::Asc.toggled(), SortOrder::Desc);
        assert!("sideways".parse::<SortOrder>().is_err());
    }
}
