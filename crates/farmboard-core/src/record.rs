use time::Date;

use crate::task::Priority;

/// Read-only accessors the filter-sort pipeline needs from a record.
///
/// Criteria that read an accessor returning `None` reject the record while
/// active; inactive criteria never call them.
pub trait ViewRecord {
    /// Date the record is filed under (due date, expense date).
    fn date(&self) -> Option<Date>;

    /// Name used for alphabetical sorting.
    fn name(&self) -> &str;

    /// Fields searched by free-text queries.
    fn search_fields(&self) -> Vec<&str>;

    /// Urgency, when the record has one.
    fn priority(&self) -> Option<Priority> {
        None
    }

    /// Responsible person, when the record has one.
    fn assignee(&self) -> Option<&str> {
        None
    }

    /// Category tag.
    fn category(&self) -> Option<&str> {
        None
    }

    /// Monetary amount or yield.
    fn amount(&self) -> Option<f64> {
        None
    }
}
