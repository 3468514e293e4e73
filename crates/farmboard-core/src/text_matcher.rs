use crate::record::ViewRecord;

/// Case-insensitive substring matcher for record fields.
#[derive(Debug, Clone)]
pub struct TextMatcher {
    needle: String,
}

impl TextMatcher {
    /// Normalize a query string into a matcher. Returns `None` for blank inputs.
    #[must_use]
    pub fn new(query: &str) -> Option<Self> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            needle: trimmed.to_lowercase(),
        })
    }

    /// Determine whether any searchable field on the record contains the query.
    pub fn matches<R: ViewRecord + ?Sized>(&self, record: &R) -> bool {
        record
            .search_fields()
            .into_iter()
            .any(|field| self.matches_field(field))
    }

    fn matches_field(&self, value: &str) -> bool {
        value.to_lowercase().contains(&self.needle)
    }
}
