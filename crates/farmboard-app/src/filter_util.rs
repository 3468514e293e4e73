use farmboard_core::date::parse_date;
use farmboard_core::filter::{AmountRange, DateWindow, DueBucket, FilterCriteria, Selection, SortKey, SortSpec};
use farmboard_core::{Priority, TaskType};
use thiserror::Error;
use time::Date;

/// Error type returned while constructing view criteria from user-facing inputs.
#[derive(Debug, Error)]
pub enum FilterBuildError {
    #[error("invalid priority: {token}")]
    InvalidPriority { token: String },
    #[error("invalid due-date bucket: {token}")]
    InvalidDueBucket { token: String },
    #[error("invalid sort key: {token}")]
    InvalidSortKey { token: String },
    #[error("invalid sort order: {token}")]
    InvalidSortOrder { token: String },
    #[error("invalid {field} date: {source}")]
    InvalidDate {
        field: &'static str,
        #[source]
        source: time::error::Parse,
    },
}

/// Result alias for filter construction helpers.
pub type FilterBuildResult<T> = Result<T, FilterBuildError>;

/// Builder that accepts user-facing strings and normalizes them into [`FilterCriteria`].
///
/// Blank inputs and the literal `all` leave a criterion inactive.
#[derive(Debug, Clone, Default)]
pub struct CriteriaBuilder {
    criteria: FilterCriteria,
}

impl CriteriaBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the free-text search.
    #[must_use]
    pub fn with_search(mut self, text: Option<&str>) -> Self {
        self.criteria.search = text.map(str::trim).unwrap_or_default().to_owned();
        self
    }

    /// Configure the priority selector.
    ///
    /// # Errors
    /// Returns an error if the token does not name a priority.
    pub fn with_priority(mut self, token: Option<&str>) -> FilterBuildResult<Self> {
        self.criteria.priority = match active_token(token) {
            None => Selection::All,
            Some(token) => Selection::Only(token.parse::<Priority>().map_err(|_| {
                FilterBuildError::InvalidPriority {
                    token: token.to_owned(),
                }
            })?),
        };
        Ok(self)
    }

    /// Configure the assignee selector.
    #[must_use]
    pub fn with_assignee(mut self, assignee: Option<&str>) -> Self {
        self.criteria.assignee = selection(assignee);
        self
    }

    /// Configure the category selector; task type spellings are normalized.
    #[must_use]
    pub fn with_category(mut self, category: Option<&str>) -> Self {
        self.criteria.category = match active_token(category) {
            None => Selection::All,
            Some(token) => Selection::Only(
                token
                    .parse::<TaskType>()
                    .map_or_else(|_| token.to_owned(), |kind| kind.as_str().to_owned()),
            ),
        };
        self
    }

    /// Configure the relative due-date bucket.
    ///
    /// # Errors
    /// Returns an error if the token does not name a bucket.
    pub fn with_due(mut self, token: Option<&str>) -> FilterBuildResult<Self> {
        self.criteria.due = match token {
            None => DueBucket::All,
            Some(token) => token
                .parse()
                .map_err(|_| FilterBuildError::InvalidDueBucket {
                    token: token.to_owned(),
                })?,
        };
        Ok(self)
    }

    /// Configure numeric bounds. Malformed bounds are ignored.
    #[must_use]
    pub fn with_amount(mut self, min: Option<&str>, max: Option<&str>) -> Self {
        self.criteria.amount = AmountRange::parse(min.unwrap_or_default(), max.unwrap_or_default());
        self
    }

    /// Configure the absolute date window using `YYYY-MM-DD` strings.
    ///
    /// # Errors
    /// Returns an error if either date fails to parse.
    pub fn with_window(mut self, since: Option<&str>, until: Option<&str>) -> FilterBuildResult<Self> {
        self.criteria.window = DateWindow {
            since: parse_optional_date("since", since)?,
            until: parse_optional_date("until", until)?,
        };
        Ok(self)
    }

    /// Finalize into criteria.
    #[must_use]
    pub fn build(self) -> FilterCriteria {
        self.criteria
    }
}

/// Parse a sort key and direction; missing values fall back to date ascending.
///
/// # Errors
/// Returns an error if either token is not recognized.
pub fn parse_sort(key: Option<&str>, order: Option<&str>) -> FilterBuildResult<SortSpec> {
    let mut spec = SortSpec::default();
    if let Some(token) = key {
        spec.key = token.parse::<SortKey>().map_err(|_| FilterBuildError::InvalidSortKey {
            token: token.to_owned(),
        })?;
    }
    if let Some(token) = order {
        spec.order = token.parse().map_err(|_| FilterBuildError::InvalidSortOrder {
            token: token.to_owned(),
        })?;
    }
    Ok(spec)
}

/// Parse an optional `YYYY-MM-DD` input, treating blank strings as absent.
///
/// # Errors
/// Returns an error naming `field` when the input is not a calendar date.
pub fn parse_optional_date(field: &'static str, raw: Option<&str>) -> FilterBuildResult<Option<Date>> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| parse_date(value).map_err(|source| FilterBuildError::InvalidDate { field, source }))
        .transpose()
}

fn active_token(token: Option<&str>) -> Option<&str> {
    token
        .map(str::trim)
        .filter(|token| !token.is_empty() && !token.eq_ignore_ascii_case("all"))
}

fn selection(token: Option<&str>) -> Selection<String> {
    active_token(token).map_or(Selection::All, |value| Selection::Only(value.to_owned()))
}
