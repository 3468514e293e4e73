//! Expense read model consumed by the expense report.

use serde::{Deserialize, Serialize};
use time::Date;

use crate::record::ViewRecord;

/// A recorded farm expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// Identifier issued by the remote store.
    pub id: u64,
    /// Day the money was spent.
    #[serde(with = "crate::iso_date")]
    pub date: Date,
    /// Amount spent.
    pub amount: f64,
    /// Spending category (seeds, fuel, labor, ...).
    pub category: String,
    /// What the money was spent on.
    pub description: String,
}

impl ViewRecord for Expense {
    fn date(&self) -> Option<Date> {
        Some(self.date)
    }

    fn name(&self) -> &str {
        &self.description
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.description.as_str(), self.category.as_str()]
    }

    fn category(&self) -> Option<&str> {
        Some(&self.category)
    }

    fn amount(&self) -> Option<f64> {
        Some(self.amount)
    }
}
