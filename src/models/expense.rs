//! Expense and expense category models
//!
//! Amounts are stored in minor currency units (cents) to avoid floating point
//! rounding, the same way the budgeting models store money.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ExpenseCategoryId, ExpenseId, ProjectId};

/// Grouping for expenses (materials, tools, services, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseCategory {
    pub id: ExpenseCategoryId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ExpenseCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ExpenseCategoryId::new(),
            name: name.into(),
            color: None,
        }
    }
}

/// Money spent on a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub project_id: ProjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<ExpenseCategoryId>,
    /// Amount in minor units
    pub amount_cents: i64,
    pub currency_code: String,
    #[serde(default)]
    pub description: String,
    pub spent_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(project_id: ProjectId, amount_cents: i64, spent_on: NaiveDate) -> Self {
        Self {
            id: ExpenseId::new(),
            project_id,
            category_id: None,
            amount_cents,
            currency_code: "USD".to_string(),
            description: String::new(),
            spent_on,
            created_at: Utc::now(),
        }
    }
}
