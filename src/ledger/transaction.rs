use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::errors::{FinanceError, Result};

/// Calendar format used for every persisted and user-supplied date.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Prefix marking descriptions of transactions generated from recurring rules.
pub const AUTO_PREFIX: &str = "(Auto) ";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::Income => "Income",
            TransactionKind::Expense => "Expense",
        }
    }

    /// Contribution of `amount` to the running balance.
    pub fn signed(&self, amount: f64) -> f64 {
        match self {
            TransactionKind::Income => amount,
            TransactionKind::Expense => -amount,
        }
    }
}

impl FromStr for TransactionKind {
    type Err = FinanceError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(FinanceError::validation(format!(
                "unknown transaction type `{}` (expected Income or Expense)",
                other
            ))),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single ledger entry. Created once and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub amount: f64,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
}

impl Transaction {
    pub fn new(
        amount: f64,
        category: impl Into<String>,
        kind: TransactionKind,
        description: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: new_id(),
            amount,
            category: category.into(),
            kind,
            description: description.into(),
            date,
        }
    }

    pub fn signed_amount(&self) -> f64 {
        self.kind.signed(self.amount)
    }

    pub fn is_generated(&self) -> bool {
        self.description.starts_with(AUTO_PREFIX)
    }
}

/// Validated input for [`crate::core::ledger_store::LedgerStore::add`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub id: Option<String>,
    pub amount: f64,
    pub category: String,
    pub kind: TransactionKind,
    pub description: String,
    pub date: NaiveDate,
}

impl NewTransaction {
    /// Parses raw form fields. The amount must be numeric but its sign is not checked.
    pub fn parse(
        amount: &str,
        category: &str,
        kind: &str,
        description: &str,
        date: &str,
    ) -> Result<Self> {
        let category = category.trim();
        if category.is_empty() {
            return Err(FinanceError::validation("category must not be empty"));
        }
        Ok(Self {
            id: None,
            amount: parse_amount(amount)?,
            category: category.to_string(),
            kind: kind.parse()?,
            description: description.trim().to_string(),
            date: parse_date(date)?,
        })
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.id = if id.trim().is_empty() {
            None
        } else {
            Some(id.trim().to_string())
        };
        self
    }

    pub fn into_transaction(self) -> Transaction {
        Transaction {
            id: self.id.unwrap_or_else(new_id),
            amount: self.amount,
            category: self.category,
            kind: self.kind,
            description: self.description,
            date: self.date,
        }
    }
}

/// Generates an opaque record identifier.
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Parses a decimal amount, accepting either `.` or `,` as the decimal separator.
pub fn parse_amount(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FinanceError::validation("amount must not be empty"));
    }
    let normalized = trimmed.replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(FinanceError::validation(format!(
            "amount `{}` is not a valid number",
            trimmed
        ))),
    }
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| {
        FinanceError::validation(format!(
            "date `{}` is not a valid YYYY-MM-DD calendar date",
            trimmed
        ))
    })
}
