use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{
    frequency::Frequency,
    transaction::{new_id, parse_amount, parse_date, Transaction, TransactionKind, AUTO_PREFIX},
};
use crate::core::errors::{FinanceError, Result};

/// A template that produces one transaction per period, starting at `start_date`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecurringRule {
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    /// Next occurrence not yet materialized. Absent in older rule files.
    #[serde(default)]
    pub next_due_date: Option<NaiveDate>,
}

impl RecurringRule {
    /// Cursor with legacy rules falling back to their start date.
    pub fn cursor(&self) -> NaiveDate {
        self.next_due_date.unwrap_or(self.start_date)
    }

    /// Builds the transaction that materializes the occurrence on `date`.
    pub fn occurrence(&self, date: NaiveDate) -> Transaction {
        Transaction::new(
            self.amount,
            self.category.clone(),
            self.kind,
            format!("{}{}", AUTO_PREFIX, self.description),
            date,
        )
    }
}

/// Validated input for [`crate::core::rule_store::RuleStore::add`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecurringRule {
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub kind: TransactionKind,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
}

impl NewRecurringRule {
    pub fn parse(
        description: &str,
        amount: &str,
        category: &str,
        kind: &str,
        start_date: &str,
        frequency: &str,
    ) -> Result<Self> {
        let description = description.trim();
        let category = category.trim();
        if description.is_empty() || category.is_empty() {
            return Err(FinanceError::validation(
                "description and category are required",
            ));
        }
        let amount = parse_amount(amount)?;
        if amount <= 0.0 {
            return Err(FinanceError::validation("amount must be a positive number"));
        }
        Ok(Self {
            description: description.to_string(),
            amount,
            category: category.to_string(),
            kind: kind.parse()?,
            frequency: Frequency::parse(frequency)?,
            start_date: parse_date(start_date)?,
        })
    }

    pub fn into_rule(self) -> RecurringRule {
        RecurringRule {
            id: new_id(),
            description: self.description,
            amount: self.amount,
            category: self.category,
            kind: self.kind,
            frequency: self.frequency,
            start_date: self.start_date,
            next_due_date: Some(self.start_date),
        }
    }
}
