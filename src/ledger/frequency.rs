use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::core::errors::{FinanceError, Result};

/// Cadence of a recurring rule.
///
/// Persisted as a plain string. Values other than `Monthly` and `Weekly` are kept
/// verbatim so a single damaged rule never makes the whole rules file unreadable;
/// such rules simply cannot be advanced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Frequency {
    Monthly,
    Weekly,
    Other(String),
}

impl Frequency {
    /// Parses user input, rejecting anything but the supported cadences.
    pub fn parse(value: &str) -> Result<Self> {
        match Frequency::from(value.trim().to_string()) {
            Frequency::Other(other) => Err(FinanceError::validation(format!(
                "unknown frequency `{}` (expected Monthly or Weekly)",
                other
            ))),
            known => Ok(known),
        }
    }

    /// Returns the occurrence following `from`, or `None` when the cadence is
    /// unrecognized or the calendar overflows.
    pub fn advance(&self, from: NaiveDate) -> Option<NaiveDate> {
        match self {
            Frequency::Monthly => shift_month(from, 1),
            Frequency::Weekly => from.checked_add_signed(Duration::weeks(1)),
            Frequency::Other(_) => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Frequency::Monthly => "Monthly",
            Frequency::Weekly => "Weekly",
            Frequency::Other(value) => value.as_str(),
        }
    }
}

impl From<String> for Frequency {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "monthly" => Frequency::Monthly,
            "weekly" => Frequency::Weekly,
            _ => Frequency::Other(value),
        }
    }
}

impl From<Frequency> for String {
    fn from(value: Frequency) -> Self {
        value.label().to_string()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Moves `date` forward by `months`, clamping the day to the end of the target month.
fn shift_month(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    let index = date.month0() + months;
    let year = date.year().checked_add((index / 12) as i32)?;
    let month = index % 12 + 1;
    let day = date.day().min(days_in_month(year, month)?);
    NaiveDate::from_ymd_opt(year, month, day)
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    let first_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
    first_next.pred_opt().map(|last| last.day())
}
