use std::collections::BTreeMap;

use super::transaction::{Transaction, TransactionKind};
use crate::core::errors::{FinanceError, Result};

/// Spending limits keyed by category name (exact, case-sensitive match).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetBook {
    limits: BTreeMap<String, f64>,
}

impl BudgetBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or replaces the limit for `category`. Previous values are discarded.
    pub fn set(&mut self, category: &str, limit: f64) -> Result<()> {
        let category = category.trim();
        if category.is_empty() {
            return Err(FinanceError::validation("budget category must not be empty"));
        }
        if !limit.is_finite() || limit < 0.0 {
            return Err(FinanceError::validation(
                "budget limit must be a non-negative number",
            ));
        }
        self.limits.insert(category.to_string(), limit);
        Ok(())
    }

    pub fn get(&self, category: &str) -> Option<f64> {
        self.limits.get(category).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.limits.values().sum()
    }

    /// Compares expense spending per category against the configured limits.
    pub fn report<'a, I>(&self, transactions: I) -> BudgetReport
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut spent: BTreeMap<&str, f64> = BTreeMap::new();
        for txn in transactions {
            if txn.kind == TransactionKind::Expense {
                *spent.entry(txn.category.as_str()).or_default() += txn.amount;
            }
        }

        let mut names: Vec<&str> = self.limits.keys().map(String::as_str).collect();
        names.extend(spent.keys().copied());
        names.sort_unstable();
        names.dedup();

        let mut lines = Vec::with_capacity(names.len());
        let mut totals = BudgetTotals {
            budget: self.total(),
            ..BudgetTotals::default()
        };
        for name in names {
            let spent = spent.get(name).copied().unwrap_or(0.0);
            let budget = self.get(name);
            totals.spent_all += spent;
            if budget.is_some() {
                totals.spent_budgeted += spent;
            }
            lines.push(BudgetLine {
                category: name.to_string(),
                budget,
                spent,
            });
        }

        BudgetReport { lines, totals }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetLine {
    pub category: String,
    pub budget: Option<f64>,
    pub spent: f64,
}

impl BudgetLine {
    pub fn remaining(&self) -> Option<f64> {
        self.budget.map(|limit| limit - self.spent)
    }

    pub fn is_over_budget(&self) -> bool {
        self.remaining().map(|left| left < 0.0).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetTotals {
    pub budget: f64,
    pub spent_budgeted: f64,
    pub spent_all: f64,
}

impl BudgetTotals {
    /// Remaining overall budget, present only when any budget is configured.
    pub fn remaining(&self) -> Option<f64> {
        if self.budget > 0.0 {
            Some(self.budget - self.spent_budgeted)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetReport {
    pub lines: Vec<BudgetLine>,
    pub totals: BudgetTotals,
}

impl BudgetReport {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn expense(category: &str, amount: f64) -> Transaction {
        Transaction::new(
            amount,
            category,
            TransactionKind::Expense,
            "",
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        )
    }

    #[test]
    fn set_overwrites_previous_limit() {
        let mut book = BudgetBook::new();
        book.set("Food", 200.0).unwrap();
        book.set("Food", 150.0).unwrap();
        assert_eq!(book.get("Food"), Some(150.0));
        assert_eq!(book.get("food"), None);
    }

    #[test]
    fn negative_limits_are_rejected() {
        let mut book = BudgetBook::new();
        assert!(book.set("Food", -1.0).is_err());
        assert!(book.is_empty());
    }

    #[test]
    fn report_splits_budgeted_and_unbudgeted_spending() {
        let mut book = BudgetBook::new();
        book.set("Food", 100.0).unwrap();
        book.set("Travel", 500.0).unwrap();
        let mut salary = expense("Work", 1000.0);
        salary.kind = TransactionKind::Income;
        let txns = vec![
            expense("Food", 60.0),
            expense("Food", 55.0),
            expense("Games", 20.0),
            salary,
        ];

        let report = book.report(&txns);
        let names: Vec<_> = report.lines.iter().map(|l| l.category.as_str()).collect();
        assert_eq!(names, vec!["Food", "Games", "Travel"]);

        let food = &report.lines[0];
        assert_eq!(food.spent, 115.0);
        assert_eq!(food.remaining(), Some(-15.0));
        assert!(food.is_over_budget());

        let games = &report.lines[1];
        assert_eq!(games.budget, None);
        assert!(!games.is_over_budget());

        assert_eq!(report.totals.budget, 600.0);
        assert_eq!(report.totals.spent_budgeted, 115.0);
        assert_eq!(report.totals.spent_all, 135.0);
        assert_eq!(report.totals.remaining(), Some(485.0));
    }

    #[test]
    fn empty_book_has_no_overall_remaining() {
        let report = BudgetBook::new().report(&[expense("Food", 5.0)]);
        assert_eq!(report.totals.remaining(), None);
        assert_eq!(report.lines.len(), 1);
    }
}
