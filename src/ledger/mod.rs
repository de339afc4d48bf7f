//! Ledger domain models, persistence-friendly types, and input parsing helpers.

pub mod budget;
pub mod frequency;
pub mod recurring;
pub mod transaction;

pub use budget::{BudgetBook, BudgetLine, BudgetReport, BudgetTotals};
pub use frequency::Frequency;
pub use recurring::{NewRecurringRule, RecurringRule};
pub use transaction::{
    new_id, parse_amount, parse_date, NewTransaction, Transaction, TransactionKind, AUTO_PREFIX,
    DATE_FORMAT,
};
