//! Stores, the roll-forward engine, and the manager that ties them to storage.

pub mod clock;
pub mod errors;
pub mod finance_manager;
pub mod ledger_store;
pub mod roll_forward;
pub mod rule_store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::{FinanceError, Result};
pub use finance_manager::FinanceManager;
pub use ledger_store::{LedgerStore, ListOrder};
pub use roll_forward::{roll_forward, RollForwardReport, RuleFailure, RuleOutcome};
pub use rule_store::RuleStore;
