pub mod csv_transfer;
pub mod json_backend;

use std::{fmt, path::PathBuf};

use crate::{
    core::errors::Result,
    ledger::{RecurringRule, Transaction},
};

/// Abstraction over persistence backends holding the transaction list and rule list.
///
/// Each collection is loaded and saved in full; there is no incremental update.
pub trait StorageBackend: Send + Sync {
    fn load_transactions(&self) -> Result<Vec<Transaction>>;
    fn save_transactions(&self, transactions: &[Transaction]) -> Result<()>;
    fn load_rules(&self) -> Result<Vec<RecurringRule>>;
    fn save_rules(&self, rules: &[RecurringRule]) -> Result<()>;

    /// Moves an unreadable collection out of the way so a fresh one can be written.
    /// Returns the location of the preserved copy, if one was made.
    fn quarantine(&self, _source: StorageSource) -> Result<Option<PathBuf>> {
        Ok(None)
    }

    /// Human readable location of a collection, used in log lines and warnings.
    fn describe(&self, source: StorageSource) -> String {
        source.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageSource {
    Transactions,
    Rules,
}

impl fmt::Display for StorageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageSource::Transactions => f.write_str("transactions"),
            StorageSource::Rules => f.write_str("recurring rules"),
        }
    }
}

/// Which side of persistence a [`StorageWarning`] comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageAction {
    /// The collection could not be read; the store started empty.
    Load,
    /// A roll-forward pass could not be saved and was undone.
    Save,
}

/// A persistence problem the caller should surface instead of failing outright.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageWarning {
    pub source: StorageSource,
    pub action: StorageAction,
    pub location: String,
    pub message: String,
    pub quarantined: Option<PathBuf>,
}

impl fmt::Display for StorageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            StorageAction::Load => write!(
                f,
                "could not load {} from {}: {}; starting empty",
                self.source, self.location, self.message
            )?,
            StorageAction::Save => write!(
                f,
                "could not save {} to {}: {}; recurring transactions were not generated",
                self.source, self.location, self.message
            )?,
        }
        if let Some(path) = &self.quarantined {
            write!(f, " (unreadable file kept at {})", path.display())?;
        }
        Ok(())
    }
}

/// Result of a load that degrades to an empty collection on failure.
#[derive(Debug)]
pub struct Recovered<T> {
    pub value: T,
    pub warning: Option<StorageWarning>,
}

/// Runs `load` and converts any failure into an empty value plus a warning.
pub fn load_or_recover<T, F>(
    backend: &dyn StorageBackend,
    source: StorageSource,
    load: F,
) -> Recovered<T>
where
    T: Default,
    F: FnOnce(&dyn StorageBackend) -> Result<T>,
{
    match load(backend) {
        Ok(value) => Recovered {
            value,
            warning: None,
        },
        Err(err) => {
            let quarantined = match backend.quarantine(source) {
                Ok(path) => path,
                Err(quarantine_err) => {
                    tracing::error!(
                        %source,
                        error = %quarantine_err,
                        "failed to preserve unreadable file"
                    );
                    None
                }
            };
            let warning = StorageWarning {
                source,
                action: StorageAction::Load,
                location: backend.describe(source),
                message: err.to_string(),
                quarantined,
            };
            tracing::warn!("{}", warning);
            Recovered {
                value: T::default(),
                warning: Some(warning),
            }
        }
    }
}

pub use csv_transfer::{export_csv, parse_csv, write_csv, CsvImport, ImportReport, CSV_HEADERS};
pub use json_backend::JsonStorage;
