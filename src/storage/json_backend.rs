use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::Config,
    core::errors::{FinanceError, Result},
    ledger::{RecurringRule, Transaction},
};

use super::{StorageBackend, StorageSource};

pub const DEFAULT_TRANSACTIONS_FILE: &str = "transactions.json";
pub const DEFAULT_RULES_FILE: &str = "recurring_payments.json";
const QUARANTINE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TMP_SUFFIX: &str = "tmp";

/// Filesystem-backed JSON persistence: one pretty-printed file per collection.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    root: PathBuf,
    transactions_path: PathBuf,
    rules_path: PathBuf,
}

impl JsonStorage {
    pub fn new(root: PathBuf) -> Result<Self> {
        Self::with_file_names(root, DEFAULT_TRANSACTIONS_FILE, DEFAULT_RULES_FILE)
    }

    pub fn with_file_names(root: PathBuf, transactions: &str, rules: &str) -> Result<Self> {
        fs::create_dir_all(&root)?;
        Ok(Self {
            transactions_path: root.join(transactions),
            rules_path: root.join(rules),
            root,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_file_names(
            config.resolve_data_dir(),
            &config.transactions_file,
            &config.recurring_file,
        )
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn transactions_path(&self) -> &Path {
        &self.transactions_path
    }

    pub fn rules_path(&self) -> &Path {
        &self.rules_path
    }

    fn path_for(&self, source: StorageSource) -> &Path {
        match source {
            StorageSource::Transactions => &self.transactions_path,
            StorageSource::Rules => &self.rules_path,
        }
    }
}

impl StorageBackend for JsonStorage {
    fn load_transactions(&self) -> Result<Vec<Transaction>> {
        load_collection(&self.transactions_path)
    }

    fn save_transactions(&self, transactions: &[Transaction]) -> Result<()> {
        save_collection(&self.transactions_path, transactions)
    }

    fn load_rules(&self) -> Result<Vec<RecurringRule>> {
        load_collection(&self.rules_path)
    }

    fn save_rules(&self, rules: &[RecurringRule]) -> Result<()> {
        save_collection(&self.rules_path, rules)
    }

    fn quarantine(&self, source: StorageSource) -> Result<Option<PathBuf>> {
        let path = self.path_for(source);
        if !path.exists() {
            return Ok(None);
        }
        let timestamp = Utc::now().format(QUARANTINE_TIMESTAMP_FORMAT);
        let mut target = path.as_os_str().to_owned();
        target.push(format!(".corrupt-{}", timestamp));
        let target = PathBuf::from(target);
        fs::copy(path, &target)?;
        Ok(Some(target))
    }

    fn describe(&self, source: StorageSource) -> String {
        self.path_for(source).display().to_string()
    }
}

/// Reads a JSON array from `path`. A missing file is an empty collection.
pub fn load_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|err| {
        FinanceError::Storage(format!("{} is malformed: {}", path.display(), err))
    })
}

/// Writes `items` as a JSON array, staging through a temporary file.
pub fn save_collection<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let json = serde_json::to_string_pretty(items)?;
    let tmp = tmp_path(path);
    write_atomic(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::TempDir;

    use super::*;
    use crate::ledger::{NewRecurringRule, TransactionKind};

    fn storage_with_temp_dir() -> (JsonStorage, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let storage = JsonStorage::new(temp.path().join("data")).expect("json storage");
        (storage, temp)
    }

    #[test]
    fn missing_files_load_as_empty() {
        let (storage, _guard) = storage_with_temp_dir();
        assert!(storage.load_transactions().unwrap().is_empty());
        assert!(storage.load_rules().unwrap().is_empty());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let (storage, _guard) = storage_with_temp_dir();
        let txn = Transaction::new(
            42.5,
            "Food",
            TransactionKind::Expense,
            "groceries",
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        );
        storage.save_transactions(&[txn.clone()]).expect("save");
        let loaded = storage.load_transactions().expect("load");
        assert_eq!(loaded, vec![txn]);
        assert!(!tmp_path(storage.transactions_path()).exists());
    }

    #[test]
    fn rule_dates_are_written_as_plain_text() {
        let (storage, _guard) = storage_with_temp_dir();
        let rule =
            NewRecurringRule::parse("Rent", "800", "Home", "Expense", "2024-01-31", "Monthly")
                .unwrap()
                .into_rule();
        storage.save_rules(&[rule]).expect("save rules");
        let raw = fs::read_to_string(storage.rules_path()).unwrap();
        assert!(raw.contains("\"start_date\": \"2024-01-31\""));
        assert!(raw.contains("\"next_due_date\": \"2024-01-31\""));
    }

    #[test]
    fn malformed_file_is_a_storage_error_and_can_be_quarantined() {
        let (storage, _guard) = storage_with_temp_dir();
        fs::write(storage.rules_path(), "{ not json").unwrap();
        let err = storage.load_rules().unwrap_err();
        assert!(matches!(err, FinanceError::Storage(_)));

        let copy = storage
            .quarantine(StorageSource::Rules)
            .expect("quarantine")
            .expect("copy made");
        assert_eq!(fs::read_to_string(copy).unwrap(), "{ not json");
    }
}
