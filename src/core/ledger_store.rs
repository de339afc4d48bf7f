use std::sync::Arc;

use chrono::NaiveDate;

use crate::{
    core::errors::{FinanceError, Result},
    ledger::{NewTransaction, Transaction},
    storage::{load_or_recover, StorageBackend, StorageSource, StorageWarning},
};

/// Ordering applied by [`LedgerStore::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListOrder {
    /// Insertion order as persisted.
    Stored,
    /// Descending by date; entries sharing a date keep insertion order.
    #[default]
    NewestFirst,
}

/// Owns the transaction list and writes it through on every mutation.
pub struct LedgerStore {
    transactions: Vec<Transaction>,
    storage: Arc<dyn StorageBackend>,
}

impl LedgerStore {
    /// Loads the persisted list, starting empty (with a warning) when it is unreadable.
    pub fn load(storage: Arc<dyn StorageBackend>) -> (Self, Option<StorageWarning>) {
        let recovered = load_or_recover(storage.as_ref(), StorageSource::Transactions, |backend| {
            backend.load_transactions()
        });
        tracing::info!(count = recovered.value.len(), "transactions loaded");
        let store = Self {
            transactions: recovered.value,
            storage,
        };
        (store, recovered.warning)
    }

    pub fn add(&mut self, draft: NewTransaction) -> Result<Transaction> {
        let txn = draft.into_transaction();
        self.transactions.push(txn.clone());
        self.persist()?;
        Ok(txn)
    }

    /// Appends several transactions with a single write.
    pub fn extend(&mut self, transactions: Vec<Transaction>) -> Result<usize> {
        let count = transactions.len();
        if count == 0 {
            return Ok(0);
        }
        self.transactions.extend(transactions);
        self.persist()?;
        Ok(count)
    }

    /// Income minus expenses across every stored transaction.
    pub fn balance(&self) -> f64 {
        self.transactions.iter().map(Transaction::signed_amount).sum()
    }

    pub fn list(&self, order: ListOrder) -> Vec<&Transaction> {
        let mut items: Vec<&Transaction> = self.transactions.iter().collect();
        if order == ListOrder::NewestFirst {
            items.sort_by(|a, b| b.date.cmp(&a.date));
        }
        items
    }

    /// Transactions dated within `start..=end`, newest first.
    pub fn list_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<&Transaction>> {
        if start > end {
            return Err(FinanceError::validation(format!(
                "range start {} is after end {}",
                start, end
            )));
        }
        let mut items: Vec<&Transaction> = self
            .transactions
            .iter()
            .filter(|txn| txn.date >= start && txn.date <= end)
            .collect();
        items.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(items)
    }

    pub fn get(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|txn| txn.id == id)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Deletes every transaction carrying `id`. Returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let before = self.transactions.len();
        self.transactions.retain(|txn| txn.id != id);
        let removed = self.transactions.len() != before;
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    pub fn remove_all(&mut self) -> Result<usize> {
        let removed = self.transactions.len();
        self.transactions.clear();
        self.persist()?;
        Ok(removed)
    }

    /// Drops everything appended after the first `len` transactions, without writing.
    pub fn truncate(&mut self, len: usize) {
        self.transactions.truncate(len);
    }

    pub fn persist(&self) -> Result<()> {
        self.storage
            .save_transactions(&self.transactions)
            .map_err(|err| {
                tracing::error!(
                    location = %self.storage.describe(StorageSource::Transactions),
                    error = %err,
                    "failed to save transactions; in-memory ledger is ahead of disk"
                );
                err
            })
    }
}
