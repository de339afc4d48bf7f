use std::sync::Arc;

use crate::{
    core::{errors::Result, roll_forward::RuleOutcome},
    ledger::{NewRecurringRule, RecurringRule},
    storage::{load_or_recover, StorageBackend, StorageSource, StorageWarning},
};

/// Owns recurring rules and their persisted cursors.
pub struct RuleStore {
    rules: Vec<RecurringRule>,
    storage: Arc<dyn StorageBackend>,
}

impl RuleStore {
    pub fn load(storage: Arc<dyn StorageBackend>) -> (Self, Option<StorageWarning>) {
        let recovered =
            load_or_recover(storage.as_ref(), StorageSource::Rules, |backend| backend.load_rules());
        tracing::info!(count = recovered.value.len(), "recurring rules loaded");
        let store = Self {
            rules: recovered.value,
            storage,
        };
        (store, recovered.warning)
    }

    pub fn add(&mut self, draft: NewRecurringRule) -> Result<RecurringRule> {
        let rule = draft.into_rule();
        tracing::info!(
            rule = %rule.id,
            frequency = %rule.frequency,
            start = %rule.start_date,
            "recurring rule added"
        );
        self.rules.push(rule.clone());
        self.persist()?;
        Ok(rule)
    }

    /// Rules ordered by their next due date; rules without a cursor come first.
    pub fn list(&self) -> Vec<&RecurringRule> {
        let mut items: Vec<&RecurringRule> = self.rules.iter().collect();
        items.sort_by_key(|rule| rule.next_due_date);
        items
    }

    pub fn get(&self, id: &str) -> Option<&RecurringRule> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let before = self.rules.len();
        self.rules.retain(|rule| rule.id != id);
        let removed = self.rules.len() != before;
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Mutable access for the roll-forward pass. Callers persist afterwards.
    pub fn rules_mut(&mut self) -> &mut [RecurringRule] {
        &mut self.rules
    }

    /// Puts every cursor back where a pass found it, without writing.
    pub fn rewind(&mut self, outcomes: &[RuleOutcome]) {
        for outcome in outcomes {
            if let Some(rule) = self.rules.iter_mut().find(|rule| rule.id == outcome.rule_id) {
                rule.next_due_date = outcome.cursor_before;
            }
        }
    }

    pub fn persist(&self) -> Result<()> {
        self.storage.save_rules(&self.rules).map_err(|err| {
            tracing::error!(
                location = %self.storage.describe(StorageSource::Rules),
                error = %err,
                "failed to save recurring rules; in-memory cursors are ahead of disk"
            );
            err
        })
    }
}
