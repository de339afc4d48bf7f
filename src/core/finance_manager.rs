use std::{fs::File, io::ErrorKind, path::Path, sync::Arc};

use chrono::NaiveDate;

use crate::{
    config::Config,
    core::{
        clock::Clock,
        errors::{FinanceError, Result},
        ledger_store::{LedgerStore, ListOrder},
        roll_forward::{roll_forward, RollForwardReport},
        rule_store::RuleStore,
    },
    ledger::{BudgetBook, BudgetReport, NewRecurringRule, RecurringRule},
    storage::{
        csv_transfer::{self, ImportReport},
        JsonStorage, StorageAction, StorageBackend, StorageSource, StorageWarning,
    },
};

/// Facade that owns both stores, the budget book, and the roll-forward trigger points.
///
/// Opening a manager loads both collections and immediately materializes every
/// occurrence due up to the clock's current date.
pub struct FinanceManager {
    storage: Arc<dyn StorageBackend>,
    ledger: LedgerStore,
    rules: RuleStore,
    budgets: BudgetBook,
    clock: Box<dyn Clock>,
    warnings: Vec<StorageWarning>,
    startup: Option<RollForwardReport>,
    import_error_preview: usize,
}

impl FinanceManager {
    pub fn open(storage: Arc<dyn StorageBackend>, clock: Box<dyn Clock>) -> Self {
        let (ledger, ledger_warning) = LedgerStore::load(storage.clone());
        let (rules, rules_warning) = RuleStore::load(storage.clone());
        let mut manager = Self {
            storage,
            ledger,
            rules,
            budgets: BudgetBook::new(),
            clock,
            warnings: ledger_warning.into_iter().chain(rules_warning).collect(),
            startup: None,
            import_error_preview: Config::default_import_error_preview(),
        };

        let today = manager.clock.today();
        match manager.run_pass(today) {
            Ok(report) => manager.startup = Some(report),
            Err((source, err)) => {
                let warning = StorageWarning {
                    source,
                    action: StorageAction::Save,
                    location: manager.storage.describe(source),
                    message: err.to_string(),
                    quarantined: None,
                };
                tracing::warn!("{}", warning);
                manager.warnings.push(warning);
            }
        }
        manager
    }

    /// Opens the JSON files named by `config`.
    pub fn from_config(config: &Config, clock: Box<dyn Clock>) -> Result<Self> {
        let storage = JsonStorage::from_config(config)?;
        let manager = Self::open(Arc::new(storage), clock);
        Ok(manager.with_import_error_preview(config.import_error_preview))
    }

    pub fn with_import_error_preview(mut self, preview: usize) -> Self {
        self.import_error_preview = preview;
        self
    }

    /// Problems encountered while opening: unreadable stores that started empty, and a
    /// startup pass that could not be saved.
    pub fn warnings(&self) -> &[StorageWarning] {
        &self.warnings
    }

    /// Report of the pass run when the manager was opened, if it was saved.
    pub fn startup_report(&self) -> Option<&RollForwardReport> {
        self.startup.as_ref()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut LedgerStore {
        &mut self.ledger
    }

    pub fn rules(&self) -> &RuleStore {
        &self.rules
    }

    pub fn budgets_mut(&mut self) -> &mut BudgetBook {
        &mut self.budgets
    }

    /// Materializes everything due up to `today`, then persists transactions and cursors.
    ///
    /// Either both writes land or the pass is undone in memory: generated transactions
    /// are dropped and cursors rewound, so a later pass emits each occurrence once.
    pub fn roll_forward(&mut self, today: NaiveDate) -> Result<RollForwardReport> {
        self.run_pass(today).map_err(|(_, err)| err)
    }

    fn run_pass(
        &mut self,
        today: NaiveDate,
    ) -> std::result::Result<RollForwardReport, (StorageSource, FinanceError)> {
        let ledger_len = self.ledger.len();
        let report = roll_forward(self.rules.rules_mut(), today);
        if let Err(err) = self.ledger.extend(report.generated.clone()) {
            self.undo_pass(ledger_len, &report, false);
            return Err((StorageSource::Transactions, err));
        }
        if report.cursors_changed() {
            if let Err(err) = self.rules.persist() {
                self.undo_pass(ledger_len, &report, true);
                return Err((StorageSource::Rules, err));
            }
        }
        Ok(report)
    }

    fn undo_pass(&mut self, ledger_len: usize, report: &RollForwardReport, ledger_saved: bool) {
        self.ledger.truncate(ledger_len);
        self.rules.rewind(&report.outcomes);
        if ledger_saved && self.ledger.persist().is_err() {
            tracing::error!(
                generated = report.generated.len(),
                "generated transactions remain on disk without their advanced cursors"
            );
        }
        tracing::warn!(generated = report.generated.len(), "roll-forward pass undone");
    }

    /// Adds a rule and runs a pass so any backlog since its start date appears at once.
    ///
    /// When the pass cannot be saved the rule stays stored with its cursor on the start
    /// date and the error is returned; a later pass generates the backlog.
    pub fn add_recurring(
        &mut self,
        draft: NewRecurringRule,
    ) -> Result<(RecurringRule, RollForwardReport)> {
        let rule = self.rules.add(draft)?;
        let today = self.clock.today();
        let report = self.roll_forward(today)?;
        let rule = self.rules.get(&rule.id).cloned().unwrap_or(rule);
        Ok((rule, report))
    }

    pub fn remove_recurring(&mut self, id: &str) -> Result<bool> {
        self.rules.remove(id)
    }

    /// Imports a semicolon separated file, appending every valid row in one write.
    pub fn import_csv(&mut self, path: &Path) -> Result<ImportReport> {
        let file = File::open(path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => {
                FinanceError::validation(format!("file {} not found", path.display()))
            }
            _ => FinanceError::from(err),
        })?;
        let parsed = csv_transfer::parse_csv(file)?;
        if parsed.errors.len() > self.import_error_preview {
            for error in &parsed.errors {
                tracing::warn!(file = %path.display(), "{}", error);
            }
        }
        let imported = self.ledger.extend(parsed.transactions)?;
        tracing::info!(
            file = %path.display(),
            imported,
            rejected = parsed.errors.len(),
            "csv import finished"
        );
        Ok(ImportReport {
            imported,
            errors: parsed.errors,
            preview: self.import_error_preview,
        })
    }

    /// Exports the ledger newest first.
    pub fn export_csv(&self, path: &Path) -> Result<usize> {
        let written = csv_transfer::export_csv(path, self.ledger.list(ListOrder::NewestFirst))?;
        tracing::info!(file = %path.display(), written, "csv export finished");
        Ok(written)
    }

    pub fn budget_report(&self) -> BudgetReport {
        self.budgets.report(self.ledger.list(ListOrder::Stored))
    }
}
