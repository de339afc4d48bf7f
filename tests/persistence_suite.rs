mod common;

use std::fs;

use common::{data_dir, date, open_at, storage};
use chrono::NaiveDate;
use finance_core::{
    core::{finance_manager::FinanceManager, ledger_store::ListOrder},
    ledger::{NewRecurringRule, NewTransaction},
    storage::{StorageAction, StorageBackend, StorageSource},
};

fn coffee(date: &str) -> NewTransaction {
    NewTransaction::parse("3,20", "Food", "Expense", "coffee", date).expect("valid transaction")
}

fn rent_from_february() -> NewRecurringRule {
    NewRecurringRule::parse("Rent", "900", "Home", "Expense", "2024-02-01", "Monthly")
        .expect("valid rule")
}

fn generated_dates(manager: &FinanceManager) -> Vec<NaiveDate> {
    manager
        .ledger()
        .list(ListOrder::Stored)
        .into_iter()
        .filter(|txn| txn.is_generated())
        .map(|txn| txn.date)
        .collect()
}

#[test]
fn ledger_and_rules_survive_restart() {
    let dir = data_dir();
    let (txn, rule) = {
        let mut manager = open_at(&dir, date(2024, 1, 1));
        let txn = manager.ledger_mut().add(coffee("2024-01-01")).unwrap();
        let draft =
            NewRecurringRule::parse("Rent", "900", "Home", "Expense", "2024-02-01", "Monthly")
                .unwrap();
        let (rule, _) = manager.add_recurring(draft).unwrap();
        (txn, rule)
    };

    let manager = open_at(&dir, date(2024, 1, 1));
    assert!(manager.warnings().is_empty());
    assert_eq!(manager.ledger().get(&txn.id), Some(&txn));
    assert_eq!(manager.rules().get(&rule.id), Some(&rule));
}

#[test]
fn corrupt_transactions_file_is_quarantined() {
    let dir = data_dir();
    let path = dir.join("transactions.json");
    fs::write(&path, "{ not json").unwrap();

    let mut manager = open_at(&dir, date(2024, 1, 1));
    assert!(manager.ledger().is_empty());
    let warnings = manager.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].source, StorageSource::Transactions);
    let kept = warnings[0].quarantined.clone().expect("copy kept");
    assert_eq!(fs::read_to_string(kept).unwrap(), "{ not json");

    manager.ledger_mut().add(coffee("2024-01-02")).unwrap();
    let reopened = open_at(&dir, date(2024, 1, 2));
    assert!(reopened.warnings().is_empty());
    assert_eq!(reopened.ledger().len(), 1);
}

#[test]
fn corrupt_rules_file_leaves_ledger_intact() {
    let dir = data_dir();
    {
        let mut manager = open_at(&dir, date(2024, 1, 1));
        manager.ledger_mut().add(coffee("2024-01-01")).unwrap();
    }
    fs::write(dir.join("recurring_payments.json"), "[{\"id\": 1}]").unwrap();

    let manager = open_at(&dir, date(2024, 1, 1));
    assert_eq!(manager.ledger().len(), 1);
    assert!(manager.rules().is_empty());
    assert_eq!(manager.warnings()[0].source, StorageSource::Rules);
}

#[test]
fn legacy_rule_without_cursor_starts_from_start_date() {
    let dir = data_dir();
    fs::write(
        dir.join("recurring_payments.json"),
        r#"[{
            "id": "legacy",
            "description": "Water",
            "amount": 20.0,
            "category": "Home",
            "type": "Expense",
            "frequency": "Monthly",
            "start_date": "2024-01-05"
        }]"#,
    )
    .unwrap();

    let manager = open_at(&dir, date(2024, 3, 1));
    let startup = manager.startup_report().unwrap();
    assert_eq!(startup.generated.len(), 2);
    let saved = storage(&dir).load_rules().unwrap();
    assert_eq!(saved[0].next_due_date, Some(date(2024, 3, 5)));
}

#[test]
fn failed_write_keeps_previous_file_and_memory_change() {
    let dir = data_dir();
    let mut manager = open_at(&dir, date(2024, 1, 1));
    manager.ledger_mut().add(coffee("2024-01-01")).unwrap();
    let path = dir.join("transactions.json");
    let original = fs::read_to_string(&path).unwrap();

    // A directory at the staging path makes File::create fail.
    fs::create_dir_all(dir.join("transactions.json.tmp")).unwrap();
    let result = manager.ledger_mut().add(coffee("2024-01-02"));
    assert!(result.is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), original);
    assert_eq!(manager.ledger().len(), 2);
}

#[test]
fn stored_json_uses_plain_field_names() {
    let dir = data_dir();
    let mut manager = open_at(&dir, date(2024, 1, 1));
    manager.ledger_mut().add(coffee("2024-01-01")).unwrap();

    let raw = fs::read_to_string(dir.join("transactions.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let entry = &value[0];
    assert_eq!(entry["type"], "Expense");
    assert_eq!(entry["date"], "2024-01-01");
    assert_eq!(entry["amount"], 3.2);
    assert!(entry["id"].as_str().is_some());
}

#[test]
fn unsaved_startup_pass_is_undone_and_not_duplicated_later() {
    let dir = data_dir();
    {
        let mut manager = open_at(&dir, date(2024, 1, 10));
        manager.add_recurring(rent_from_february()).unwrap();
    }

    let blocker = dir.join("transactions.json.tmp");
    fs::create_dir_all(&blocker).unwrap();
    let mut manager = open_at(&dir, date(2024, 2, 15));
    assert!(manager.startup_report().is_none());
    let warnings = manager.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].action, StorageAction::Save);
    assert_eq!(warnings[0].source, StorageSource::Transactions);
    assert!(manager.ledger().is_empty());
    assert_eq!(manager.rules().list()[0].next_due_date, Some(date(2024, 2, 1)));

    // A later unrelated write must not carry the undone occurrences to disk.
    fs::remove_dir(&blocker).unwrap();
    manager.ledger_mut().add(coffee("2024-02-15")).unwrap();
    drop(manager);

    let reopened = open_at(&dir, date(2024, 2, 15));
    assert!(reopened.warnings().is_empty());
    assert_eq!(generated_dates(&reopened), vec![date(2024, 2, 1)]);
    assert_eq!(reopened.ledger().len(), 2);
    assert_eq!(reopened.rules().list()[0].next_due_date, Some(date(2024, 3, 1)));
}

#[test]
fn unsaved_cursors_roll_back_the_written_transactions() {
    let dir = data_dir();
    {
        let mut manager = open_at(&dir, date(2024, 1, 10));
        manager.add_recurring(rent_from_february()).unwrap();
    }

    let blocker = dir.join("recurring_payments.json.tmp");
    fs::create_dir_all(&blocker).unwrap();
    let manager = open_at(&dir, date(2024, 2, 15));
    assert_eq!(manager.warnings()[0].source, StorageSource::Rules);
    assert!(manager.ledger().is_empty());
    assert!(storage(&dir).load_transactions().unwrap().is_empty());
    drop(manager);

    fs::remove_dir(&blocker).unwrap();
    let reopened = open_at(&dir, date(2024, 2, 15));
    assert_eq!(generated_dates(&reopened), vec![date(2024, 2, 1)]);
}

#[test]
fn rule_is_kept_when_its_first_pass_cannot_be_saved() {
    let dir = data_dir();
    let mut manager = open_at(&dir, date(2024, 3, 15));
    fs::create_dir_all(dir.join("transactions.json.tmp")).unwrap();

    assert!(manager.add_recurring(rent_from_february()).is_err());
    assert!(manager.ledger().is_empty());
    let saved = storage(&dir).load_rules().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].next_due_date, Some(date(2024, 2, 1)));
    assert_eq!(manager.rules().list()[0].next_due_date, Some(date(2024, 2, 1)));
}
