#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc, sync::Mutex};

use chrono::NaiveDate;
use finance_core::{
    core::{clock::FixedClock, finance_manager::FinanceManager},
    storage::JsonStorage,
};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Returns a fresh data directory that outlives the calling test.
pub fn data_dir() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn storage(dir: &PathBuf) -> Arc<JsonStorage> {
    Arc::new(JsonStorage::new(dir.clone()).expect("create json storage backend"))
}

/// Opens a manager over `dir` whose clock is pinned to `today`.
pub fn open_at(dir: &PathBuf, today: NaiveDate) -> FinanceManager {
    FinanceManager::open(storage(dir), Box::new(FixedClock(today)))
}
