#![doc(test(attr(deny(warnings))))]

//! Finance Core keeps a personal income/expense ledger and rolls recurring payment
//! rules forward into concrete transactions.

pub mod cli;
pub mod config;
pub mod core;
pub mod ledger;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing with the default filter and emits a startup info log.
pub fn init() {
    init_with_filter(utils::DEFAULT_LOG_FILTER);
}

/// Like [`init`], with a custom fallback filter directive (overridden by `RUST_LOG`).
pub fn init_with_filter(filter: &str) {
    INIT_TRACING.call_once(|| {
        utils::init_tracing(filter);
        tracing::info!("Finance Core tracing initialized.");
    });
}
