#![doc(test(attr(deny(warnings))))]

//! Expense Ledger tracks construction expenses from submission through
//! approval and payment, and derives project budgets from itemized work.

pub mod budget;
pub mod config;
pub mod core;
pub mod currency;
pub mod domain;
pub mod errors;
pub mod ledger;
pub mod storage;
pub mod utils;

pub use errors::{LedgerError, Result};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Expense ledger tracing initialized.");
    });
}
