#![doc(test(attr(deny(warnings))))]

//! Tracker Core keeps every account balance exactly equal to the signed sum
//! of the transactions that reference it, across create/update/delete
//! mutations, fee and tax side-effects, bulk import reconciliation, and
//! balance-history auditing.

pub mod core;
pub mod domain;
pub mod errors;
pub mod ledger;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Tracker Core tracing initialized.");
    });
}
