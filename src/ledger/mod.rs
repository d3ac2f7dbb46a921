//! Expense lifecycle, payment ledger and the pure checks both rely on.

pub mod lifecycle;
pub mod payments;
pub mod validator;

pub use lifecycle::{approve, create, ensure_deletable, refresh, reject};
pub use payments::{add_payment, attach_payment_document, list_payments, remove_payment_document};
pub use validator::{check_invariants, derive_status, remaining_balance};
