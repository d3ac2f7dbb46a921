//! Services that apply ledger rules to persisted records, plus the locking
//! and retry primitives they share.

pub mod locks;
pub mod retry;
pub mod services;

pub use locks::KeyedLocks;
pub use retry::RetryPolicy;
pub use services::{ExpenseService, ProjectService, SummaryService};
