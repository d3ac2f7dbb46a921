pub mod expense_service;
pub mod project_service;
pub mod summary_service;

pub use expense_service::{CreatedExpense, DocumentFailure, ExpenseService};
pub use project_service::ProjectService;
pub use summary_service::{ExpenseSummary, SummaryService};
