//! Persisted records and form inputs for expenses, payments and projects.

pub mod common;
pub mod document;
pub mod expense;
pub mod payment;
pub mod project;

pub use common::{Amounted, Displayable, Identifiable};
pub use document::{Document, DocumentUpload};
pub use expense::{Assignment, Expense, ExpenseStatus, ExpenseType, NewExpense};
pub use payment::{NewPayment, Payment, PaymentMethod};
pub use project::{
    BudgetInputs, Project, ProjectDraft, ProjectStep, SupervisionType, WorkTitle,
};
