use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::core::retry::RetryPolicy;
use crate::currency::Money;
use crate::domain::{Expense, ExpenseStatus, Project};
use crate::errors::Result;
use crate::ledger::validator;
use crate::storage::Repository;

/// Spend against a project (or the office) derived from its expenses.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpenseSummary {
    pub project_id: Option<Uuid>,
    pub total_budget: Option<Money>,
    /// Amounts of approved, partially paid and paid expenses.
    pub committed: Money,
    pub paid: Money,
    pub outstanding: Money,
    pub remaining_budget: Option<Money>,
    pub pending_count: usize,
    pub approved_count: usize,
    pub partially_paid_count: usize,
    pub paid_count: usize,
    pub rejected_count: usize,
}

impl ExpenseSummary {
    pub fn from_expenses<'a>(
        expenses: impl IntoIterator<Item = &'a Expense>,
        total_budget: Option<Money>,
    ) -> Self {
        let mut summary = ExpenseSummary {
            total_budget,
            ..ExpenseSummary::default()
        };
        for expense in expenses {
            match expense.status {
                ExpenseStatus::Pending => summary.pending_count += 1,
                ExpenseStatus::Approved => summary.approved_count += 1,
                ExpenseStatus::PartiallyPaid => summary.partially_paid_count += 1,
                ExpenseStatus::Paid => summary.paid_count += 1,
                ExpenseStatus::Rejected => summary.rejected_count += 1,
            }
            if expense.status.is_committed() {
                summary.committed += expense.amount;
                summary.paid += expense.total_paid;
            }
        }
        summary.outstanding = summary.committed - summary.paid;
        summary.remaining_budget = total_budget.map(|budget| budget - summary.committed);
        summary
    }
}

/// Read-only reporting over stored expenses. Records are loaded the same way
/// [`ExpenseService`](super::ExpenseService) loads them, so a corrupt record
/// fails the summary instead of being counted.
pub struct SummaryService {
    expenses: Arc<dyn Repository<Expense>>,
    projects: Arc<dyn Repository<Project>>,
    retry: RetryPolicy,
}

impl SummaryService {
    pub fn new(
        expenses: Arc<dyn Repository<Expense>>,
        projects: Arc<dyn Repository<Project>>,
    ) -> Self {
        Self {
            expenses,
            projects,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_config(mut self, config: &Config) -> Self {
        self.retry = config.retry;
        self
    }

    pub fn project_summary(&self, project_id: Uuid) -> Result<ExpenseSummary> {
        let project = self
            .retry
            .run("load project", || self.projects.require(project_id))?;
        let expenses = self.load_where(|expense| expense.project_id() == Some(project_id))?;
        let mut summary = ExpenseSummary::from_expenses(&expenses, Some(project.total_budget));
        summary.project_id = Some(project_id);
        Ok(summary)
    }

    pub fn office_summary(&self) -> Result<ExpenseSummary> {
        let expenses = self.load_where(Expense::is_office)?;
        Ok(ExpenseSummary::from_expenses(&expenses, None))
    }

    fn load_where(&self, keep: impl Fn(&Expense) -> bool) -> Result<Vec<Expense>> {
        let expenses: Vec<Expense> = self
            .retry
            .run("list expenses", || self.expenses.list())?
            .into_iter()
            .filter(|expense| keep(expense))
            .collect();
        for expense in &expenses {
            validator::verify_loaded(expense)?;
        }
        Ok(expenses)
    }
}
