//! Status transitions for a single expense record.
//!
//! `pending -> approved | rejected`, then payments move an approved expense
//! through `partially_paid` to `paid`. Callers never write `status` directly;
//! [`refresh`] re-derives it after every change.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::currency::Money;
use crate::domain::{Expense, ExpenseStatus, NewExpense};
use crate::errors::{LedgerError, Result};
use crate::ledger::validator::{derive_status, sum_payments, validate_new_expense};

/// Validates the form and builds a pending expense with an empty ledger.
pub fn create(input: NewExpense, now: DateTime<Utc>) -> Result<Expense> {
    let assignment = validate_new_expense(&input)?;
    let mut expense = Expense {
        id: Uuid::new_v4(),
        expense_type: input.expense_type,
        amount: input.amount,
        description: input.description.trim().to_string(),
        category: input.category,
        invoice_number: input.invoice_number,
        assignment,
        vendor_id: input.vendor_id,
        subcontractor_id: input.subcontractor_id,
        material_request_id: input.material_request_id,
        status: ExpenseStatus::Pending,
        total_paid: Money::ZERO,
        payments: Vec::new(),
        documents: Vec::new(),
        created_by: input.created_by,
        created_at: now,
        updated_at: now,
        approved_by: None,
        approved_at: None,
        rejected_by: None,
        rejected_reason: None,
        rejected_at: None,
    };
    refresh(&mut expense);
    Ok(expense)
}

pub fn approve(expense: &mut Expense, approver: Uuid, now: DateTime<Utc>) -> Result<()> {
    ensure_pending(expense, "approve")?;
    expense.approved_by = Some(approver);
    expense.approved_at = Some(now);
    expense.touch(now);
    refresh(expense);
    info!(expense = %expense.id, %approver, "expense approved");
    Ok(())
}

pub fn reject(
    expense: &mut Expense,
    approver: Uuid,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    ensure_pending(expense, "reject")?;
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(LedgerError::validation("a rejection reason is required"));
    }
    expense.rejected_by = Some(approver);
    expense.rejected_reason = Some(reason.to_string());
    expense.rejected_at = Some(now);
    expense.touch(now);
    refresh(expense);
    info!(expense = %expense.id, %approver, reason, "expense rejected");
    Ok(())
}

/// Recomputes the cached `total_paid` and `status` from the record's data.
pub fn refresh(expense: &mut Expense) {
    expense.total_paid = sum_payments(expense);
    expense.status = derive_status(expense);
}

/// Deletion policy: an expense that has recorded payments is kept unless the
/// caller explicitly allows it.
pub fn ensure_deletable(expense: &Expense, allow_with_payments: bool) -> Result<()> {
    if !expense.payments.is_empty() && !allow_with_payments {
        return Err(LedgerError::InvalidTransition {
            action: "delete",
            from: expense.status,
        });
    }
    Ok(())
}

fn ensure_pending(expense: &Expense, action: &'static str) -> Result<()> {
    let status = derive_status(expense);
    if status == ExpenseStatus::Pending {
        Ok(())
    } else {
        Err(LedgerError::InvalidTransition {
            action,
            from: status,
        })
    }
}
