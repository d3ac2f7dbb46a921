//! Append-only payment ledger embedded in an expense.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::domain::{Displayable, Document, Expense, NewPayment, Payment};
use crate::errors::{LedgerError, Result};
use crate::ledger::lifecycle::refresh;
use crate::ledger::validator::{ensure_payable, validate_new_payment};

/// Appends a payment after every check has passed; on error the expense is untouched.
pub fn add_payment(expense: &mut Expense, input: NewPayment, now: DateTime<Utc>) -> Result<Payment> {
    validate_new_payment(&input)?;
    ensure_payable(expense, input.amount)?;

    let payment = Payment::from_input(input, now);
    expense.payments.push(payment.clone());
    expense.touch(now);
    refresh(expense);
    info!(
        expense = %expense.id,
        payment = %payment.display_label(),
        total_paid = %expense.total_paid,
        status = %expense.status,
        "payment recorded"
    );
    Ok(payment)
}

/// Newest `payment_date` first; payments sharing a date keep insertion order.
pub fn list_payments(expense: &Expense) -> Vec<&Payment> {
    let mut payments: Vec<&Payment> = expense.payments.iter().collect();
    payments.sort_by_key(|payment| Reverse(payment.payment_date));
    payments
}

pub fn attach_payment_document(
    expense: &mut Expense,
    payment_id: Uuid,
    document: Document,
    now: DateTime<Utc>,
) -> Result<()> {
    let expense_id = expense.id;
    let payment = expense
        .payment_mut(payment_id)
        .ok_or(LedgerError::NotFound {
            kind: "Payment",
            id: payment_id,
        })?;
    payment.documents.push(document);
    expense.touch(now);
    info!(expense = %expense_id, payment = %payment_id, "payment document attached");
    Ok(())
}

pub fn remove_payment_document(
    expense: &mut Expense,
    payment_id: Uuid,
    document_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Document> {
    let payment = expense
        .payment_mut(payment_id)
        .ok_or(LedgerError::NotFound {
            kind: "Payment",
            id: payment_id,
        })?;
    let position = payment
        .documents
        .iter()
        .position(|doc| doc.id == document_id)
        .ok_or(LedgerError::NotFound {
            kind: "Document",
            id: document_id,
        })?;
    let removed = payment.documents.remove(position);
    expense.touch(now);
    Ok(removed)
}
