//! Pure predicates and derivations over ledger records. Nothing here touches storage.

use crate::currency::Money;
use crate::domain::{
    Amounted, Assignment, BudgetInputs, Expense, ExpenseStatus, ExpenseType, NewExpense, NewPayment,
    PaymentMethod, WorkTitle,
};
use crate::errors::{LedgerError, Result};

/// The single status reducer. Every mutation re-derives status through here.
pub fn derive_status(expense: &Expense) -> ExpenseStatus {
    if expense.rejected_reason.is_some() {
        ExpenseStatus::Rejected
    } else if expense.approved_by.is_none() {
        ExpenseStatus::Pending
    } else if expense.total_paid.is_zero() {
        ExpenseStatus::Approved
    } else if expense.total_paid >= expense.amount {
        ExpenseStatus::Paid
    } else {
        ExpenseStatus::PartiallyPaid
    }
}

pub fn sum_payments(expense: &Expense) -> Money {
    expense.payments.iter().map(Amounted::amount).sum()
}

pub fn remaining_balance(expense: &Expense) -> Money {
    expense.amount - expense.total_paid
}

/// Checks a creation form and resolves its assignment.
pub fn validate_new_expense(input: &NewExpense) -> Result<Assignment> {
    if !input.amount.is_positive() {
        return Err(LedgerError::validation("amount must be greater than zero"));
    }
    if input.description.trim().is_empty() {
        return Err(LedgerError::validation("description is required"));
    }

    let assignment = match (input.is_office, input.project_id) {
        (true, None) => {
            if input.step_id.is_some() {
                return Err(LedgerError::validation(
                    "office expenses cannot reference a project step",
                ));
            }
            Assignment::Office
        }
        (false, Some(project_id)) => Assignment::Project {
            project_id,
            step_id: input.step_id,
        },
        (true, Some(_)) => {
            return Err(LedgerError::validation(
                "expense cannot be assigned to both the office and a project",
            ))
        }
        (false, None) => {
            return Err(LedgerError::validation(
                "expense must be assigned to the office or a project",
            ))
        }
    };

    match input.expense_type {
        ExpenseType::Subcontractor if input.subcontractor_id.is_none() => {
            return Err(LedgerError::validation(
                "subcontractor expenses require a subcontractor",
            ));
        }
        ExpenseType::Material
            if input.vendor_id.is_none() && input.material_request_id.is_none() =>
        {
            return Err(LedgerError::validation(
                "material expenses require a vendor or a material request",
            ));
        }
        _ => {}
    }

    Ok(assignment)
}

pub fn validate_new_payment(input: &NewPayment) -> Result<()> {
    if !input.amount.is_positive() {
        return Err(LedgerError::validation(
            "payment amount must be greater than zero",
        ));
    }
    match &input.method {
        PaymentMethod::Check { check_number } if check_number.trim().is_empty() => Err(
            LedgerError::validation("check payments require a check number"),
        ),
        PaymentMethod::Wire { reference_number } | PaymentMethod::Ach { reference_number }
            if reference_number.trim().is_empty() =>
        {
            Err(LedgerError::validation(format!(
                "{} payments require a reference number",
                input.method
            )))
        }
        _ => Ok(()),
    }
}

/// State gate followed by the overpayment gate.
///
/// A paid expense reaches the overpayment gate with a zero balance, so it
/// reports `Overpayment` rather than an invalid transition.
pub fn ensure_payable(expense: &Expense, amount: Money) -> Result<()> {
    let status = derive_status(expense);
    match status {
        ExpenseStatus::Pending | ExpenseStatus::Rejected => {
            return Err(LedgerError::InvalidTransition {
                action: "pay",
                from: status,
            })
        }
        ExpenseStatus::Approved | ExpenseStatus::PartiallyPaid | ExpenseStatus::Paid => {}
    }
    let remaining = remaining_balance(expense);
    match expense.total_paid.checked_add(amount) {
        Some(next) if next <= expense.amount => Ok(()),
        _ => Err(LedgerError::Overpayment {
            attempted: amount,
            remaining,
        }),
    }
}

/// Upper bound on a single work title's quantity.
pub const MAX_WORK_TITLE_QUANTITY: f64 = 1_000_000.0;
/// Upper bound on a single work title's unit price: 1,000,000,000.00.
pub const MAX_WORK_TITLE_UNIT_PRICE: Money = Money::from_units(1_000_000_000);

pub fn validate_work_titles(titles: &[WorkTitle]) -> Result<()> {
    for (index, title) in titles.iter().enumerate() {
        if title.name.trim().is_empty() {
            return Err(LedgerError::validation(format!(
                "work title #{} needs a name",
                index + 1
            )));
        }
        if !(title.quantity.is_finite() && title.quantity > 0.0) {
            return Err(LedgerError::validation(format!(
                "work title `{}` quantity must be greater than zero",
                title.name
            )));
        }
        if !title.unit_price.is_positive() {
            return Err(LedgerError::validation(format!(
                "work title `{}` unit price must be greater than zero",
                title.name
            )));
        }
        if title.quantity > MAX_WORK_TITLE_QUANTITY {
            return Err(LedgerError::validation(format!(
                "work title `{}` quantity cannot exceed {}",
                title.name, MAX_WORK_TITLE_QUANTITY
            )));
        }
        if title.unit_price > MAX_WORK_TITLE_UNIT_PRICE {
            return Err(LedgerError::validation(format!(
                "work title `{}` unit price cannot exceed {}",
                title.name, MAX_WORK_TITLE_UNIT_PRICE
            )));
        }
    }
    Ok(())
}

pub fn validate_budget_inputs(inputs: &BudgetInputs) -> Result<()> {
    validate_work_titles(&inputs.work_titles)?;
    if inputs.discount.is_negative() {
        return Err(LedgerError::validation("discount cannot be negative"));
    }
    Ok(())
}

/// [`check_invariants`] for a record read back from storage: a violation
/// means the stored data is corrupt.
pub fn verify_loaded(expense: &Expense) -> Result<()> {
    check_invariants(expense).map_err(|err| {
        LedgerError::persistence(format!("stored expense is corrupt: {}", err))
    })
}

/// Verifies amount positivity, the cached total, the overpayment bound and
/// the cached status against the record's own data.
pub fn check_invariants(expense: &Expense) -> Result<()> {
    if !expense.amount.is_positive() {
        return Err(LedgerError::validation(format!(
            "expense {} has a non-positive amount",
            expense.id
        )));
    }
    let paid = sum_payments(expense);
    if paid != expense.total_paid {
        return Err(LedgerError::validation(format!(
            "expense {} caches total_paid {} but payments sum to {}",
            expense.id, expense.total_paid, paid
        )));
    }
    if expense.total_paid > expense.amount {
        return Err(LedgerError::validation(format!(
            "expense {} is overpaid: {} of {}",
            expense.id, expense.total_paid, expense.amount
        )));
    }
    let derived = derive_status(expense);
    if derived != expense.status {
        return Err(LedgerError::validation(format!(
            "expense {} stores status {} but its data implies {}",
            expense.id, expense.status, derived
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::lifecycle;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn office_form(amount: Money) -> NewExpense {
        NewExpense::office(ExpenseType::Office, amount, "Printer toner", Uuid::new_v4())
    }

    fn approved_expense(amount: Money) -> Expense {
        let mut expense = lifecycle::create(office_form(amount), Utc::now()).unwrap();
        lifecycle::approve(&mut expense, Uuid::new_v4(), Utc::now()).unwrap();
        expense
    }

    #[test]
    fn rejects_non_positive_amounts() {
        let err = validate_new_expense(&office_form(Money::ZERO)).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert!(validate_new_expense(&office_form(Money::new(-5))).is_err());
    }

    #[test]
    fn assignment_must_be_exclusive() {
        let mut both = office_form(Money::from_units(10));
        both.project_id = Some(Uuid::new_v4());
        assert!(validate_new_expense(&both).is_err());

        let mut neither = office_form(Money::from_units(10));
        neither.is_office = false;
        assert!(validate_new_expense(&neither).is_err());
    }

    #[test]
    fn type_specific_counterparts_are_required() {
        let project = Uuid::new_v4();
        let creator = Uuid::new_v4();
        let sub = NewExpense::for_project(
            project,
            ExpenseType::Subcontractor,
            Money::from_units(900),
            "Electrical rough-in",
            creator,
        );
        assert!(validate_new_expense(&sub).is_err());
        assert!(validate_new_expense(&sub.with_subcontractor(Uuid::new_v4())).is_ok());

        let material = NewExpense::for_project(
            project,
            ExpenseType::Material,
            Money::from_units(300),
            "Lumber",
            creator,
        );
        assert!(validate_new_expense(&material).is_err());
        assert!(validate_new_expense(&material.clone().with_vendor(Uuid::new_v4())).is_ok());
        assert!(validate_new_expense(&material.with_material_request(Uuid::new_v4())).is_ok());
    }

    #[test]
    fn payment_method_fields_are_required() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let check = NewPayment::new(
            Money::from_units(10),
            date,
            PaymentMethod::Check {
                check_number: "  ".into(),
            },
            Uuid::new_v4(),
        );
        assert!(validate_new_payment(&check).is_err());

        let ach = NewPayment::new(
            Money::from_units(10),
            date,
            PaymentMethod::Ach {
                reference_number: String::new(),
            },
            Uuid::new_v4(),
        );
        let err = validate_new_payment(&ach).unwrap_err();
        assert!(err.to_string().contains("ach"), "unexpected error: {err}");

        let cash = NewPayment::new(Money::ZERO, date, PaymentMethod::Cash, Uuid::new_v4());
        assert!(validate_new_payment(&cash).is_err());
    }

    #[test]
    fn derive_status_follows_payment_totals() {
        let mut expense = approved_expense(Money::from_units(1000));
        assert_eq!(derive_status(&expense), ExpenseStatus::Approved);
        expense.total_paid = Money::from_units(400);
        assert_eq!(derive_status(&expense), ExpenseStatus::PartiallyPaid);
        expense.total_paid = Money::from_units(1000);
        assert_eq!(derive_status(&expense), ExpenseStatus::Paid);
        expense.rejected_reason = Some("duplicate".into());
        assert_eq!(derive_status(&expense), ExpenseStatus::Rejected);
    }

    #[test]
    fn ensure_payable_reports_remaining_balance() {
        let mut expense = approved_expense(Money::from_units(100));
        expense.total_paid = Money::from_units(70);
        expense.status = derive_status(&expense);
        match ensure_payable(&expense, Money::from_units(31)) {
            Err(LedgerError::Overpayment { remaining, .. }) => {
                assert_eq!(remaining, Money::from_units(30))
            }
            other => panic!("expected overpayment, got {other:?}"),
        }
        assert!(ensure_payable(&expense, Money::from_units(30)).is_ok());
    }

    #[test]
    fn check_invariants_catches_stale_cache() {
        let mut expense = approved_expense(Money::from_units(100));
        assert!(check_invariants(&expense).is_ok());
        expense.total_paid = Money::from_units(5);
        assert!(check_invariants(&expense).is_err());
    }

    #[test]
    fn work_titles_need_positive_quantity_and_price() {
        let ok = WorkTitle::new("Demo", 1.0, Money::from_units(50));
        let zero_qty = WorkTitle::new("Demo", 0.0, Money::from_units(50));
        let free = WorkTitle::new("Demo", 1.0, Money::ZERO);
        assert!(validate_work_titles(&[ok.clone()]).is_ok());
        assert!(validate_work_titles(&[ok.clone(), zero_qty]).is_err());
        assert!(validate_work_titles(&[free]).is_err());

        let inputs = BudgetInputs {
            work_titles: vec![ok],
            discount: Money::new(-1),
            ..BudgetInputs::default()
        };
        assert!(validate_budget_inputs(&inputs).is_err());
    }

    #[test]
    fn work_titles_are_capped() {
        let bulk = WorkTitle::new("Bulk", 1e15, Money::from_units(1000));
        assert!(matches!(
            validate_work_titles(&[bulk]),
            Err(LedgerError::Validation(_))
        ));
        let pricey = WorkTitle::new("Tower", 1.0, Money::new(i64::MAX));
        assert!(validate_work_titles(&[pricey]).is_err());
        let at_cap = WorkTitle::new("Max", MAX_WORK_TITLE_QUANTITY, MAX_WORK_TITLE_UNIT_PRICE);
        assert!(validate_work_titles(&[at_cap.clone()]).is_ok());
        assert!(at_cap.checked_price().is_some());
    }
}
