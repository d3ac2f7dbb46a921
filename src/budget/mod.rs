//! Project budget derivation: line items and fees into a total, then the total
//! into company profit and PM budgets.

pub mod allocator;
pub mod calculator;

use serde::{Deserialize, Serialize};

use crate::currency::Money;
use crate::domain::ProjectDraft;
use crate::errors::Result;

pub use allocator::{Allocation, ProfitAllocator, DEFAULT_GROSS_PROFIT_RATE};
pub use calculator::{
    BudgetBreakdown, BudgetCalculator, SupervisionRates, DEFAULT_GENERAL_CONDITIONS_PERCENTAGE,
};

/// What a draft form shows after any input changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DraftPreview {
    pub breakdown: BudgetBreakdown,
    /// The proposal's budget when one exists, otherwise the derived total.
    pub client_budget: Money,
    pub allocation: Allocation,
}

/// Recomputes everything derived from a draft. Nothing is cached between calls.
pub fn preview(
    draft: &ProjectDraft,
    calculator: &BudgetCalculator,
    allocator: &ProfitAllocator,
) -> Result<DraftPreview> {
    let breakdown = calculator.calculate(&draft.inputs)?;
    let allocation = allocator.allocate(
        breakdown.total_budget,
        draft.gross_profit_rate,
        &draft.assigned_pms,
    );
    Ok(DraftPreview {
        client_budget: draft.client_budget.unwrap_or(breakdown.total_budget),
        breakdown,
        allocation,
    })
}
