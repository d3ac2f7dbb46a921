use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::currency::{Money, Percent};
use crate::domain::{BudgetInputs, SupervisionType};
use crate::errors::{LedgerError, Result};

pub const DEFAULT_GENERAL_CONDITIONS_PERCENTAGE: Percent = Percent::from_basis_points(1_850);

/// Weekly supervision rates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SupervisionRates {
    pub full_time_weekly: Money,
    pub part_time_weekly: Money,
}

impl Default for SupervisionRates {
    fn default() -> Self {
        Self {
            full_time_weekly: Money::from_units(1450),
            part_time_weekly: Money::from_units(725),
        }
    }
}

impl SupervisionRates {
    pub fn weekly_rate(&self, supervision: SupervisionType) -> Money {
        match supervision {
            SupervisionType::None => Money::ZERO,
            SupervisionType::PartTime => self.part_time_weekly,
            SupervisionType::FullTime => self.full_time_weekly,
        }
    }
}

/// Every intermediate figure of a budget derivation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BudgetBreakdown {
    pub work_titles_total: Money,
    pub supervision_fee: Money,
    pub general_conditions_percentage: Percent,
    pub general_conditions: Money,
    pub discount: Money,
    pub total_budget: Money,
}

impl BudgetBreakdown {
    /// A discount larger than the subtotal drives the budget below zero; it is kept as-is.
    pub fn is_negative(&self) -> bool {
        self.total_budget.is_negative()
    }

    pub fn subtotal(&self) -> Money {
        self.work_titles_total + self.supervision_fee
    }
}

/// Derives a project's internal total budget from its draft inputs.
///
/// Pure and deterministic: the same inputs always yield the same breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetCalculator {
    rates: SupervisionRates,
    default_general_conditions: Percent,
}

impl Default for BudgetCalculator {
    fn default() -> Self {
        Self::new(SupervisionRates::default(), DEFAULT_GENERAL_CONDITIONS_PERCENTAGE)
    }
}

impl BudgetCalculator {
    pub fn new(rates: SupervisionRates, default_general_conditions: Percent) -> Self {
        Self {
            rates,
            default_general_conditions,
        }
    }

    pub fn rates(&self) -> &SupervisionRates {
        &self.rates
    }

    pub fn supervision_fee(&self, supervision: SupervisionType, weeks: u32) -> Result<Money> {
        if supervision == SupervisionType::None || weeks == 0 {
            return Ok(Money::ZERO);
        }
        self.rates
            .weekly_rate(supervision)
            .checked_mul(i64::from(weeks))
            .ok_or_else(|| overflow("supervision fee"))
    }

    /// Fails with a validation error when any intermediate figure leaves the
    /// range of [`Money`].
    pub fn calculate(&self, inputs: &BudgetInputs) -> Result<BudgetBreakdown> {
        let mut work_titles_total = Money::ZERO;
        for title in &inputs.work_titles {
            work_titles_total = title
                .checked_price()
                .and_then(|price| work_titles_total.checked_add(price))
                .ok_or_else(|| overflow("work titles total"))?;
        }
        let supervision_fee =
            self.supervision_fee(inputs.supervision_type, inputs.supervision_weeks)?;
        let gc_pct = inputs
            .general_conditions_percentage
            .unwrap_or(self.default_general_conditions);
        let subtotal = work_titles_total
            .checked_add(supervision_fee)
            .ok_or_else(|| overflow("budget subtotal"))?;
        let general_conditions = subtotal
            .checked_apply_percent(gc_pct)
            .ok_or_else(|| overflow("general conditions"))?;
        let before_discount = subtotal
            .checked_add(general_conditions)
            .ok_or_else(|| overflow("total budget"))?;
        let total_budget = before_discount
            .checked_sub(inputs.discount)
            .ok_or_else(|| overflow("total budget"))?;

        let breakdown = BudgetBreakdown {
            work_titles_total,
            supervision_fee,
            general_conditions_percentage: gc_pct,
            general_conditions,
            discount: inputs.discount,
            total_budget,
        };
        debug!(
            work_titles = inputs.work_titles.len(),
            %work_titles_total,
            %supervision_fee,
            %general_conditions,
            %total_budget,
            "budget derived"
        );
        if breakdown.is_negative() {
            warn!(
                discount = %inputs.discount,
                %before_discount,
                "discount exceeds subtotal; total budget is negative"
            );
        }
        Ok(breakdown)
    }
}

fn overflow(figure: &str) -> LedgerError {
    LedgerError::validation(format!("{figure} is too large to represent"))
}
