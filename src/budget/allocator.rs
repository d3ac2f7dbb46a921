use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::currency::{Money, Percent};

pub const DEFAULT_GROSS_PROFIT_RATE: Percent = Percent::from_basis_points(2_850);

/// How a total budget is split between company profit and project managers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Allocation {
    /// The rate actually used, after clamping to 0–100.
    pub gross_profit_rate: Percent,
    pub pm_rate: Percent,
    pub company_profit: Money,
    pub pm_budget_total: Money,
    /// Equal share per assigned PM; `None` when nobody is assigned.
    pub pm_budget_per_pm: Option<Money>,
    pub pm_budgets: BTreeMap<Uuid, Money>,
    /// Cents that cannot be split equally between PMs.
    pub unallocated: Money,
}

/// Splits a derived budget into company profit and per-PM budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfitAllocator {
    default_gross_profit_rate: Percent,
}

impl Default for ProfitAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_GROSS_PROFIT_RATE)
    }
}

impl ProfitAllocator {
    pub fn new(default_gross_profit_rate: Percent) -> Self {
        Self {
            default_gross_profit_rate,
        }
    }

    pub fn default_rate(&self) -> Percent {
        self.default_gross_profit_rate
    }

    pub fn allocate(
        &self,
        total_budget: Money,
        gross_profit_rate: Option<Percent>,
        assigned_pms: &[Uuid],
    ) -> Allocation {
        let gross_profit_rate = gross_profit_rate
            .unwrap_or(self.default_gross_profit_rate)
            .clamp_0_100();
        let pm_rate = gross_profit_rate.complement();
        let pm_budget_total = total_budget.apply_percent(pm_rate);
        // Profit is the remainder so the two parts always add back to the total.
        let company_profit = total_budget - pm_budget_total;

        let mut unique: Vec<Uuid> = Vec::with_capacity(assigned_pms.len());
        for pm in assigned_pms {
            if !unique.contains(pm) {
                unique.push(*pm);
            }
        }

        let (pm_budget_per_pm, pm_budgets, unallocated) = if unique.is_empty() {
            (None, BTreeMap::new(), Money::ZERO)
        } else {
            let (share, leftover) = pm_budget_total.split_even(unique.len());
            let budgets = unique.iter().map(|pm| (*pm, share)).collect();
            (Some(share), budgets, leftover)
        };

        debug!(
            %total_budget,
            %gross_profit_rate,
            %pm_budget_total,
            pms = unique.len(),
            "budget allocated"
        );

        Allocation {
            gross_profit_rate,
            pm_rate,
            company_profit,
            pm_budget_total,
            pm_budget_per_pm,
            pm_budgets,
            unallocated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rate_splits_1185() {
        let allocation = ProfitAllocator::default().allocate(Money::from_units(1185), None, &[]);
        assert_eq!(allocation.pm_rate, Percent::from_f64(71.5));
        assert_eq!(allocation.pm_budget_total.cents(), 84_728);
        assert_eq!(allocation.company_profit.cents(), 33_772);
        assert!(allocation.pm_budgets.is_empty());
        assert_eq!(allocation.pm_budget_per_pm, None);
    }

    #[test]
    fn rate_is_clamped_before_use() {
        let allocator = ProfitAllocator::default();
        let total = Money::from_units(2000);
        let over = allocator.allocate(total, Some(Percent::from_f64(150.0)), &[]);
        assert_eq!(over.gross_profit_rate, Percent::HUNDRED);
        assert_eq!(over.pm_budget_total, Money::ZERO);
        assert_eq!(over.company_profit, total);

        let under = allocator.allocate(total, Some(Percent::from_f64(-10.0)), &[]);
        assert_eq!(under.pm_budget_total, total);
        assert_eq!(under.company_profit, Money::ZERO);
    }

    #[test]
    fn equal_split_between_pms() {
        let pms = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let allocation = ProfitAllocator::default().allocate(
            Money::from_units(1000),
            Some(Percent::from_f64(40.0)),
            &pms,
        );
        assert_eq!(allocation.pm_budget_total, Money::from_units(600));
        assert_eq!(allocation.pm_budget_per_pm, Some(Money::from_units(200)));
        assert_eq!(allocation.pm_budgets.len(), 3);
        assert!(allocation
            .pm_budgets
            .values()
            .all(|amount| *amount == Money::from_units(200)));
        assert_eq!(allocation.unallocated, Money::ZERO);
    }

    #[test]
    fn uneven_split_reports_leftover_and_ignores_duplicates() {
        let pm = Uuid::new_v4();
        let other = Uuid::new_v4();
        let allocation = ProfitAllocator::default().allocate(
            Money::new(1_001),
            Some(Percent::ZERO),
            &[pm, other, pm],
        );
        assert_eq!(allocation.pm_budgets.len(), 2);
        assert_eq!(allocation.pm_budget_per_pm, Some(Money::new(500)));
        assert_eq!(allocation.unallocated, Money::new(1));
    }
}
