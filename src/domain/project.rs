use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::{Money, Percent};
use crate::domain::common::{Displayable, Identifiable};

/// A billable line item on a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkTitle {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub quantity: f64,
    pub unit_price: Money,
}

impl WorkTitle {
    pub fn new(name: impl Into<String>, quantity: f64, unit_price: Money) -> Self {
        Self {
            name: name.into(),
            description: None,
            quantity,
            unit_price,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// `quantity * unit_price`, always derived from its inputs.
    pub fn price(&self) -> Money {
        self.unit_price.scale(self.quantity)
    }

    /// `None` when the price does not fit in a [`Money`].
    pub fn checked_price(&self) -> Option<Money> {
        self.unit_price.checked_scale(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SupervisionType {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "part-time")]
    PartTime,
    #[serde(rename = "full-time")]
    FullTime,
}

impl SupervisionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupervisionType::None => "none",
            SupervisionType::PartTime => "part-time",
            SupervisionType::FullTime => "full-time",
        }
    }
}

impl fmt::Display for SupervisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the budget calculator reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BudgetInputs {
    #[serde(default)]
    pub work_titles: Vec<WorkTitle>,
    /// `None` when the form field is blank or not a number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general_conditions_percentage: Option<Percent>,
    #[serde(default)]
    pub supervision_type: SupervisionType,
    #[serde(default)]
    pub supervision_weeks: u32,
    #[serde(default)]
    pub discount: Money,
}

impl BudgetInputs {
    /// Stores the raw general-conditions field; unparseable text clears it.
    pub fn set_general_conditions_input(&mut self, raw: &str) {
        self.general_conditions_percentage = Percent::parse(raw);
    }
}

/// A project being drafted; nothing here is persisted until creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProjectDraft {
    pub name: String,
    #[serde(flatten)]
    pub inputs: BudgetInputs,
    /// Budget agreed with the client on an upstream proposal, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_budget: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gross_profit_rate: Option<Percent>,
    #[serde(default)]
    pub assigned_pms: Vec<Uuid>,
}

impl ProjectDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_work_title(&mut self, title: WorkTitle) {
        self.inputs.work_titles.push(title);
    }

    pub fn remove_work_title(&mut self, index: usize) -> Option<WorkTitle> {
        if index < self.inputs.work_titles.len() {
            Some(self.inputs.work_titles.remove(index))
        } else {
            None
        }
    }
}

/// Immutable child record created from a work title when the project is created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectStep {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub quantity: f64,
    pub unit_price: Money,
    pub price: Money,
}

impl From<&WorkTitle> for ProjectStep {
    fn from(title: &WorkTitle) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: title.name.clone(),
            description: title.description.clone(),
            quantity: title.quantity,
            unit_price: title.unit_price,
            price: title.price(),
        }
    }
}

/// A created project with its full budget snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub work_titles: Vec<WorkTitle>,
    pub general_conditions_percentage: Percent,
    pub supervision_type: SupervisionType,
    pub supervision_weeks: u32,
    pub discount: Money,
    pub total_budget: Money,
    pub client_budget: Money,
    pub gross_profit_rate: Percent,
    #[serde(default)]
    pub assigned_pms: Vec<Uuid>,
    #[serde(default)]
    pub pm_budgets: BTreeMap<Uuid, Money>,
    #[serde(default)]
    pub steps: Vec<ProjectStep>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn step(&self, id: Uuid) -> Option<&ProjectStep> {
        self.steps.iter().find(|step| step.id == id)
    }
}

impl Identifiable for Project {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for Project {
    fn display_label(&self) -> String {
        format!("project:{} `{}` budget {}", self.id, self.name, self.total_budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_title_price_is_quantity_times_unit_price() {
        let title = WorkTitle::new("Framing", 2.0, Money::from_units(500));
        assert_eq!(title.price(), Money::from_units(1000));
        let fractional = WorkTitle::new("Tile", 12.5, Money::new(3_99));
        assert_eq!(fractional.price().cents(), 4_988);
    }

    #[test]
    fn blank_general_conditions_input_clears_value() {
        let mut inputs = BudgetInputs::default();
        inputs.set_general_conditions_input("20");
        assert_eq!(
            inputs.general_conditions_percentage,
            Some(Percent::from_f64(20.0))
        );
        inputs.set_general_conditions_input("");
        assert_eq!(inputs.general_conditions_percentage, None);
    }

    #[test]
    fn supervision_type_uses_hyphenated_names() {
        let value = serde_json::to_value(SupervisionType::FullTime).unwrap();
        assert_eq!(value, serde_json::json!("full-time"));
    }

    #[test]
    fn steps_copy_work_title_pricing() {
        let title = WorkTitle::new("Drywall", 3.0, Money::from_units(120)).with_description("L1");
        let step = ProjectStep::from(&title);
        assert_eq!(step.price, Money::from_units(360));
        assert_eq!(step.description.as_deref(), Some("L1"));
    }
}
