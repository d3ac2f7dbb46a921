use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::Money;
use crate::domain::common::{Amounted, Displayable, Identifiable};
use crate::domain::document::Document;
use crate::domain::payment::Payment;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseType {
    Subcontractor,
    Material,
    Office,
    Project,
    Other,
}

impl ExpenseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseType::Subcontractor => "subcontractor",
            ExpenseType::Material => "material",
            ExpenseType::Office => "office",
            ExpenseType::Project => "project",
            ExpenseType::Other => "other",
        }
    }
}

impl fmt::Display for ExpenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of an expense. Always derived from the record, see
/// [`derive_status`](crate::ledger::validator::derive_status).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    Pending,
    Approved,
    Rejected,
    PartiallyPaid,
    Paid,
}

impl ExpenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseStatus::Pending => "pending",
            ExpenseStatus::Approved => "approved",
            ExpenseStatus::Rejected => "rejected",
            ExpenseStatus::PartiallyPaid => "partially_paid",
            ExpenseStatus::Paid => "paid",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExpenseStatus::Rejected | ExpenseStatus::Paid)
    }

    /// Statuses in which the expense amount counts against a budget.
    pub fn is_committed(&self) -> bool {
        matches!(
            self,
            ExpenseStatus::Approved | ExpenseStatus::PartiallyPaid | ExpenseStatus::Paid
        )
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an expense is charged: the office, or a project (optionally one of its steps).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "AssignmentRecord", into = "AssignmentRecord")]
pub enum Assignment {
    Office,
    Project {
        project_id: Uuid,
        step_id: Option<Uuid>,
    },
}

impl Assignment {
    pub fn is_office(&self) -> bool {
        matches!(self, Assignment::Office)
    }

    pub fn project_id(&self) -> Option<Uuid> {
        match self {
            Assignment::Office => None,
            Assignment::Project { project_id, .. } => Some(*project_id),
        }
    }

    pub fn step_id(&self) -> Option<Uuid> {
        match self {
            Assignment::Office => None,
            Assignment::Project { step_id, .. } => *step_id,
        }
    }
}

/// Flat persisted form of [`Assignment`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AssignmentRecord {
    #[serde(default)]
    pub is_office: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<Uuid>,
}

impl TryFrom<AssignmentRecord> for Assignment {
    type Error = String;

    fn try_from(record: AssignmentRecord) -> Result<Self, Self::Error> {
        match (record.is_office, record.project_id) {
            (true, None) if record.step_id.is_none() => Ok(Assignment::Office),
            (true, None) => Err("office expense cannot reference a project step".into()),
            (false, Some(project_id)) => Ok(Assignment::Project {
                project_id,
                step_id: record.step_id,
            }),
            (true, Some(_)) => Err("expense cannot be both office and project".into()),
            (false, None) => Err("expense must be assigned to the office or a project".into()),
        }
    }
}

impl From<Assignment> for AssignmentRecord {
    fn from(assignment: Assignment) -> Self {
        match assignment {
            Assignment::Office => AssignmentRecord {
                is_office: true,
                project_id: None,
                step_id: None,
            },
            Assignment::Project {
                project_id,
                step_id,
            } => AssignmentRecord {
                is_office: false,
                project_id: Some(project_id),
                step_id,
            },
        }
    }
}

/// An expense record with its embedded payment ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Expense {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub expense_type: ExpenseType,
    pub amount: Money,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(flatten)]
    pub assignment: Assignment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcontractor_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_request_id: Option<Uuid>,
    pub status: ExpenseStatus,
    pub total_paid: Money,
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub documents: Vec<Document>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
}

impl Expense {
    pub fn is_office(&self) -> bool {
        self.assignment.is_office()
    }

    pub fn project_id(&self) -> Option<Uuid> {
        self.assignment.project_id()
    }

    pub fn payment(&self, id: Uuid) -> Option<&Payment> {
        self.payments.iter().find(|payment| payment.id == id)
    }

    pub fn payment_mut(&mut self, id: Uuid) -> Option<&mut Payment> {
        self.payments.iter_mut().find(|payment| payment.id == id)
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

impl Identifiable for Expense {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Amounted for Expense {
    fn amount(&self) -> Money {
        self.amount
    }
}

impl Displayable for Expense {
    fn display_label(&self) -> String {
        format!(
            "expense:{} {} {} [{}]",
            self.id, self.expense_type, self.amount, self.status
        )
    }
}

/// Unvalidated input for creating an expense, shaped like the submitted form.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub expense_type: ExpenseType,
    pub amount: Money,
    pub description: String,
    pub category: Option<String>,
    pub invoice_number: Option<String>,
    pub is_office: bool,
    pub project_id: Option<Uuid>,
    pub step_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub subcontractor_id: Option<Uuid>,
    pub material_request_id: Option<Uuid>,
    pub created_by: Uuid,
}

impl NewExpense {
    fn blank(
        expense_type: ExpenseType,
        amount: Money,
        description: impl Into<String>,
        created_by: Uuid,
    ) -> Self {
        Self {
            expense_type,
            amount,
            description: description.into(),
            category: None,
            invoice_number: None,
            is_office: false,
            project_id: None,
            step_id: None,
            vendor_id: None,
            subcontractor_id: None,
            material_request_id: None,
            created_by,
        }
    }

    pub fn office(
        expense_type: ExpenseType,
        amount: Money,
        description: impl Into<String>,
        created_by: Uuid,
    ) -> Self {
        Self {
            is_office: true,
            ..Self::blank(expense_type, amount, description, created_by)
        }
    }

    pub fn for_project(
        project_id: Uuid,
        expense_type: ExpenseType,
        amount: Money,
        description: impl Into<String>,
        created_by: Uuid,
    ) -> Self {
        Self {
            project_id: Some(project_id),
            ..Self::blank(expense_type, amount, description, created_by)
        }
    }

    pub fn with_step(mut self, step_id: Uuid) -> Self {
        self.step_id = Some(step_id);
        self
    }

    pub fn with_vendor(mut self, vendor_id: Uuid) -> Self {
        self.vendor_id = Some(vendor_id);
        self
    }

    pub fn with_subcontractor(mut self, subcontractor_id: Uuid) -> Self {
        self.subcontractor_id = Some(subcontractor_id);
        self
    }

    pub fn with_material_request(mut self, material_request_id: Uuid) -> Self {
        self.material_request_id = Some(material_request_id);
        self
    }

    pub fn with_invoice_number(mut self, invoice_number: impl Into<String>) -> Self {
        self.invoice_number = Some(invoice_number.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assignment_persists_as_flat_fields() {
        let project_id = Uuid::new_v4();
        let assignment = Assignment::Project {
            project_id,
            step_id: None,
        };
        let value = serde_json::to_value(assignment).unwrap();
        assert_eq!(value["is_office"], json!(false));
        assert_eq!(value["project_id"], json!(project_id.to_string()));
        assert!(value.get("step_id").is_none());

        let office = serde_json::to_value(Assignment::Office).unwrap();
        assert_eq!(office, json!({ "is_office": true }));
    }

    #[test]
    fn assignment_rejects_ambiguous_records() {
        let both: Result<Assignment, _> = serde_json::from_value(json!({
            "is_office": true,
            "project_id": Uuid::new_v4().to_string(),
        }));
        assert!(both.is_err());

        let neither: Result<Assignment, _> = serde_json::from_value(json!({ "is_office": false }));
        assert!(neither.is_err());
    }

    #[test]
    fn status_serializes_snake_case() {
        let value = serde_json::to_value(ExpenseStatus::PartiallyPaid).unwrap();
        assert_eq!(value, json!("partially_paid"));
        assert!(ExpenseStatus::Paid.is_terminal());
        assert!(!ExpenseStatus::Approved.is_terminal());
    }
}
