use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::Money;
use crate::domain::common::{Amounted, Displayable, Identifiable};
use crate::domain::document::Document;

/// How a payment was settled, with the data each method requires.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "payment_method", rename_all = "snake_case")]
pub enum PaymentMethod {
    Check { check_number: String },
    Wire { reference_number: String },
    Ach { reference_number: String },
    CreditCard,
    Cash,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Check { .. } => "check",
            PaymentMethod::Wire { .. } => "wire",
            PaymentMethod::Ach { .. } => "ach",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Other => "other",
        }
    }

    pub fn check_number(&self) -> Option<&str> {
        match self {
            PaymentMethod::Check { check_number } => Some(check_number),
            _ => None,
        }
    }

    pub fn reference_number(&self) -> Option<&str> {
        match self {
            PaymentMethod::Wire { reference_number } | PaymentMethod::Ach { reference_number } => {
                Some(reference_number)
            }
            _ => None,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded payment. Amount and method never change after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payment {
    pub id: Uuid,
    pub amount: Money,
    pub payment_date: NaiveDate,
    #[serde(flatten)]
    pub method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub paid_by: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub documents: Vec<Document>,
}

impl Payment {
    pub fn from_input(input: NewPayment, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount: input.amount,
            payment_date: input.payment_date,
            method: input.method,
            notes: input.notes,
            paid_by: input.paid_by,
            created_at,
            documents: Vec::new(),
        }
    }
}

impl Identifiable for Payment {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Amounted for Payment {
    fn amount(&self) -> Money {
        self.amount
    }
}

impl Displayable for Payment {
    fn display_label(&self) -> String {
        format!("payment:{} {} via {}", self.id, self.amount, self.method)
    }
}

/// Input for [`add_payment`](crate::ledger::payments::add_payment).
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub method: PaymentMethod,
    pub notes: Option<String>,
    pub paid_by: Uuid,
}

impl NewPayment {
    pub fn new(amount: Money, payment_date: NaiveDate, method: PaymentMethod, paid_by: Uuid) -> Self {
        Self {
            amount,
            payment_date,
            method,
            notes: None,
            paid_by,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
