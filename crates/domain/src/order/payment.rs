//! Payment attempts recorded against an order.

use chrono::{DateTime, Utc};
use common::{OrderId, PaymentId};
use serde::{Deserialize, Serialize};

use super::Money;

/// Outcome of a single payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Approved,
    Declined,
    Error,
}

impl PaymentStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Approved => "Approved",
            PaymentStatus::Declined => "Declined",
            PaymentStatus::Error => "Error",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One payment attempt. An order keeps every attempt, retries included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    /// Amount charged. Installment plans inflate it by the interest rate.
    pub amount: Money,
    pub payment_method_id: u32,
    /// Opaque card reference handed to the gateway.
    pub card_reference: Option<String>,
    pub installment_count: u32,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub gateway_response: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl Payment {
    /// Creates a pending single-installment payment.
    pub fn new(order_id: OrderId, amount: Money, payment_method_id: u32) -> Self {
        Self {
            id: PaymentId::new(),
            order_id,
            amount,
            payment_method_id,
            card_reference: None,
            installment_count: 1,
            status: PaymentStatus::Pending,
            transaction_id: None,
            gateway_response: None,
            processed_at: None,
            error_message: None,
        }
    }

    /// Sets the card reference.
    pub fn with_card(mut self, card_reference: impl Into<String>) -> Self {
        self.card_reference = Some(card_reference.into());
        self
    }

    /// Sets the number of installments.
    pub fn with_installments(mut self, installment_count: u32) -> Self {
        self.installment_count = installment_count;
        self
    }

    /// Returns true if the gateway approved this attempt.
    pub fn is_approved(&self) -> bool {
        self.status == PaymentStatus::Approved
    }

    /// Returns true if a non-blank card reference is present.
    pub fn has_card(&self) -> bool {
        self.card_reference
            .as_deref()
            .is_some_and(|card| !card.trim().is_empty())
    }
}
