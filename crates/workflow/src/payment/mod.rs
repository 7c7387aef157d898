//! Payment strategies and the dispatcher that picks one per payment type.
//!
//! A strategy validates a payment, charges it through the gateway that
//! serves its payment method, and reports the order status the charge
//! should lead to. Strategies never persist anything; the caller records
//! every attempt.

mod installment;
mod single;

pub use installment::{InstallmentPaymentStrategy, calculate_installment_amount, interest_rate_bps};
pub use single::SinglePaymentStrategy;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use domain::{Money, Order, OrderStatus, Payment, PaymentStatus};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::WorkflowError;
use crate::services::PaymentGatewayDirectory;

/// How the customer wants to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentType {
    #[default]
    SinglePayment,
    InstallmentPayment,
    RecurringPayment,
    CorporatePayment,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::SinglePayment => "SinglePayment",
            PaymentType::InstallmentPayment => "InstallmentPayment",
            PaymentType::RecurringPayment => "RecurringPayment",
            PaymentType::CorporatePayment => "CorporatePayment",
        }
    }
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of validating or processing a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentResult {
    pub success: bool,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub message: String,
    pub error_message: Option<String>,
    /// Where the order should move next, if anywhere.
    pub next_status: Option<OrderStatus>,
    /// Amount actually charged or attempted.
    pub amount: Money,
}

impl PaymentResult {
    /// The payment passed validation and may be charged.
    pub fn valid(amount: Money) -> Self {
        Self {
            success: true,
            status: PaymentStatus::Pending,
            transaction_id: None,
            message: "Payment data is valid".to_string(),
            error_message: None,
            next_status: None,
            amount,
        }
    }

    pub fn approved(transaction_id: Option<String>, message: impl Into<String>, amount: Money) -> Self {
        Self {
            success: true,
            status: PaymentStatus::Approved,
            transaction_id,
            message: message.into(),
            error_message: None,
            next_status: Some(OrderStatus::PaymentApproved),
            amount,
        }
    }

    pub fn declined(error_message: impl Into<String>, amount: Money) -> Self {
        Self {
            success: false,
            status: PaymentStatus::Declined,
            transaction_id: None,
            message: "Payment declined".to_string(),
            error_message: Some(error_message.into()),
            next_status: Some(OrderStatus::PaymentError),
            amount,
        }
    }

    /// Validation rejected the payment data. Error messages are joined with `"; "`.
    pub fn invalid(errors: &[String], amount: Money) -> Self {
        Self {
            message: "Payment validation failed".to_string(),
            ..Self::declined(errors.join("; "), amount)
        }
    }

    /// An internal fault prevented the charge.
    pub fn errored(error_message: impl Into<String>, amount: Money) -> Self {
        Self {
            success: false,
            status: PaymentStatus::Error,
            transaction_id: None,
            message: "Payment could not be processed".to_string(),
            error_message: Some(error_message.into()),
            next_status: Some(OrderStatus::PaymentError),
            amount,
        }
    }

    /// Copies the verdict onto the payment record.
    pub(crate) fn stamp(&self, payment: &mut Payment) {
        payment.status = self.status;
        if self.error_message.is_some() {
            payment.error_message = self.error_message.clone();
        }
    }

    /// Converts a failed result into [`WorkflowError::PaymentRejected`].
    ///
    /// For callers that treat anything but an approved payment as an error.
    pub fn into_result(self) -> Result<Self, WorkflowError> {
        if self.success {
            return Ok(self);
        }
        let reason = self
            .error_message
            .clone()
            .unwrap_or_else(|| self.message.clone());
        Err(WorkflowError::PaymentRejected(reason))
    }
}

/// One way of charging a payment.
#[async_trait]
pub trait PaymentStrategy: Send + Sync {
    /// Display name.
    fn name(&self) -> &'static str;

    fn can_handle(&self, payment_type: PaymentType) -> bool;

    /// Checks the payment data without touching the gateway.
    async fn validate(&self, payment: &Payment) -> PaymentResult;

    /// Validates, then charges. The payment is updated in place with the
    /// outcome (status, transaction id, final amount).
    async fn process(&self, order: &Order, payment: &mut Payment) -> PaymentResult;
}

/// Charges `payment` through the gateway registered for its method.
///
/// Gateway faults become an `Error` result carrying `fault_message`; the
/// underlying cause is only logged.
pub(crate) async fn charge(
    gateways: &PaymentGatewayDirectory,
    payment: &mut Payment,
    approved_message: String,
    fault_message: &str,
) -> PaymentResult {
    let response = match gateways.resolve(payment.payment_method_id) {
        Ok(gateway) => gateway.process(payment).await,
        Err(e) => Err(e),
    };

    let result = match response {
        Ok(response) if response.success => {
            payment.transaction_id = response.transaction_id.clone();
            payment.processed_at = Some(Utc::now());
            payment.gateway_response = Some(response.raw_response);
            info!(
                payment_id = %payment.id,
                transaction_id = ?payment.transaction_id,
                amount = %payment.amount,
                "payment approved"
            );
            PaymentResult::approved(response.transaction_id, approved_message, payment.amount)
        }
        Ok(response) => {
            payment.gateway_response = Some(response.raw_response);
            let reason = response
                .error_message
                .unwrap_or_else(|| "Payment declined by the gateway".to_string());
            warn!(payment_id = %payment.id, reason = %reason, "payment declined");
            PaymentResult::declined(reason, payment.amount)
        }
        Err(e) => {
            warn!(payment_id = %payment.id, error = %e, "payment gateway fault");
            PaymentResult::errored(fault_message, payment.amount)
        }
    };

    result.stamp(payment);
    result
}

/// Routes a payment to the first strategy that handles its type.
#[derive(Clone, Default)]
pub struct PaymentDispatcher {
    strategies: Vec<Arc<dyn PaymentStrategy>>,
}

impl PaymentDispatcher {
    /// Creates a dispatcher with no strategies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Single and installment payments over the given gateways.
    pub fn with_defaults(gateways: Arc<PaymentGatewayDirectory>) -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(Arc::new(SinglePaymentStrategy::new(gateways.clone())));
        dispatcher.register(Arc::new(InstallmentPaymentStrategy::new(gateways)));
        dispatcher
    }

    /// Adds a strategy. Earlier registrations win when several match.
    pub fn register(&mut self, strategy: Arc<dyn PaymentStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn strategy_for(&self, payment_type: PaymentType) -> Option<Arc<dyn PaymentStrategy>> {
        self.strategies
            .iter()
            .find(|s| s.can_handle(payment_type))
            .cloned()
    }

    /// Display names of the registered strategies.
    pub fn available_strategies(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Validates a payment with the strategy for `payment_type`.
    pub async fn validate(&self, payment: &Payment, payment_type: PaymentType) -> PaymentResult {
        match self.strategy_for(payment_type) {
            Some(strategy) => strategy.validate(payment).await,
            None => Self::unsupported(payment_type, payment.amount),
        }
    }

    /// Processes a payment with the strategy for `payment_type`.
    ///
    /// A strategy that panics yields an `Error` result; the payment is
    /// marked accordingly.
    #[tracing::instrument(
        skip(self, order, payment),
        fields(order_id = %order.id(), payment_id = %payment.id)
    )]
    pub async fn dispatch(
        &self,
        order: &Order,
        payment: &mut Payment,
        payment_type: PaymentType,
    ) -> PaymentResult {
        let Some(strategy) = self.strategy_for(payment_type) else {
            warn!(%payment_type, "no payment strategy registered");
            let result = Self::unsupported(payment_type, payment.amount);
            result.stamp(payment);
            return result;
        };

        let outcome = AssertUnwindSafe(strategy.process(order, payment))
            .catch_unwind()
            .await;

        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!(strategy = strategy.name(), "payment strategy panicked");
                let result = PaymentResult::errored(
                    "Internal error while processing the payment",
                    payment.amount,
                );
                result.stamp(payment);
                result
            }
        }
    }

    fn unsupported(payment_type: PaymentType, amount: Money) -> PaymentResult {
        PaymentResult::errored(
            format!("Payment type {payment_type} is not supported"),
            amount,
        )
    }
}

impl std::fmt::Debug for PaymentDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentDispatcher")
            .field("strategies", &self.available_strategies())
            .finish()
    }
}
