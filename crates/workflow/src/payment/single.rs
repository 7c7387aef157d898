use std::sync::Arc;

use async_trait::async_trait;
use domain::{Order, Payment};

use super::{PaymentResult, PaymentStrategy, PaymentType, charge};
use crate::services::PaymentGatewayDirectory;

pub(super) const NON_POSITIVE_AMOUNT: &str = "Payment amount must be greater than zero";

/// Card and payment method checks shared by every card payment.
pub(super) fn card_errors(payment: &Payment, card_required: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if !payment.has_card() {
        errors.push(card_required.to_string());
    }
    if payment.payment_method_id == 0 {
        errors.push("Invalid payment method".to_string());
    }
    errors
}

/// Charges the full amount at once.
#[derive(Debug, Clone)]
pub struct SinglePaymentStrategy {
    gateways: Arc<PaymentGatewayDirectory>,
}

impl SinglePaymentStrategy {
    pub fn new(gateways: Arc<PaymentGatewayDirectory>) -> Self {
        Self { gateways }
    }
}

#[async_trait]
impl PaymentStrategy for SinglePaymentStrategy {
    fn name(&self) -> &'static str {
        "Single payment"
    }

    fn can_handle(&self, payment_type: PaymentType) -> bool {
        payment_type == PaymentType::SinglePayment
    }

    async fn validate(&self, payment: &Payment) -> PaymentResult {
        let mut errors = Vec::new();
        if !payment.amount.is_positive() {
            errors.push(NON_POSITIVE_AMOUNT.to_string());
        }
        errors.extend(card_errors(payment, "Card number is required"));
        if errors.is_empty() {
            PaymentResult::valid(payment.amount)
        } else {
            PaymentResult::invalid(&errors, payment.amount)
        }
    }

    async fn process(&self, _order: &Order, payment: &mut Payment) -> PaymentResult {
        let validation = self.validate(payment).await;
        if !validation.success {
            validation.stamp(payment);
            return validation;
        }

        charge(
            &self.gateways,
            payment,
            "Payment processed successfully".to_string(),
            "Internal error while processing the payment",
        )
        .await
    }
}
