use std::sync::Arc;

use async_trait::async_trait;
use domain::{Money, Order, Payment};
use tracing::warn;

use super::single::{NON_POSITIVE_AMOUNT, card_errors};
use super::{PaymentResult, PaymentStrategy, PaymentType, charge};
use crate::services::PaymentGatewayDirectory;

const MIN_INSTALLMENTS: u32 = 2;
const MAX_INSTALLMENTS: u32 = 12;
const MIN_INSTALLMENT_AMOUNT: Money = Money::from_cents(5_000);

/// Interest charged for a plan, in basis points, indexed by installment count.
const INTEREST_TABLE_BPS: [(u32, u32); 11] = [
    (2, 200),
    (3, 300),
    (4, 500),
    (5, 700),
    (6, 900),
    (7, 1_100),
    (8, 1_300),
    (9, 1_500),
    (10, 1_700),
    (11, 1_900),
    (12, 2_100),
];

/// Rate for counts missing from the table.
///
/// Validation keeps counts inside the table, so this only applies when a
/// caller computes a plan for an unvalidated count.
const FALLBACK_INTEREST_BPS: u32 = 2_500;

/// Interest rate for a plan of `installments`, in basis points.
pub fn interest_rate_bps(installments: u32) -> u32 {
    INTEREST_TABLE_BPS
        .iter()
        .find(|(count, _)| *count == installments)
        .map(|(_, bps)| *bps)
        .unwrap_or_else(|| {
            warn!(installments, "installment count outside the interest table");
            FALLBACK_INTEREST_BPS
        })
}

/// Total amount of a plan: the principal plus interest for `installments`.
///
/// ```
/// use domain::Money;
/// use workflow::payment::calculate_installment_amount;
///
/// assert_eq!(
///     calculate_installment_amount(Money::from_dollars(500), 3),
///     Money::from_dollars(515)
/// );
/// ```
pub fn calculate_installment_amount(amount: Money, installments: u32) -> Money {
    amount + amount.percent_bps(interest_rate_bps(installments))
}

/// Splits the charge into 2 to 12 installments with interest.
#[derive(Debug, Clone)]
pub struct InstallmentPaymentStrategy {
    gateways: Arc<PaymentGatewayDirectory>,
}

impl InstallmentPaymentStrategy {
    pub fn new(gateways: Arc<PaymentGatewayDirectory>) -> Self {
        Self { gateways }
    }
}

#[async_trait]
impl PaymentStrategy for InstallmentPaymentStrategy {
    fn name(&self) -> &'static str {
        "Installment payment"
    }

    fn can_handle(&self, payment_type: PaymentType) -> bool {
        payment_type == PaymentType::InstallmentPayment
    }

    async fn validate(&self, payment: &Payment) -> PaymentResult {
        let count = payment.installment_count;
        let mut errors = Vec::new();

        if !payment.amount.is_positive() {
            errors.push(NON_POSITIVE_AMOUNT.to_string());
        }
        if !(MIN_INSTALLMENTS..=MAX_INSTALLMENTS).contains(&count) {
            errors.push(format!(
                "Number of installments must be between {MIN_INSTALLMENTS} and {MAX_INSTALLMENTS}"
            ));
        }
        if count > 0 && payment.amount < MIN_INSTALLMENT_AMOUNT.multiply(count) {
            errors.push(format!(
                "Minimum installment amount is {MIN_INSTALLMENT_AMOUNT}"
            ));
        }
        errors.extend(card_errors(
            payment,
            "Card number is required for installment payments",
        ));

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

        let count = payment.installment_count;
        payment.amount = calculate_installment_amount(payment.amount, count);

        charge(
            &self.gateways,
            payment,
            format!("Installment payment in {count}x approved"),
            "Internal error while processing the installment payment",
        )
        .await
    }
}
