use async_trait::async_trait;

use super::{ProcessingContext, StageKind, StageOutcome, ValidationStage};
use crate::error::WorkflowError;

/// Checks the order is well-formed without consulting any collaborator.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralStage;

#[async_trait]
impl ValidationStage for StructuralStage {
    fn kind(&self) -> StageKind {
        StageKind::Structural
    }

    async fn check(&self, ctx: &mut ProcessingContext<'_>) -> Result<StageOutcome, WorkflowError> {
        let order = ctx.order;
        let mut errors = Vec::new();

        if order.customer_id().is_none() {
            errors.push("Customer is required".to_string());
        }

        if !order.has_items() {
            errors.push("Order must have at least one item".to_string());
        }

        for item in order.items() {
            if item.quantity == 0 {
                errors.push(format!(
                    "Quantity of item {} must be greater than zero",
                    item.product_id
                ));
            }
            if !item.unit_price.is_positive() {
                errors.push(format!(
                    "Unit price of item {} must be greater than zero",
                    item.product_id
                ));
            }
        }

        if !order.total_amount().is_positive() {
            errors.push("Order total must be greater than zero".to_string());
        }

        if order.discount().is_negative() || order.discount() > order.gross_total() {
            errors.push("Discount must be between zero and the gross item total".to_string());
        }

        Ok(StageOutcome::from_findings(
            errors,
            Vec::new(),
            "Order validated",
            "Order validation failed",
        ))
    }
}
