use std::sync::Arc;

use async_trait::async_trait;
use domain::Money;

use super::{ProcessingContext, StageKind, StageOutcome, ValidationStage};
use crate::error::WorkflowError;
use crate::services::ProductRepository;

/// Largest tolerated gap between the item price and the catalog price.
const PRICE_TOLERANCE: Money = Money::from_cents(1);

/// Checks every line against the product catalog.
pub struct InventoryStage {
    products: Arc<dyn ProductRepository>,
}

impl InventoryStage {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }
}

#[async_trait]
impl ValidationStage for InventoryStage {
    fn kind(&self) -> StageKind {
        StageKind::Inventory
    }

    async fn check(&self, ctx: &mut ProcessingContext<'_>) -> Result<StageOutcome, WorkflowError> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for item in ctx.order.items() {
            let Some(product) = self.products.get_by_id(&item.product_id).await? else {
                errors.push(format!("Product {} not found", item.product_id));
                continue;
            };

            if !product.active {
                errors.push(format!("Product {} is no longer available", product.name));
                continue;
            }

            if product.stock < item.quantity {
                if product.stock == 0 {
                    errors.push(format!("Product {} is out of stock", product.name));
                } else {
                    errors.push(format!(
                        "Product {}: insufficient stock (available {}, requested {})",
                        product.name, product.stock, item.quantity
                    ));
                }
            } else if product.stock < item.quantity.saturating_mul(2) {
                warnings.push(format!(
                    "Product {}: low stock ({} units)",
                    product.name, product.stock
                ));
            }

            let drift = product.sale_price - item.unit_price;
            if drift > PRICE_TOLERANCE || drift < Money::zero() - PRICE_TOLERANCE {
                warnings.push(format!(
                    "Product {}: price may be outdated (current {}, ordered {})",
                    product.name, product.sale_price, item.unit_price
                ));
            }
        }

        Ok(StageOutcome::from_findings(
            errors,
            warnings,
            "Inventory verified",
            "Inventory check failed",
        ))
    }
}
