use std::sync::Arc;

use async_trait::async_trait;
use domain::{OrderCancelled, OrderCreated, OrderStatus, OrderStatusChanged};
use tracing::info;

use crate::error::WorkflowError;
use crate::notifier::OrderEventSubscriber;
use crate::services::{InventoryService, ReservationItem};

/// Keeps stock reservations in step with the order.
///
/// | Event                         | Inventory call |
/// |-------------------------------|----------------|
/// | OrderCreated                  | reserve        |
/// | status → PaymentApproved      | confirm        |
/// | status → Shipped              | ship           |
/// | status → Canceled, cancelled  | release        |
///
/// A failed payment leaves the stock reserved while the order can still
/// be paid.
pub struct InventoryUpdateSubscriber {
    inventory: Arc<dyn InventoryService>,
}

impl InventoryUpdateSubscriber {
    pub fn new(inventory: Arc<dyn InventoryService>) -> Self {
        Self { inventory }
    }
}

#[async_trait]
impl OrderEventSubscriber for InventoryUpdateSubscriber {
    fn name(&self) -> &'static str {
        "inventory_update"
    }

    async fn on_order_created(&self, event: &OrderCreated) -> Result<(), WorkflowError> {
        let items = event
            .items
            .iter()
            .map(|item| ReservationItem {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
            })
            .collect();

        let result = self.inventory.reserve(event.header.order_id, items).await?;
        info!(
            order_id = %event.header.order_id,
            reservation_id = %result.reservation_id,
            "stock reserved"
        );
        Ok(())
    }

    async fn on_status_changed(&self, event: &OrderStatusChanged) -> Result<(), WorkflowError> {
        let order_id = event.header.order_id;
        match event.new_status {
            OrderStatus::PaymentApproved => self.inventory.confirm(order_id).await,
            OrderStatus::Shipped => self.inventory.ship(order_id).await,
            OrderStatus::Canceled => self.inventory.release(order_id).await,
            _ => Ok(()),
        }
    }

    async fn on_order_cancelled(&self, event: &OrderCancelled) -> Result<(), WorkflowError> {
        self.inventory.release(event.header.order_id).await
    }
}
