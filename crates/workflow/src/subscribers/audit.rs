use std::sync::Arc;

use async_trait::async_trait;
use domain::{
    DomainEvent, OrderCancelled, OrderCreated, OrderEvent, OrderStatusChanged, PaymentProcessed,
};

use crate::error::WorkflowError;
use crate::notifier::OrderEventSubscriber;
use crate::services::{AuditLog, AuditLogEntry};

const ORDER_ENTITY: &str = "Order";
const PAYMENT_ENTITY: &str = "Payment";

/// Writes one audit entry per event.
pub struct AuditLogSubscriber {
    log: Arc<dyn AuditLog>,
}

impl AuditLogSubscriber {
    pub fn new(log: Arc<dyn AuditLog>) -> Self {
        Self { log }
    }

    async fn record(
        &self,
        entity_type: &str,
        entity_id: String,
        event: OrderEvent,
    ) -> Result<(), WorkflowError> {
        let header = event.header();
        let data = serde_json::to_value(&event)
            .map_err(|e| WorkflowError::Subscriber(format!("Cannot serialize event: {e}")))?;

        self.log
            .append(AuditLogEntry {
                event_type: event.event_type().to_string(),
                entity_type: entity_type.to_string(),
                entity_id,
                event_id: header.event_id,
                occurred_at: header.occurred_at,
                data,
            })
            .await
    }
}

#[async_trait]
impl OrderEventSubscriber for AuditLogSubscriber {
    fn name(&self) -> &'static str {
        "audit_log"
    }

    async fn on_order_created(&self, event: &OrderCreated) -> Result<(), WorkflowError> {
        let id = event.header.order_id.to_string();
        self.record(ORDER_ENTITY, id, event.clone().into()).await
    }

    async fn on_status_changed(&self, event: &OrderStatusChanged) -> Result<(), WorkflowError> {
        let id = event.header.order_id.to_string();
        self.record(ORDER_ENTITY, id, event.clone().into()).await
    }

    async fn on_payment_processed(&self, event: &PaymentProcessed) -> Result<(), WorkflowError> {
        // Declined attempts have no transaction id.
        let id = event
            .transaction_id
            .clone()
            .unwrap_or_else(|| event.payment_id.to_string());
        self.record(PAYMENT_ENTITY, id, event.clone().into()).await
    }

    async fn on_order_cancelled(&self, event: &OrderCancelled) -> Result<(), WorkflowError> {
        let id = event.header.order_id.to_string();
        self.record(ORDER_ENTITY, id, event.clone().into()).await
    }
}
