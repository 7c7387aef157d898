use std::sync::Arc;

use async_trait::async_trait;
use domain::{
    Customer, CustomerId, EventHeader, OrderCancelled, OrderCreated, OrderStatus,
    OrderStatusChanged, PaymentProcessed,
};
use tracing::debug;

use crate::error::WorkflowError;
use crate::notifier::OrderEventSubscriber;
use crate::services::{CustomerRepository, EmailSender};

/// Emails the customer about their order.
pub struct EmailNotificationSubscriber {
    sender: Arc<dyn EmailSender>,
    customers: Arc<dyn CustomerRepository>,
}

impl EmailNotificationSubscriber {
    pub fn new(sender: Arc<dyn EmailSender>, customers: Arc<dyn CustomerRepository>) -> Self {
        Self { sender, customers }
    }

    async fn recipient(&self, header: &EventHeader) -> Result<Option<Customer>, WorkflowError> {
        match header.customer_id {
            Some(id) => self.lookup(id).await.map(Some),
            None => {
                debug!(order_id = %header.order_id, "order has no customer; email skipped");
                Ok(None)
            }
        }
    }

    async fn lookup(&self, id: CustomerId) -> Result<Customer, WorkflowError> {
        self.customers
            .get_by_id(id)
            .await?
            .ok_or(WorkflowError::CustomerNotFound(id))
    }

    async fn send_to(
        &self,
        header: &EventHeader,
        subject: String,
        body: impl FnOnce(&Customer) -> String,
    ) -> Result<(), WorkflowError> {
        let Some(customer) = self.recipient(header).await? else {
            return Ok(());
        };
        self.sender
            .send(&customer.email, &subject, &body(&customer))
            .await
    }
}

fn status_message(status: OrderStatus) -> Option<&'static str> {
    match status {
        OrderStatus::PaymentApproved => Some("Your payment was approved."),
        OrderStatus::Processing => Some("Your order is being prepared."),
        OrderStatus::Shipped => Some("Your order is on its way."),
        OrderStatus::Delivered => Some("Your order was delivered."),
        OrderStatus::Canceled => Some("Your order was canceled."),
        _ => None,
    }
}

#[async_trait]
impl OrderEventSubscriber for EmailNotificationSubscriber {
    fn name(&self) -> &'static str {
        "email_notification"
    }

    async fn on_order_created(&self, event: &OrderCreated) -> Result<(), WorkflowError> {
        let header = &event.header;
        self.send_to(
            header,
            format!("Order {} confirmed", header.order_id),
            |customer| {
                let lines: Vec<String> = event
                    .items
                    .iter()
                    .map(|i| format!("- {} x{} ({})", i.product_name, i.quantity, i.total_price))
                    .collect();
                format!(
                    "Hello {},\n\nWe received your order:\n{}\n\nTotal: {}",
                    customer.name,
                    lines.join("\n"),
                    header.amount
                )
            },
        )
        .await
    }

    async fn on_status_changed(&self, event: &OrderStatusChanged) -> Result<(), WorkflowError> {
        let Some(message) = status_message(event.new_status) else {
            return Ok(());
        };
        let header = &event.header;
        self.send_to(
            header,
            format!("Order {} update: {}", header.order_id, event.new_status),
            |customer| format!("Hello {},\n\n{message}", customer.name),
        )
        .await
    }

    async fn on_payment_processed(&self, event: &PaymentProcessed) -> Result<(), WorkflowError> {
        let header = &event.header;
        let subject = if event.success {
            format!("Payment approved for order {}", header.order_id)
        } else {
            format!("Problem with the payment for order {}", header.order_id)
        };
        self.send_to(header, subject, |customer| {
            if event.success {
                format!(
                    "Hello {},\n\nWe received your payment of {}.",
                    customer.name, event.payment_amount
                )
            } else {
                format!(
                    "Hello {},\n\nWe could not process your payment of {}: {}",
                    customer.name,
                    event.payment_amount,
                    event.message.as_deref().unwrap_or("unknown error")
                )
            }
        })
        .await
    }

    async fn on_order_cancelled(&self, event: &OrderCancelled) -> Result<(), WorkflowError> {
        let header = &event.header;
        self.send_to(
            header,
            format!("Order {} canceled", header.order_id),
            |customer| {
                let mut body = format!(
                    "Hello {},\n\nYour order was canceled: {}",
                    customer.name, event.reason
                );
                if event.refund_required {
                    body.push_str(&format!(
                        "\nA refund of {} is on its way.",
                        event.refund_amount
                    ));
                }
                body
            },
        )
        .await
    }
}
