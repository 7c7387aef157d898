//! Order lifecycle events.
//!
//! Events are immutable snapshots taken at publication time. They are fanned
//! out to subscribers and never stored by the core.

use chrono::{DateTime, Utc};
use common::{CustomerId, EventId, OrderId, PaymentId, ProductId};
use serde::{Deserialize, Serialize};

use super::{Money, Order, OrderItem, OrderStatus, Payment, PaymentStatus};

/// Trait for events that subscribers can route and audit.
pub trait DomainEvent {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the fields shared by every event kind.
    fn header(&self) -> &EventHeader;
}

/// Fields shared by every order event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHeader {
    /// Unique event identifier.
    pub event_id: EventId,

    pub order_id: OrderId,

    pub customer_id: Option<CustomerId>,

    /// Order total at the time the event was raised.
    pub amount: Money,

    pub occurred_at: DateTime<Utc>,
}

impl EventHeader {
    /// Snapshots the identifying fields of an order.
    pub fn for_order(order: &Order) -> Self {
        Self {
            event_id: EventId::new(),
            order_id: order.id(),
            customer_id: order.customer_id(),
            amount: order.total_amount(),
            occurred_at: Utc::now(),
        }
    }
}

/// Line item as it looked when the order was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemSnapshot {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
}

impl From<&OrderItem> for OrderItemSnapshot {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id.clone(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price(),
        }
    }
}

/// Order passed validation and was persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    #[serde(flatten)]
    pub header: EventHeader,
    pub items: Vec<OrderItemSnapshot>,
}

impl OrderCreated {
    pub fn new(order: &Order) -> Self {
        Self {
            header: EventHeader::for_order(order),
            items: order.items().iter().map(OrderItemSnapshot::from).collect(),
        }
    }
}

/// Order moved between two statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChanged {
    #[serde(flatten)]
    pub header: EventHeader,
    pub previous_status: OrderStatus,
    pub new_status: OrderStatus,
    pub reason: Option<String>,
}

impl OrderStatusChanged {
    pub fn new(order: &Order, previous_status: OrderStatus, reason: Option<String>) -> Self {
        Self {
            header: EventHeader::for_order(order),
            previous_status,
            new_status: order.status(),
            reason,
        }
    }
}

/// A payment attempt finished, successfully or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProcessed {
    #[serde(flatten)]
    pub header: EventHeader,
    pub payment_id: PaymentId,
    pub payment_amount: Money,
    pub success: bool,
    pub payment_status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub message: Option<String>,
    pub installment_count: u32,
}

impl PaymentProcessed {
    pub fn new(order: &Order, payment: &Payment, success: bool, message: Option<String>) -> Self {
        Self {
            header: EventHeader::for_order(order),
            payment_id: payment.id,
            payment_amount: payment.amount,
            success,
            payment_status: payment.status,
            transaction_id: payment.transaction_id.clone(),
            message,
            installment_count: payment.installment_count,
        }
    }
}

/// Order was canceled. Carries the refund owed for approved payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    #[serde(flatten)]
    pub header: EventHeader,
    pub reason: String,
    pub refund_required: bool,
    pub refund_amount: Money,
}

impl OrderCancelled {
    pub fn new(order: &Order, reason: impl Into<String>) -> Self {
        let refund_amount = order.approved_payments_total();
        Self {
            header: EventHeader::for_order(order),
            reason: reason.into(),
            refund_required: refund_amount.is_positive(),
            refund_amount,
        }
    }
}

/// Any of the four order events, for sinks that handle them uniformly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    OrderCreated(OrderCreated),
    OrderStatusChanged(OrderStatusChanged),
    PaymentProcessed(PaymentProcessed),
    OrderCancelled(OrderCancelled),
}

macro_rules! impl_domain_event {
    ($($ty:ident),*) => {
        $(
            impl DomainEvent for $ty {
                fn event_type(&self) -> &'static str {
                    stringify!($ty)
                }

                fn header(&self) -> &EventHeader {
                    &self.header
                }
            }

            impl From<$ty> for OrderEvent {
                fn from(event: $ty) -> Self {
                    OrderEvent::$ty(event)
                }
            }
        )*
    };
}

impl_domain_event!(OrderCreated, OrderStatusChanged, PaymentProcessed, OrderCancelled);

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(e) => e.event_type(),
            OrderEvent::OrderStatusChanged(e) => e.event_type(),
            OrderEvent::PaymentProcessed(e) => e.event_type(),
            OrderEvent::OrderCancelled(e) => e.event_type(),
        }
    }

    fn header(&self) -> &EventHeader {
        match self {
            OrderEvent::OrderCreated(e) => e.header(),
            OrderEvent::OrderStatusChanged(e) => e.header(),
            OrderEvent::PaymentProcessed(e) => e.header(),
            OrderEvent::OrderCancelled(e) => e.header(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::LifecycleMachine;

    fn order() -> Order {
        Order::new(
            CustomerId::new(),
            vec![
                OrderItem::new("SKU-001", "Widget", 2, Money::from_cents(1000)),
                OrderItem::new("SKU-002", "Gadget", 1, Money::from_cents(2500)),
            ],
        )
    }

    #[test]
    fn test_order_created_snapshots_items() {
        let order = order();
        let event = OrderCreated::new(&order);

        assert_eq!(event.event_type(), "OrderCreated");
        assert_eq!(event.header.order_id, order.id());
        assert_eq!(event.header.amount.cents(), 4500);
        assert_eq!(event.items.len(), 2);
        assert_eq!(event.items[0].total_price.cents(), 2000);
    }

    #[test]
    fn test_event_ids_are_unique() {
        let order = order();
        let a = OrderCreated::new(&order);
        let b = OrderCreated::new(&order);
        assert_ne!(a.header.event_id, b.header.event_id);
    }

    #[test]
    fn test_status_changed_reads_current_status() {
        let mut order = order();
        LifecycleMachine::transition(&mut order, OrderStatus::AwaitingPayment, "finalized")
            .unwrap();

        let event = OrderStatusChanged::new(&order, OrderStatus::Draft, None);
        assert_eq!(event.previous_status, OrderStatus::Draft);
        assert_eq!(event.new_status, OrderStatus::AwaitingPayment);
    }

    #[test]
    fn test_cancelled_without_payments_needs_no_refund() {
        let event = OrderCancelled::new(&order(), "changed my mind");
        assert!(!event.refund_required);
        assert_eq!(event.refund_amount, Money::zero());
    }

    #[test]
    fn test_cancelled_refunds_approved_payments() {
        let mut order = order();
        let mut payment = Payment::new(order.id(), Money::from_cents(4500), 1);
        payment.status = PaymentStatus::Approved;
        order.record_payment(payment);

        let event = OrderCancelled::new(&order, "out of stock");
        assert!(event.refund_required);
        assert_eq!(event.refund_amount.cents(), 4500);
    }

    #[test]
    fn test_event_serialization() {
        let order = order();
        let event: OrderEvent = OrderCancelled::new(&order, "duplicate").into();

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"OrderCancelled\""));

        let deserialized: OrderEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.event_type(), "OrderCancelled");
        assert_eq!(deserialized.header().order_id, order.id());

        if let OrderEvent::OrderCancelled(data) = deserialized {
            assert_eq!(data.reason, "duplicate");
        } else {
            panic!("Expected OrderCancelled event");
        }
    }
}
