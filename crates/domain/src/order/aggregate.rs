//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::discount::DiscountDetail;
use crate::error::OrderError;

use super::{Money, OrderAction, OrderItem, OrderStatus, Payment, PaymentStatus};

/// Registration state of the sale in the accounting system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AccountingStatus {
    #[default]
    Pending,
    Registered,
    Error,
}

/// Answer of the accounting collaborator to a sale registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingResult {
    pub success: bool,
    pub document_number: Option<String>,
    pub accounting_date: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

/// Accounting metadata attached to an order after finalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AccountingRecord {
    pub status: AccountingStatus,
    pub document_number: Option<String>,
    pub accounting_date: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

/// Order aggregate root.
///
/// Represents an order in the system with its full lifecycle from creation
/// to delivery or cancellation. The status field is written only by
/// [`LifecycleMachine`](super::LifecycleMachine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    id: OrderId,

    /// Customer who placed the order.
    customer_id: Option<CustomerId>,

    /// When the order was created.
    created_at: DateTime<Utc>,

    /// Current status of the order.
    status: OrderStatus,

    /// Ordered line items.
    items: Vec<OrderItem>,

    /// Absolute discount subtracted from the gross total.
    discount: Money,

    /// Breakdown of the last discount calculation.
    discount_detail: Option<DiscountDetail>,

    /// Every payment attempt, retries included.
    payments: Vec<Payment>,

    /// Set once the sale was submitted to accounting.
    accounting: Option<AccountingRecord>,
}

impl Order {
    /// Creates a draft order for a customer.
    pub fn new(customer_id: CustomerId, items: Vec<OrderItem>) -> Self {
        Self::draft(Some(customer_id), items)
    }

    /// Creates a draft order whose customer may still be unknown.
    ///
    /// Structural validation rejects orders without a customer, so this is the
    /// entry point for raw client input.
    pub fn draft(customer_id: Option<CustomerId>, items: Vec<OrderItem>) -> Self {
        Self {
            id: OrderId::new(),
            customer_id,
            created_at: Utc::now(),
            status: OrderStatus::Draft,
            items,
            discount: Money::zero(),
            discount_detail: None,
            payments: Vec::new(),
            accounting: None,
        }
    }

    /// Sets a client-supplied discount.
    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }
}

// Query methods
impl Order {
    /// Returns the order ID.
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the customer ID.
    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    /// Returns when the order was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns all items in the order.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Returns an item by product ID.
    pub fn get_item(&self, product_id: &ProductId) -> Option<&OrderItem> {
        self.items.iter().find(|item| &item.product_id == product_id)
    }

    /// Returns the number of line items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the total quantity of all items.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Returns true if the order has items.
    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }

    /// Sum of line totals before any discount.
    pub fn gross_total(&self) -> Money {
        self.items.iter().map(OrderItem::total_price).sum()
    }

    /// Returns the absolute discount.
    pub fn discount(&self) -> Money {
        self.discount
    }

    /// Returns the breakdown of the last discount calculation.
    pub fn discount_detail(&self) -> Option<&DiscountDetail> {
        self.discount_detail.as_ref()
    }

    /// Gross total minus discount, never below zero.
    pub fn total_amount(&self) -> Money {
        (self.gross_total() - self.discount).non_negative()
    }

    /// Returns every payment attempt.
    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    /// Sum of approved payments, i.e. what a cancellation has to refund.
    pub fn approved_payments_total(&self) -> Money {
        self.payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Approved)
            .map(|p| p.amount)
            .sum()
    }

    /// Returns the accounting metadata, if the sale was registered.
    pub fn accounting(&self) -> Option<&AccountingRecord> {
        self.accounting.as_ref()
    }

    /// Returns the actions allowed in the current status.
    pub fn allowed_actions(&self) -> &'static [OrderAction] {
        self.status.allowed_actions()
    }

    /// Returns the statuses reachable from the current one.
    pub fn allowed_next_statuses(&self) -> &'static [OrderStatus] {
        self.status.allowed_next()
    }

    /// Returns true if the order may move to `status` next.
    pub fn can_transition_to(&self, status: OrderStatus) -> bool {
        self.status.allowed_next().contains(&status)
    }

    /// Returns true if the order is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// Mutations
impl Order {
    /// Adds an item to the order.
    ///
    /// If the product is already present, its quantity is increased instead.
    pub fn add_item(&mut self, item: OrderItem) -> Result<(), OrderError> {
        self.ensure_allowed(OrderAction::AddItems)?;

        if item.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                product_id: item.product_id,
                quantity: item.quantity,
            });
        }

        match self
            .items
            .iter_mut()
            .find(|existing| existing.product_id == item.product_id)
        {
            Some(existing) => existing.quantity += item.quantity,
            None => self.items.push(item),
        }
        Ok(())
    }

    /// Removes an item from the order.
    pub fn remove_item(&mut self, product_id: &ProductId) -> Result<OrderItem, OrderError> {
        self.ensure_allowed(OrderAction::RemoveItems)?;

        let position = self
            .items
            .iter()
            .position(|item| &item.product_id == product_id)
            .ok_or_else(|| OrderError::ItemNotFound {
                product_id: product_id.clone(),
            })?;

        Ok(self.items.remove(position))
    }

    /// Stores a discount calculation; the scalar discount takes its final figure.
    pub fn apply_discount(&mut self, detail: DiscountDetail) {
        self.discount = detail.final_discount;
        self.discount_detail = Some(detail);
    }

    /// Appends a payment attempt.
    pub fn record_payment(&mut self, payment: Payment) {
        self.payments.push(payment);
    }

    /// Records the accounting collaborator's answer.
    pub fn record_accounting(&mut self, result: AccountingResult) {
        let record = if result.success {
            AccountingRecord {
                status: AccountingStatus::Registered,
                document_number: result.document_number,
                accounting_date: result.accounting_date,
                message: result.message,
            }
        } else {
            AccountingRecord {
                status: AccountingStatus::Error,
                document_number: None,
                accounting_date: None,
                message: result.message,
            }
        };
        self.accounting = Some(record);
    }

    pub(crate) fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
    }

    fn ensure_allowed(&self, action: OrderAction) -> Result<(), OrderError> {
        if self.status.allows(action) {
            Ok(())
        } else {
            Err(OrderError::ActionNotAllowed {
                status: self.status,
                action,
            })
        }
    }
}
