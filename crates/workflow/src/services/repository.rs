//! Order and payment persistence.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{Order, OrderId, Payment, PaymentId};

use super::{read, write};
use crate::error::WorkflowError;

/// Order storage.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn add(&self, order: &Order) -> Result<(), WorkflowError>;

    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, WorkflowError>;

    async fn update(&self, order: &Order) -> Result<(), WorkflowError>;
}

/// Append-only store of payment attempts.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn add(&self, payment: &Payment) -> Result<(), WorkflowError>;
}

#[derive(Debug, Default)]
struct OrderState {
    orders: HashMap<OrderId, Order>,
    fail_on_write: bool,
}

/// In-memory order store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderRepository {
    state: Arc<RwLock<OrderState>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `add` and `update` fail.
    pub fn set_fail_on_write(&self, fail: bool) {
        write(&self.state).fail_on_write = fail;
    }

    /// Returns the number of stored orders.
    pub fn order_count(&self) -> usize {
        read(&self.state).orders.len()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn add(&self, order: &Order) -> Result<(), WorkflowError> {
        let mut state = write(&self.state);
        if state.fail_on_write {
            return Err(WorkflowError::Repository("Order store unavailable".to_string()));
        }
        if state.orders.contains_key(&order.id()) {
            return Err(WorkflowError::Repository(format!(
                "Order {} already exists",
                order.id()
            )));
        }
        state.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, WorkflowError> {
        Ok(read(&self.state).orders.get(&id).cloned())
    }

    async fn update(&self, order: &Order) -> Result<(), WorkflowError> {
        let mut state = write(&self.state);
        if state.fail_on_write {
            return Err(WorkflowError::Repository("Order store unavailable".to_string()));
        }
        match state.orders.get_mut(&order.id()) {
            Some(stored) => {
                *stored = order.clone();
                Ok(())
            }
            None => Err(WorkflowError::OrderNotFound(order.id())),
        }
    }
}

#[derive(Debug, Default)]
struct PaymentState {
    payments: Vec<Payment>,
    fail_on_add: bool,
}

/// In-memory payment store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentRepository {
    state: Arc<RwLock<PaymentState>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `add` fail.
    pub fn set_fail_on_add(&self, fail: bool) {
        write(&self.state).fail_on_add = fail;
    }

    /// Returns the number of stored payments.
    pub fn payment_count(&self) -> usize {
        read(&self.state).payments.len()
    }

    /// Returns the payments recorded for an order, oldest first.
    pub fn payments_for(&self, order_id: OrderId) -> Vec<Payment> {
        read(&self.state)
            .payments
            .iter()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect()
    }

    /// Returns a payment by ID.
    pub fn get(&self, id: PaymentId) -> Option<Payment> {
        read(&self.state).payments.iter().find(|p| p.id == id).cloned()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn add(&self, payment: &Payment) -> Result<(), WorkflowError> {
        let mut state = write(&self.state);
        if state.fail_on_add {
            return Err(WorkflowError::Repository("Payment store unavailable".to_string()));
        }
        state.payments.push(payment.clone());
        Ok(())
    }
}
