//! Inventory service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{OrderId, ProductId};

use super::{read, write};
use crate::error::WorkflowError;

/// Result of a successful inventory reservation.
#[derive(Debug, Clone)]
pub struct ReservationResult {
    /// The reservation ID assigned by the inventory service.
    pub reservation_id: String,
}

/// An item to reserve in inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Where a reservation is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationState {
    /// Stock is held for the order.
    Reserved,
    /// Payment cleared; stock is sold.
    Confirmed,
    /// Stock went back to the shelf.
    Released,
    /// Stock left the warehouse.
    Shipped,
}

impl ReservationState {
    /// Released and shipped reservations are final.
    pub fn can_move_to(self, next: ReservationState) -> bool {
        use ReservationState::*;
        matches!(
            (self, next),
            (Reserved, Confirmed) | (Reserved | Confirmed, Released) | (Confirmed, Shipped)
        )
    }
}

/// Trait for inventory management operations, keyed by order.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Reserves inventory for the given order items.
    async fn reserve(
        &self,
        order_id: OrderId,
        items: Vec<ReservationItem>,
    ) -> Result<ReservationResult, WorkflowError>;

    /// Turns the order's reservation into a sale.
    async fn confirm(&self, order_id: OrderId) -> Result<(), WorkflowError>;

    /// Returns the order's reserved stock.
    async fn release(&self, order_id: OrderId) -> Result<(), WorkflowError>;

    /// Finalizes stock movement after shipment.
    async fn ship(&self, order_id: OrderId) -> Result<(), WorkflowError>;
}

#[derive(Debug)]
struct Reservation {
    id: String,
    items: Vec<ReservationItem>,
    state: ReservationState,
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    reservations: HashMap<OrderId, Reservation>,
    next_id: u32,
    fail_on_reserve: bool,
}

/// In-memory inventory service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryService {
    state: Arc<RwLock<InMemoryInventoryState>>,
}

impl InMemoryInventoryService {
    /// Creates a new in-memory inventory service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail on reserve calls.
    pub fn set_fail_on_reserve(&self, fail: bool) {
        write(&self.state).fail_on_reserve = fail;
    }

    /// Returns the number of reservations ever made.
    pub fn reservation_count(&self) -> usize {
        read(&self.state).reservations.len()
    }

    /// Returns the state of the order's reservation.
    pub fn reservation_state(&self, order_id: OrderId) -> Option<ReservationState> {
        read(&self.state)
            .reservations
            .get(&order_id)
            .map(|r| r.state)
    }

    /// Returns the quantity reserved for the order.
    pub fn reserved_quantity(&self, order_id: OrderId) -> u32 {
        read(&self.state)
            .reservations
            .get(&order_id)
            .map(|r| r.items.iter().map(|i| i.quantity).sum())
            .unwrap_or(0)
    }

    fn move_to(&self, order_id: OrderId, next: ReservationState) -> Result<(), WorkflowError> {
        let mut state = write(&self.state);
        let reservation = state.reservations.get_mut(&order_id).ok_or_else(|| {
            WorkflowError::Internal(format!("No reservation for order {order_id}"))
        })?;
        if !reservation.state.can_move_to(next) {
            return Err(WorkflowError::Internal(format!(
                "Reservation {} cannot move from {:?} to {:?}",
                reservation.id, reservation.state, next
            )));
        }
        tracing::debug!(
            reservation_id = %reservation.id,
            from = ?reservation.state,
            to = ?next,
            "reservation updated"
        );
        reservation.state = next;
        Ok(())
    }
}

#[async_trait]
impl InventoryService for InMemoryInventoryService {
    async fn reserve(
        &self,
        order_id: OrderId,
        items: Vec<ReservationItem>,
    ) -> Result<ReservationResult, WorkflowError> {
        let mut state = write(&self.state);

        if state.fail_on_reserve {
            return Err(WorkflowError::Internal("Insufficient stock".to_string()));
        }

        state.next_id += 1;
        let reservation_id = format!("RES-{:04}", state.next_id);
        state.reservations.insert(
            order_id,
            Reservation {
                id: reservation_id.clone(),
                items,
                state: ReservationState::Reserved,
            },
        );

        Ok(ReservationResult { reservation_id })
    }

    async fn confirm(&self, order_id: OrderId) -> Result<(), WorkflowError> {
        self.move_to(order_id, ReservationState::Confirmed)
    }

    async fn release(&self, order_id: OrderId) -> Result<(), WorkflowError> {
        self.move_to(order_id, ReservationState::Released)
    }

    async fn ship(&self, order_id: OrderId) -> Result<(), WorkflowError> {
        self.move_to(order_id, ReservationState::Shipped)
    }
}
