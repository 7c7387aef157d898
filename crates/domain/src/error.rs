//! Domain error types.

use thiserror::Error;

use crate::order::{OrderAction, OrderStatus};
use common::ProductId;

/// Errors raised by the order aggregate and the lifecycle machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The requested status is not reachable from the current one.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The action is not in the allowed-action set of the current status.
    #[error("Action {action} is not allowed while the order is {status}")]
    ActionNotAllowed {
        status: OrderStatus,
        action: OrderAction,
    },

    /// Invalid quantity.
    #[error("Invalid quantity for {product_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// Item not found in order.
    #[error("Item not found: {product_id}")]
    ItemNotFound { product_id: ProductId },
}
