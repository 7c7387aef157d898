//! Lifecycle machine over the order status graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OrderError;

use super::{Order, OrderAction, OrderStatus};

/// A status change that was applied to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub previous: OrderStatus,
    pub new: OrderStatus,
    pub at: DateTime<Utc>,
    pub reason: String,
}

/// Stateless gatekeeper for status changes.
///
/// The transition and action tables are compiled into [`OrderStatus`]; the
/// machine only reads them and the order's current status.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleMachine;

impl LifecycleMachine {
    /// Returns true if `to` is reachable from `from` in one step.
    pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
        from.allowed_next().contains(&to)
    }

    /// Returns the statuses reachable from `status`.
    pub fn allowed_next_statuses(status: OrderStatus) -> &'static [OrderStatus] {
        status.allowed_next()
    }

    /// Returns the actions allowed in `status`.
    pub fn allowed_actions(status: OrderStatus) -> &'static [OrderAction] {
        status.allowed_actions()
    }

    /// Moves the order to `to`, or leaves it untouched if the move is illegal.
    pub fn transition(
        order: &mut Order,
        to: OrderStatus,
        reason: impl Into<String>,
    ) -> Result<StatusTransition, OrderError> {
        let from = order.status();
        if !Self::can_transition(from, to) {
            return Err(OrderError::InvalidTransition { from, to });
        }

        order.set_status(to);
        let transition = StatusTransition {
            previous: from,
            new: to,
            at: Utc::now(),
            reason: reason.into(),
        };
        tracing::debug!(order_id = %order.id(), %from, %to, "order status changed");
        Ok(transition)
    }
}
