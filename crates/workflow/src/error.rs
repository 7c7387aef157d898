//! Workflow error types.

use common::{CustomerId, OrderId};
use domain::OrderError;
use thiserror::Error;

/// Errors that can occur during workflow operations.
#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    /// The validation chain rejected the order.
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<String>,
    },

    /// The lifecycle machine refused a status change or gated action.
    #[error("Transition rejected: {0}")]
    TransitionRejected(#[from] OrderError),

    /// Payment data was invalid or the gateway declined it.
    #[error("Payment rejected: {0}")]
    PaymentRejected(String),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Customer not found.
    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    /// Persistence collaborator error.
    #[error("Repository error: {0}")]
    Repository(String),

    /// Payment gateway error.
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    /// A subscriber failed while handling an event.
    #[error("Subscriber error: {0}")]
    Subscriber(String),

    /// Accounting collaborator error.
    #[error("Accounting error: {0}")]
    Accounting(String),

    /// Unexpected fault inside a stage, strategy or collaborator.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for workflow results.
pub type Result<T> = std::result::Result<T, WorkflowError>;
