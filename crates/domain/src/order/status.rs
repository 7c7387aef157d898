//! Order status graph and per-status action sets.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Draft ──► AwaitingPayment ──► PaymentApproved ──► Processing ──► Shipped ──► Delivered
///                 ▲     │
///                 │     └──► PaymentError
///                 └────────────────┘
///
/// Every non-terminal status except Shipped may also move to Canceled.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order is being assembled; items and discounts can change.
    #[default]
    Draft,

    /// Order was finalized and waits for a payment.
    AwaitingPayment,

    /// The gateway approved a payment.
    PaymentApproved,

    /// The last payment attempt was declined or failed.
    PaymentError,

    /// Order is being prepared for shipment.
    Processing,

    /// Order left the warehouse.
    Shipped,

    /// Order reached the customer (terminal state).
    Delivered,

    /// Order was canceled (terminal state).
    Canceled,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Draft,
        OrderStatus::AwaitingPayment,
        OrderStatus::PaymentApproved,
        OrderStatus::PaymentError,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Canceled,
    ];

    /// Returns the statuses reachable in one step from this one.
    pub fn allowed_next(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Draft => &[AwaitingPayment, Canceled],
            AwaitingPayment => &[PaymentApproved, PaymentError, Canceled],
            PaymentApproved => &[Processing, Canceled],
            Processing => &[Shipped, Canceled],
            Shipped => &[Delivered],
            PaymentError => &[AwaitingPayment, Canceled],
            Delivered | Canceled => &[],
        }
    }

    /// Returns the operations a caller may attempt in this status.
    pub fn allowed_actions(&self) -> &'static [OrderAction] {
        use OrderAction::*;
        match self {
            OrderStatus::Draft => &[AddItems, RemoveItems, ApplyDiscount, ProcessPayment, Cancel],
            OrderStatus::AwaitingPayment => &[ProcessPayment, Cancel],
            OrderStatus::PaymentApproved => &[StartProcessing, Cancel],
            OrderStatus::Processing => &[Ship, Cancel],
            OrderStatus::Shipped => &[UpdateTracking, MarkAsDelivered],
            OrderStatus::Delivered => &[RequestReturn],
            OrderStatus::Canceled => &[],
            OrderStatus::PaymentError => &[RetryPayment, Cancel],
        }
    }

    /// Returns true if `action` is allowed in this status.
    pub fn allows(&self, action: OrderAction) -> bool {
        self.allowed_actions().contains(&action)
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "Draft",
            OrderStatus::AwaitingPayment => "AwaitingPayment",
            OrderStatus::PaymentApproved => "PaymentApproved",
            OrderStatus::PaymentError => "PaymentError",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Canceled => "Canceled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operation names gated by the current order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderAction {
    AddItems,
    RemoveItems,
    ApplyDiscount,
    ProcessPayment,
    Cancel,
    StartProcessing,
    Ship,
    UpdateTracking,
    MarkAsDelivered,
    RequestReturn,
    RetryPayment,
}

impl OrderAction {
    /// Returns the action name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderAction::AddItems => "AddItems",
            OrderAction::RemoveItems => "RemoveItems",
            OrderAction::ApplyDiscount => "ApplyDiscount",
            OrderAction::ProcessPayment => "ProcessPayment",
            OrderAction::Cancel => "Cancel",
            OrderAction::StartProcessing => "StartProcessing",
            OrderAction::Ship => "Ship",
            OrderAction::UpdateTracking => "UpdateTracking",
            OrderAction::MarkAsDelivered => "MarkAsDelivered",
            OrderAction::RequestReturn => "RequestReturn",
            OrderAction::RetryPayment => "RetryPayment",
        }
    }
}

impl std::fmt::Display for OrderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
