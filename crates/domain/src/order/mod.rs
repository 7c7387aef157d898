//! Order aggregate and related types.

mod aggregate;
mod events;
mod lifecycle;
mod payment;
mod status;
mod value_objects;

pub use aggregate::{AccountingRecord, AccountingResult, AccountingStatus, Order};
pub use events::{
    DomainEvent, EventHeader, OrderCancelled, OrderCreated, OrderEvent, OrderItemSnapshot,
    OrderStatusChanged, PaymentProcessed,
};
pub use lifecycle::{LifecycleMachine, StatusTransition};
pub use payment::{Payment, PaymentStatus};
pub use status::{OrderAction, OrderStatus};
pub use value_objects::{Customer, Money, OrderItem, Product, ProductCategory};
