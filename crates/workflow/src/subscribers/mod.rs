//! Side effects triggered by order events.

mod audit;
mod email;
mod inventory;

pub use audit::AuditLogSubscriber;
pub use email::EmailNotificationSubscriber;
pub use inventory::InventoryUpdateSubscriber;
