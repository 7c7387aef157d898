//! External collaborator traits and in-memory implementations.

pub mod accounting;
pub mod catalog;
pub mod gateway;
pub mod inventory;
pub mod notification;
pub mod repository;

pub use accounting::{AccountingService, InMemoryAccountingService};
pub use catalog::{
    CustomerRepository, InMemoryCustomerRepository, InMemoryProductRepository, ProductRepository,
};
pub use gateway::{GatewayResponse, InMemoryPaymentGateway, PaymentGateway, PaymentGatewayDirectory};
pub use inventory::{
    InMemoryInventoryService, InventoryService, ReservationItem, ReservationResult,
    ReservationState,
};
pub use notification::{
    AuditLog, AuditLogEntry, EmailSender, InMemoryAuditLog, InMemoryEmailSender, SentEmail,
};
pub use repository::{
    InMemoryOrderRepository, InMemoryPaymentRepository, OrderRepository, PaymentRepository,
};

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// In-memory state is plain data, so a panicked writer cannot leave it torn.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
