//! Order workflow orchestration.
//!
//! This crate drives an [`Order`](domain::Order) through its lifecycle:
//! 1. Validate it through an ordered chain of stages
//! 2. Compute and cap discounts, then await payment
//! 3. Charge it with the strategy matching the payment type
//! 4. Fan the resulting events out to email, audit and inventory subscribers
//!
//! External systems (catalog, persistence, gateways, accounting, email,
//! audit, inventory) are traits with in-memory implementations.

pub mod clock;
pub mod error;
pub mod notifier;
pub mod payment;
pub mod service;
pub mod services;
pub mod subscribers;
pub mod validation;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::WorkflowError;
pub use notifier::{EventNotifier, OrderEventSubscriber};
pub use payment::{
    InstallmentPaymentStrategy, PaymentDispatcher, PaymentResult, PaymentStrategy, PaymentType,
    SinglePaymentStrategy,
};
pub use service::{Collaborators, OrderLine, OrderWorkflowService, PaymentRequest};
pub use services::{
    AccountingService, AuditLog, AuditLogEntry, CustomerRepository, EmailSender, GatewayResponse,
    InMemoryAccountingService, InMemoryAuditLog, InMemoryCustomerRepository,
    InMemoryEmailSender, InMemoryInventoryService, InMemoryOrderRepository,
    InMemoryPaymentGateway, InMemoryPaymentRepository, InMemoryProductRepository,
    InventoryService, OrderRepository, PaymentGateway, PaymentGatewayDirectory,
    PaymentRepository, ProductRepository,
};
pub use subscribers::{AuditLogSubscriber, EmailNotificationSubscriber, InventoryUpdateSubscriber};
pub use validation::{
    ProcessingAction, ProcessingResult, StageKind, ValidationChain, ValidationStage,
};
