//! Domain layer for the order-processing engine.
//!
//! This crate provides the pure, synchronous model the workflow orchestrates:
//! - `Order` aggregate with its items, payments and discount breakdown
//! - `LifecycleMachine` encoding the legal status graph and allowed actions
//! - Discount rules composed into base and promotional groups
//! - The four order lifecycle events published to subscribers

pub mod discount;
pub mod error;
pub mod order;

pub use common::{CustomerId, EventId, OrderId, PaymentId, ProductId};
pub use discount::{
    BirthdayDiscount, CouponDiscount, DiscountComposite, DiscountConfig, DiscountDetail,
    DiscountEngine, DiscountRule, FirstPurchaseDiscount, FixedAmountDiscount, PercentageDiscount,
    SeasonalDiscount, VolumeDiscount,
};
pub use error::OrderError;
pub use order::{
    AccountingRecord, AccountingResult, AccountingStatus, Customer, DomainEvent, EventHeader,
    LifecycleMachine, Money, Order, OrderAction, OrderCancelled, OrderCreated, OrderEvent,
    OrderItem, OrderItemSnapshot, OrderStatus, OrderStatusChanged, Payment, PaymentProcessed,
    PaymentStatus, Product, ProductCategory, StatusTransition,
};
