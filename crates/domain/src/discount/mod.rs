//! Discount rules and their composition.
//!
//! Leaves and composites share the [`DiscountRule`] interface. The engine
//! builds a base group and a promotional group for each finalization and caps
//! their sum at a share of the gross total.

mod composite;
mod engine;
mod rules;

pub use composite::DiscountComposite;
pub use engine::{DiscountConfig, DiscountDetail, DiscountEngine, MAX_DISCOUNT_BPS};
pub use rules::{
    BirthdayDiscount, CouponDiscount, FirstPurchaseDiscount, FixedAmountDiscount,
    PercentageDiscount, SeasonalDiscount, VolumeDiscount,
};

use crate::order::{Money, Order};

/// A rule that contributes an absolute amount to an order's discount.
pub trait DiscountRule: Send + Sync + std::fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Returns the absolute discount contributed for `order`.
    fn calculate(&self, order: &Order) -> Money;
}
