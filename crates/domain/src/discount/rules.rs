//! Leaf discount rules.

use crate::order::{Money, Order};

use super::DiscountRule;

/// Flat bonus for a customer's first purchase.
pub const FIRST_PURCHASE_BONUS: Money = Money::from_cents(5_000);

/// Flat bonus during the customer's birth month.
pub const BIRTHDAY_BONUS: Money = Money::from_cents(10_000);

/// Orders with more line items than this qualify for the volume discount.
pub const VOLUME_THRESHOLD: usize = 10;

const VOLUME_BPS: u32 = 500;
const SEASONAL_BPS: u32 = 1_500;
const COUPON_BPS: u32 = 2_000;

/// The only coupon code currently honoured.
pub const RECOGNIZED_COUPON: &str = "DESC20";

/// Grants [`FIRST_PURCHASE_BONUS`] when the customer never bought before.
#[derive(Debug, Clone, Copy)]
pub struct FirstPurchaseDiscount {
    is_first_purchase: bool,
}

impl FirstPurchaseDiscount {
    pub fn new(is_first_purchase: bool) -> Self {
        Self { is_first_purchase }
    }
}

impl DiscountRule for FirstPurchaseDiscount {
    fn name(&self) -> &str {
        "first_purchase"
    }

    fn calculate(&self, _order: &Order) -> Money {
        if self.is_first_purchase {
            FIRST_PURCHASE_BONUS
        } else {
            Money::zero()
        }
    }
}

/// 5% of the gross total for orders with more than ten line items.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeDiscount;

impl DiscountRule for VolumeDiscount {
    fn name(&self) -> &str {
        "volume"
    }

    fn calculate(&self, order: &Order) -> Money {
        if order.item_count() > VOLUME_THRESHOLD {
            order.gross_total().percent_bps(VOLUME_BPS)
        } else {
            Money::zero()
        }
    }
}

/// Configured percentage of the gross total.
#[derive(Debug, Clone, Copy)]
pub struct PercentageDiscount {
    bps: u32,
}

impl PercentageDiscount {
    /// `bps` is the rate in basis points (1000 = 10%).
    pub fn new(bps: u32) -> Self {
        Self { bps }
    }
}

impl DiscountRule for PercentageDiscount {
    fn name(&self) -> &str {
        "percentage"
    }

    fn calculate(&self, order: &Order) -> Money {
        order.gross_total().percent_bps(self.bps)
    }
}

/// Configured flat amount.
#[derive(Debug, Clone, Copy)]
pub struct FixedAmountDiscount {
    amount: Money,
}

impl FixedAmountDiscount {
    pub fn new(amount: Money) -> Self {
        Self { amount }
    }
}

impl DiscountRule for FixedAmountDiscount {
    fn name(&self) -> &str {
        "fixed_amount"
    }

    fn calculate(&self, _order: &Order) -> Money {
        self.amount
    }
}

/// 15% of the order total. Only included inside the peak promotion window.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeasonalDiscount;

impl DiscountRule for SeasonalDiscount {
    fn name(&self) -> &str {
        "seasonal"
    }

    fn calculate(&self, order: &Order) -> Money {
        order.total_amount().percent_bps(SEASONAL_BPS)
    }
}

/// Grants [`BIRTHDAY_BONUS`]. Only included in the customer's birth month.
#[derive(Debug, Clone, Copy, Default)]
pub struct BirthdayDiscount;

impl DiscountRule for BirthdayDiscount {
    fn name(&self) -> &str {
        "birthday"
    }

    fn calculate(&self, _order: &Order) -> Money {
        BIRTHDAY_BONUS
    }
}

/// 20% of the gross total for a recognized coupon code.
#[derive(Debug, Clone)]
pub struct CouponDiscount {
    code: String,
}

impl CouponDiscount {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }

    /// Returns true if the code is honoured (case-insensitive).
    pub fn is_recognized(&self) -> bool {
        self.code.trim().eq_ignore_ascii_case(RECOGNIZED_COUPON)
    }
}

impl DiscountRule for CouponDiscount {
    fn name(&self) -> &str {
        "coupon"
    }

    fn calculate(&self, order: &Order) -> Money {
        if self.is_recognized() {
            order.gross_total().percent_bps(COUPON_BPS)
        } else {
            Money::zero()
        }
    }
}
