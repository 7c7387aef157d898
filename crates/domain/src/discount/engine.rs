use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::order::{Customer, Money, Order};

use super::{
    BirthdayDiscount, CouponDiscount, DiscountComposite, DiscountRule, FirstPurchaseDiscount,
    FixedAmountDiscount, PercentageDiscount, SeasonalDiscount, VolumeDiscount,
};

/// Upper bound for the final discount, in basis points of the gross total.
pub const MAX_DISCOUNT_BPS: u32 = 3_000;

const PEAK_MONTH: u32 = 11;
const PEAK_FIRST_DAY: u32 = 20;
const PEAK_LAST_DAY: u32 = 30;

/// Optional store-wide rules added to the base group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DiscountConfig {
    pub apply_percentage: bool,
    /// Rate in basis points (1000 = 10%).
    pub percentage_bps: u32,
    pub apply_fixed: bool,
    pub fixed_amount: Money,
}

impl DiscountConfig {
    pub fn with_percentage(mut self, bps: u32) -> Self {
        self.apply_percentage = true;
        self.percentage_bps = bps;
        self
    }

    pub fn with_fixed(mut self, amount: Money) -> Self {
        self.apply_fixed = true;
        self.fixed_amount = amount;
        self
    }
}

/// Breakdown of one discount calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DiscountDetail {
    pub base_discount: Money,
    pub promotional_discount: Money,
    /// Sum of both groups, capped at [`MAX_DISCOUNT_BPS`] of the gross total.
    pub final_discount: Money,
}

/// Builds the rule groups for an order and caps their combined effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscountEngine;

impl DiscountEngine {
    /// Rules that apply to every order.
    pub fn base_rules(customer: &Customer, config: &DiscountConfig) -> DiscountComposite {
        let mut base = DiscountComposite::new("base")
            .with(FirstPurchaseDiscount::new(customer.is_first_purchase))
            .with(VolumeDiscount);

        if config.apply_percentage {
            base.add(PercentageDiscount::new(config.percentage_bps));
        }
        if config.apply_fixed {
            base.add(FixedAmountDiscount::new(config.fixed_amount));
        }
        base
    }

    /// Rules that depend on the date, the customer's birth month or a coupon.
    pub fn promotional_rules(
        is_birthday_month: bool,
        coupon: Option<&str>,
        today: NaiveDate,
    ) -> DiscountComposite {
        let mut promo = DiscountComposite::new("promotional");

        if Self::is_peak_promotion(today) {
            promo.add(SeasonalDiscount);
        }
        if is_birthday_month {
            promo.add(BirthdayDiscount);
        }
        if let Some(code) = coupon.filter(|code| !code.trim().is_empty()) {
            promo.add(CouponDiscount::new(code));
        }
        promo
    }

    /// Returns true inside the November 20-30 promotion window.
    pub fn is_peak_promotion(date: NaiveDate) -> bool {
        date.month() == PEAK_MONTH && (PEAK_FIRST_DAY..=PEAK_LAST_DAY).contains(&date.day())
    }

    /// Computes the discount without touching the order.
    pub fn calculate(
        order: &Order,
        customer: &Customer,
        config: &DiscountConfig,
        coupon: Option<&str>,
        today: NaiveDate,
    ) -> DiscountDetail {
        let is_birthday_month = customer.is_birthday_month(today);
        Self::calculate_with_birthday(order, customer, config, coupon, today, is_birthday_month)
    }

    /// Like [`DiscountEngine::calculate`], with the birth-month check
    /// already made by the caller.
    pub fn calculate_with_birthday(
        order: &Order,
        customer: &Customer,
        config: &DiscountConfig,
        coupon: Option<&str>,
        today: NaiveDate,
        is_birthday_month: bool,
    ) -> DiscountDetail {
        let base = Self::base_rules(customer, config);
        let promo = Self::promotional_rules(is_birthday_month, coupon, today);

        let base_discount = base.calculate(order);
        let promotional_discount = promo.calculate(order);
        let cap = order.gross_total().percent_bps(MAX_DISCOUNT_BPS);
        let final_discount = (base_discount + promotional_discount).min(cap).non_negative();

        tracing::debug!(
            order_id = %order.id(),
            base_rules = ?base.rule_names(),
            promotional_rules = ?promo.rule_names(),
            %base_discount,
            %promotional_discount,
            %final_discount,
            "discount calculated"
        );

        DiscountDetail {
            base_discount,
            promotional_discount,
            final_discount,
        }
    }

    /// Computes the discount and writes it to the order.
    pub fn apply(
        order: &mut Order,
        customer: &Customer,
        config: &DiscountConfig,
        coupon: Option<&str>,
        today: NaiveDate,
    ) -> DiscountDetail {
        let detail = Self::calculate(order, customer, config, coupon, today);
        order.apply_discount(detail);
        detail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderItem;
    use common::CustomerId;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn customer(first_purchase: bool, birth_month: u32) -> Customer {
        Customer {
            id: CustomerId::new(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            birth_date: date(1990, birth_month, 1),
            is_first_purchase: first_purchase,
            average_order_value: None,
        }
    }

    fn twelve_notebooks(customer: &Customer) -> Order {
        let items = (0..12)
            .map(|i| OrderItem::new(format!("NB-{i}"), "Notebook", 1, Money::from_dollars(100)))
            .collect();
        Order::new(customer.id, items)
    }

    #[test]
    fn test_peak_promotion_window() {
        assert!(!DiscountEngine::is_peak_promotion(date(2024, 11, 19)));
        assert!(DiscountEngine::is_peak_promotion(date(2024, 11, 20)));
        assert!(DiscountEngine::is_peak_promotion(date(2024, 11, 30)));
        assert!(!DiscountEngine::is_peak_promotion(date(2024, 12, 1)));
        assert!(!DiscountEngine::is_peak_promotion(date(2024, 10, 25)));
    }

    #[test]
    fn test_all_rules_firing_are_capped_at_thirty_percent() {
        let customer = customer(true, 11);
        let order = twelve_notebooks(&customer);

        let detail = DiscountEngine::calculate(
            &order,
            &customer,
            &DiscountConfig::default(),
            Some("DESC20"),
            date(2024, 11, 25),
        );

        assert_eq!(detail.base_discount, Money::from_dollars(110));
        assert_eq!(detail.promotional_discount, Money::from_dollars(520));
        assert_eq!(detail.final_discount, Money::from_dollars(360));
    }

    #[test]
    fn test_configured_rules_join_base_group() {
        let customer = customer(true, 11);
        let order = twelve_notebooks(&customer);
        let config = DiscountConfig::default()
            .with_percentage(1_000)
            .with_fixed(Money::from_dollars(5));

        let base = DiscountEngine::base_rules(&customer, &config);
        assert_eq!(
            base.rule_names(),
            vec!["first_purchase", "volume", "percentage", "fixed_amount"]
        );
        assert_eq!(base.calculate(&order), Money::from_dollars(235));
    }

    #[test]
    fn test_off_season_without_coupon() {
        let customer = customer(false, 3);
        let order = twelve_notebooks(&customer);

        let promo = DiscountEngine::promotional_rules(false, Some("  "), date(2024, 6, 10));
        assert!(promo.is_empty());

        let detail = DiscountEngine::calculate(
            &order,
            &customer,
            &DiscountConfig::default(),
            None,
            date(2024, 6, 10),
        );
        assert_eq!(detail.base_discount, Money::from_dollars(60));
        assert_eq!(detail.promotional_discount, Money::zero());
        assert_eq!(detail.final_discount, Money::from_dollars(60));
    }

    #[test]
    fn test_birthday_rule_follows_the_flag() {
        let customer = customer(false, 11);
        let order = twelve_notebooks(&customer);
        let config = DiscountConfig::default();
        let today = date(2024, 11, 25);

        let with_flag =
            DiscountEngine::calculate_with_birthday(&order, &customer, &config, None, today, true);
        let without_flag =
            DiscountEngine::calculate_with_birthday(&order, &customer, &config, None, today, false);

        assert_eq!(with_flag.promotional_discount, Money::from_dollars(280));
        assert_eq!(without_flag.promotional_discount, Money::from_dollars(180));
        assert_eq!(
            DiscountEngine::calculate(&order, &customer, &config, None, today),
            with_flag
        );
    }

    #[test]
    fn test_apply_writes_detail_to_order() {
        let customer = customer(true, 11);
        let mut order = twelve_notebooks(&customer);

        let detail = DiscountEngine::apply(
            &mut order,
            &customer,
            &DiscountConfig::default(),
            Some("desc20"),
            date(2024, 11, 25),
        );

        assert_eq!(order.discount(), detail.final_discount);
        assert_eq!(order.discount_detail(), Some(&detail));
        assert_eq!(order.total_amount(), Money::from_dollars(840));
    }
}
