use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Timelike;
use domain::{Money, ProductCategory};

use super::{ProcessingContext, StageKind, StageOutcome, ValidationStage};
use crate::clock::Clock;
use crate::error::WorkflowError;
use crate::services::{CustomerRepository, ProductRepository};

const MIN_ORDER_VALUE: Money = Money::from_cents(100);
const MAX_ORDER_VALUE: Money = Money::from_cents(1_000_000);
const MAX_ITEM_LINES: usize = 50;
const FIRST_PURCHASE_REVIEW_VALUE: Money = Money::from_cents(500_000);
const OFF_HOURS_REVIEW_VALUE: Money = Money::from_cents(200_000);
const AVERAGE_MULTIPLIER: u32 = 3;
const BUSINESS_HOURS_START: u32 = 8;
const BUSINESS_HOURS_END: u32 = 18;

/// Categories that are not shipped together.
const INCOMPATIBLE_CATEGORIES: (ProductCategory, ProductCategory) =
    (ProductCategory::Electronics, ProductCategory::Books);

/// Commercial limits and risk warnings.
///
/// Only the order value and line count can reject an order. Everything
/// else is advisory. The stage also flags the customer's birth month,
/// which is what grants the birthday discount at finalization.
pub struct BusinessRulesStage {
    customers: Arc<dyn CustomerRepository>,
    products: Arc<dyn ProductRepository>,
    clock: Arc<dyn Clock>,
}

impl BusinessRulesStage {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        products: Arc<dyn ProductRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            customers,
            products,
            clock,
        }
    }

    async fn mixes_incompatible_categories(
        &self,
        ctx: &ProcessingContext<'_>,
    ) -> Result<bool, WorkflowError> {
        let mut categories = HashSet::new();
        for item in ctx.order.items() {
            if let Some(product) = self.products.get_by_id(&item.product_id).await? {
                categories.insert(product.category);
            }
        }
        let (a, b) = INCOMPATIBLE_CATEGORIES;
        Ok(categories.contains(&a) && categories.contains(&b))
    }
}

#[async_trait]
impl ValidationStage for BusinessRulesStage {
    fn kind(&self) -> StageKind {
        StageKind::BusinessRules
    }

    async fn check(&self, ctx: &mut ProcessingContext<'_>) -> Result<StageOutcome, WorkflowError> {
        let order = ctx.order;
        let total = order.total_amount();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if total < MIN_ORDER_VALUE {
            errors.push(format!("Order value must be at least {MIN_ORDER_VALUE}"));
        }
        if total > MAX_ORDER_VALUE {
            errors.push(format!("Order value cannot exceed {MAX_ORDER_VALUE}"));
        }
        if order.item_count() > MAX_ITEM_LINES {
            errors.push(format!("Order cannot have more than {MAX_ITEM_LINES} items"));
        }

        let customer = match order.customer_id() {
            Some(id) => self.customers.get_by_id(id).await?,
            None => None,
        };

        if let Some(customer) = customer {
            if customer.is_first_purchase && total > FIRST_PURCHASE_REVIEW_VALUE {
                warnings.push(
                    "First purchase with a high value. Consider an additional verification"
                        .to_string(),
                );
            }

            if customer.is_birthday_month(self.clock.today()) {
                ctx.flags.is_birthday_month = true;
                ctx.log(
                    Some(StageKind::BusinessRules),
                    format!("Birthday month for customer {}", customer.id),
                );
            }

            if let Some(average) = customer.average_order_value
                && average.is_positive()
                && total > average.multiply(AVERAGE_MULTIPLIER)
            {
                warnings.push(format!(
                    "Order value is well above the customer's average ({average})"
                ));
            }
        }

        let hour = self.clock.now().hour();
        if (hour < BUSINESS_HOURS_START || hour > BUSINESS_HOURS_END)
            && total > OFF_HOURS_REVIEW_VALUE
        {
            warnings.push("High-value order placed outside business hours".to_string());
        }

        if self.mixes_incompatible_categories(ctx).await? {
            let (a, b) = INCOMPATIBLE_CATEGORIES;
            warnings.push(format!(
                "Order mixes {a:?} and {b:?} products, which ship separately"
            ));
        }

        Ok(StageOutcome::from_findings(
            errors,
            warnings,
            "Business rules satisfied",
            "Business rules violated",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::services::{InMemoryCustomerRepository, InMemoryProductRepository};
    use crate::validation::ProcessingAction;
    use chrono::NaiveDate;
    use domain::{Customer, CustomerId, Order, OrderItem, Product};

    struct Fixture {
        customers: InMemoryCustomerRepository,
        products: InMemoryProductRepository,
        customer: Customer,
    }

    impl Fixture {
        fn new() -> Self {
            let customer = Customer {
                id: CustomerId::new(),
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                birth_date: NaiveDate::from_ymd_opt(1990, 3, 14).unwrap(),
                is_first_purchase: false,
                average_order_value: None,
            };
            let customers = InMemoryCustomerRepository::new();
            customers.insert(customer.clone());

            let products = InMemoryProductRepository::new();
            products.insert(Product::new(
                "SKU-TV",
                "Television",
                Money::from_dollars(3000),
                10,
                ProductCategory::Electronics,
            ));
            products.insert(Product::new(
                "SKU-BOOK",
                "Novel",
                Money::from_dollars(20),
                100,
                ProductCategory::Books,
            ));

            Self {
                customers,
                products,
                customer,
            }
        }

        fn stage(&self, clock: FixedClock) -> BusinessRulesStage {
            BusinessRulesStage::new(
                Arc::new(self.customers.clone()),
                Arc::new(self.products.clone()),
                Arc::new(clock),
            )
        }

        fn order(&self, items: Vec<OrderItem>) -> Order {
            Order::new(self.customer.id, items)
        }
    }

    fn noon() -> FixedClock {
        FixedClock::at(2024, 6, 12, 12).unwrap()
    }

    fn tv(quantity: u32) -> OrderItem {
        OrderItem::new("SKU-TV", "Television", quantity, Money::from_dollars(3000))
    }

    fn book(quantity: u32) -> OrderItem {
        OrderItem::new("SKU-BOOK", "Novel", quantity, Money::from_dollars(20))
    }

    async fn run(stage: &BusinessRulesStage, order: &Order) -> (StageOutcome, bool) {
        let mut ctx = ProcessingContext::new(order, ProcessingAction::Create);
        let outcome = stage.check(&mut ctx).await.unwrap();
        (outcome, ctx.flags.is_birthday_month)
    }

    #[tokio::test]
    async fn test_ordinary_order_passes_quietly() {
        let fixture = Fixture::new();
        let order = fixture.order(vec![book(2)]);
        let (outcome, birthday) = run(&fixture.stage(noon()), &order).await;

        assert!(outcome.success);
        assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
        assert!(!birthday);
    }

    #[tokio::test]
    async fn test_value_limits() {
        let fixture = Fixture::new();
        let stage = fixture.stage(noon());

        let cheap = fixture.order(vec![OrderItem::new("SKU-GUM", "Gum", 1, Money::from_cents(99))]);
        let (outcome, _) = run(&stage, &cheap).await;
        assert_eq!(outcome.errors, vec!["Order value must be at least $1.00"]);

        let pricey = fixture.order(vec![tv(4)]);
        let (outcome, _) = run(&stage, &pricey).await;
        assert_eq!(outcome.message, "Business rules violated");
        assert_eq!(outcome.errors, vec!["Order value cannot exceed $10000.00"]);
    }

    #[tokio::test]
    async fn test_line_limit() {
        let fixture = Fixture::new();
        let items = (0..51)
            .map(|i| OrderItem::new(format!("SKU-{i}"), "Pen", 1, Money::from_cents(100)))
            .collect();
        let (outcome, _) = run(&fixture.stage(noon()), &fixture.order(items)).await;

        assert!(!outcome.success);
        assert_eq!(outcome.errors, vec!["Order cannot have more than 50 items"]);
    }

    #[tokio::test]
    async fn test_birthday_month_sets_flag() {
        let fixture = Fixture::new();
        let march = FixedClock::at(2024, 3, 2, 10).unwrap();
        let (outcome, birthday) = run(&fixture.stage(march), &fixture.order(vec![book(1)])).await;

        assert!(outcome.success);
        assert!(birthday);
    }

    #[tokio::test]
    async fn test_first_purchase_high_value_warns() {
        let mut fixture = Fixture::new();
        fixture.customer.is_first_purchase = true;
        fixture.customers.insert(fixture.customer.clone());

        let order = fixture.order(vec![tv(2)]);
        let (outcome, _) = run(&fixture.stage(noon()), &order).await;

        assert!(outcome.success);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].starts_with("First purchase"));
    }

    #[tokio::test]
    async fn test_above_average_warns() {
        let mut fixture = Fixture::new();
        fixture.customer.average_order_value = Some(Money::from_dollars(10));
        fixture.customers.insert(fixture.customer.clone());

        let (outcome, _) = run(&fixture.stage(noon()), &fixture.order(vec![book(2)])).await;
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("average ($10.00)"));
    }

    #[tokio::test]
    async fn test_off_hours_high_value_warns() {
        let fixture = Fixture::new();
        let order = fixture.order(vec![tv(1)]);

        let (outcome, _) = run(&fixture.stage(FixedClock::at(2024, 6, 12, 19).unwrap()), &order).await;
        assert_eq!(
            outcome.warnings,
            vec!["High-value order placed outside business hours"]
        );

        let (outcome, _) = run(&fixture.stage(FixedClock::at(2024, 6, 12, 18).unwrap()), &order).await;
        assert!(outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_incompatible_categories_warn() {
        let fixture = Fixture::new();
        let order = fixture.order(vec![
            OrderItem::new("SKU-TV", "Television", 1, Money::from_dollars(300)),
            book(1),
        ]);
        let (outcome, _) = run(&fixture.stage(noon()), &order).await;

        assert!(outcome.success);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("Electronics and Books"));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_an_error() {
        let fixture = Fixture::new();
        fixture.customers.set_fail_on_lookup(true);
        let order = fixture.order(vec![book(1)]);
        let mut ctx = ProcessingContext::new(&order, ProcessingAction::Create);

        let result = fixture.stage(noon()).check(&mut ctx).await;
        assert!(matches!(result, Err(WorkflowError::Repository(_))));
    }
}
