//! Integration tests for the order workflow service.

use std::sync::Arc;

use chrono::NaiveDate;
use domain::{
    AccountingStatus, Customer, CustomerId, DiscountConfig, LifecycleMachine, Money, Order,
    OrderId, OrderItem, OrderStatus, Payment, PaymentStatus, Product, ProductCategory,
};
use workflow::{
    AuditLogSubscriber, Collaborators, EmailNotificationSubscriber, EventNotifier, FixedClock,
    InMemoryAccountingService, InMemoryAuditLog, InMemoryCustomerRepository,
    InMemoryEmailSender, InMemoryInventoryService, InMemoryOrderRepository,
    InMemoryPaymentGateway, InMemoryPaymentRepository, InMemoryProductRepository,
    InventoryUpdateSubscriber, OrderLine, OrderWorkflowService, PaymentGatewayDirectory,
    PaymentRequest, PaymentType, ProcessingAction, StageKind, ValidationChain, WorkflowError,
    services::ReservationState, validation::StructuralStage,
};

const CARD_METHOD: u32 = 1;

struct TestHarness {
    service: OrderWorkflowService,
    customers: InMemoryCustomerRepository,
    products: InMemoryProductRepository,
    orders: InMemoryOrderRepository,
    payments: InMemoryPaymentRepository,
    gateway: InMemoryPaymentGateway,
    accounting: InMemoryAccountingService,
    emails: InMemoryEmailSender,
    audit: InMemoryAuditLog,
    inventory: InMemoryInventoryService,
    clock: FixedClock,
    customer_id: CustomerId,
}

impl TestHarness {
    fn new() -> Self {
        Self::at(FixedClock::at(2024, 6, 12, 10).unwrap())
    }

    fn at(clock: FixedClock) -> Self {
        let customers = InMemoryCustomerRepository::new();
        let products = InMemoryProductRepository::new();
        let orders = InMemoryOrderRepository::new();
        let payments = InMemoryPaymentRepository::new();
        let gateway = InMemoryPaymentGateway::new();
        let accounting = InMemoryAccountingService::new();
        let emails = InMemoryEmailSender::new();
        let audit = InMemoryAuditLog::new();
        let inventory = InMemoryInventoryService::new();

        let notifier = Arc::new(EventNotifier::new());
        notifier.subscribe(Arc::new(EmailNotificationSubscriber::new(
            Arc::new(emails.clone()),
            Arc::new(customers.clone()),
        )));
        notifier.subscribe(Arc::new(AuditLogSubscriber::new(Arc::new(audit.clone()))));
        notifier.subscribe(Arc::new(InventoryUpdateSubscriber::new(Arc::new(
            inventory.clone(),
        ))));

        let gateways =
            PaymentGatewayDirectory::new().with(CARD_METHOD, Arc::new(gateway.clone()));

        let service = OrderWorkflowService::new(
            Collaborators {
                customers: Arc::new(customers.clone()),
                products: Arc::new(products.clone()),
                orders: Arc::new(orders.clone()),
                payments: Arc::new(payments.clone()),
                gateways: Arc::new(gateways),
                accounting: Arc::new(accounting.clone()),
                notifier,
                clock: Arc::new(clock),
            },
            DiscountConfig::default(),
        );

        for (sku, name, dollars, category) in [
            ("SKU-KB", "Keyboard", 150, ProductCategory::Electronics),
            ("SKU-MON", "Monitor", 500, ProductCategory::Electronics),
            ("SKU-BOOK", "Novel", 20, ProductCategory::Books),
        ] {
            products.insert(Product::new(
                sku,
                name,
                Money::from_dollars(dollars),
                100,
                category,
            ));
        }

        let mut harness = Self {
            service,
            customers,
            products,
            orders,
            payments,
            gateway,
            accounting,
            emails,
            audit,
            inventory,
            clock,
            customer_id: CustomerId::new(),
        };
        harness.customer_id = harness.add_customer(false, 3);
        harness
    }

    fn add_customer(&self, is_first_purchase: bool, birth_month: u32) -> CustomerId {
        let customer = Customer {
            id: CustomerId::new(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, birth_month, 14).unwrap(),
            is_first_purchase,
            average_order_value: None,
        };
        let id = customer.id;
        self.customers.insert(customer);
        id
    }

    async fn create(&self, sku: &str, quantity: u32) -> OrderId {
        let (order, _) = self
            .service
            .create_order(
                self.customer_id,
                vec![OrderLine {
                    product_id: sku.into(),
                    quantity,
                }],
            )
            .await
            .unwrap();
        order.id()
    }

    async fn create_and_finalize(&self, sku: &str, quantity: u32) -> OrderId {
        let order_id = self.create(sku, quantity).await;
        self.service.finalize_order(order_id, None).await.unwrap();
        order_id
    }

    fn card(payment_type: PaymentType, installments: Option<u32>) -> PaymentRequest {
        PaymentRequest {
            payment_method_id: CARD_METHOD,
            card_reference: Some("tok_visa".to_string()),
            installments,
            payment_type,
        }
    }
}

/// Moves a standalone order through the given statuses.
fn order_in(statuses: &[OrderStatus]) -> Order {
    let mut order = Order::new(
        CustomerId::new(),
        vec![OrderItem::new("SKU-KB", "Keyboard", 1, Money::from_dollars(150))],
    );
    for status in statuses {
        LifecycleMachine::transition(&mut order, *status, "test").unwrap();
    }
    order
}

#[tokio::test]
async fn test_happy_path_single_payment() {
    let h = TestHarness::new();
    let order_id = h.create("SKU-KB", 2).await;
    assert_eq!(h.inventory.reserved_quantity(order_id), 2);

    let finalized = h.service.finalize_order(order_id, None).await.unwrap();
    assert_eq!(finalized.status(), OrderStatus::AwaitingPayment);
    assert_eq!(finalized.total_amount(), Money::from_dollars(300));
    let accounting = finalized.accounting().unwrap();
    assert_eq!(accounting.status, AccountingStatus::Registered);
    assert_eq!(accounting.document_number.as_deref(), Some("DOC-000001"));

    let result = h
        .service
        .make_payment(order_id, TestHarness::card(PaymentType::SinglePayment, None))
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.status, PaymentStatus::Approved);
    assert_eq!(result.amount, Money::from_dollars(300));

    let order = h.service.get_order(order_id).await.unwrap();
    assert_eq!(order.status(), OrderStatus::PaymentApproved);
    assert_eq!(order.payments().len(), 1);
    assert_eq!(h.payments.payment_count(), 1);
    assert_eq!(
        h.inventory.reservation_state(order_id),
        Some(ReservationState::Confirmed)
    );

    // Confirmation, payment approved, status PaymentApproved.
    assert_eq!(h.emails.sent_count(), 3);
    // Created, finalized, payment, status change.
    assert_eq!(h.audit.entries().len(), 4);
    assert_eq!(h.accounting.registered_count(), 1);
}

#[tokio::test]
async fn test_discount_cap_applies_on_finalize() {
    let mut h = TestHarness::at(FixedClock::at(2024, 11, 25, 10).unwrap());
    h.customer_id = h.add_customer(true, 11);

    let lines: Vec<OrderLine> = (0..12)
        .map(|i| {
            let sku = format!("SKU-P{i:02}");
            h.products.insert(Product::new(
                sku.as_str(),
                format!("Pen {i}"),
                Money::from_dollars(100),
                10,
                ProductCategory::Home,
            ));
            OrderLine {
                product_id: sku.into(),
                quantity: 1,
            }
        })
        .collect();

    let (mut order, _) = h.service.create_order(h.customer_id, lines).await.unwrap();

    let detail = h.service.finalize(&mut order, Some("desc20")).await.unwrap();

    assert_eq!(detail.base_discount, Money::from_dollars(110));
    assert_eq!(detail.promotional_discount, Money::from_dollars(520));
    assert_eq!(detail.final_discount, Money::from_dollars(360));
    assert_eq!(order.discount(), Money::from_dollars(360));
    assert_eq!(order.total_amount(), Money::from_dollars(840));
    assert_eq!(
        h.service.get_order(order.id()).await.unwrap().discount_detail(),
        Some(&detail)
    );
}

#[tokio::test]
async fn test_birthday_discount_follows_business_rules_stage() {
    let mut h = TestHarness::at(FixedClock::at(2024, 11, 5, 10).unwrap());
    h.customer_id = h.add_customer(false, 11);

    let order_id = h.create("SKU-MON", 1).await;
    let order = h.service.finalize_order(order_id, None).await.unwrap();
    assert_eq!(
        order.discount_detail().unwrap().promotional_discount,
        Money::from_dollars(100)
    );

    // Without the business rules stage nobody flags the birth month.
    let chain = ValidationChain::custom(vec![Box::new(StructuralStage)]).unwrap();
    h.service = h.service.with_chain(chain);
    let order_id = h.create("SKU-MON", 1).await;
    let order = h.service.finalize_order(order_id, None).await.unwrap();
    assert_eq!(
        order.discount_detail().unwrap().promotional_discount,
        Money::zero()
    );
    assert_eq!(order.total_amount(), Money::from_dollars(500));
}

#[tokio::test]
async fn test_installment_payment_inflates_amount() {
    let h = TestHarness::new();
    let order_id = h.create_and_finalize("SKU-MON", 1).await;

    let result = h
        .service
        .make_payment(
            order_id,
            TestHarness::card(PaymentType::InstallmentPayment, Some(3)),
        )
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.amount, Money::from_dollars(515));
    let transaction_id = result.transaction_id.unwrap();
    assert_eq!(
        h.gateway.charged_amount(&transaction_id),
        Some(Money::from_dollars(515))
    );
}

#[tokio::test]
async fn test_installment_count_out_of_range_never_charges() {
    let h = TestHarness::new();
    let order_id = h.create_and_finalize("SKU-MON", 1).await;

    for count in [1, 13] {
        let result = h
            .service
            .make_payment(
                order_id,
                TestHarness::card(PaymentType::InstallmentPayment, Some(count)),
            )
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.next_status, Some(OrderStatus::PaymentError));
    }

    assert_eq!(h.gateway.charge_count(), 0);
    let order = h.service.get_order(order_id).await.unwrap();
    assert_eq!(order.status(), OrderStatus::AwaitingPayment);
    assert!(
        h.payments
            .payments_for(order_id)
            .iter()
            .all(|p| p.status == PaymentStatus::Declined)
    );
}

#[tokio::test]
async fn test_pay_rejected_when_shipped() {
    let h = TestHarness::new();
    let mut order = order_in(&[
        OrderStatus::AwaitingPayment,
        OrderStatus::PaymentApproved,
        OrderStatus::Processing,
        OrderStatus::Shipped,
    ]);
    let payment = Payment::new(order.id(), order.total_amount(), CARD_METHOD).with_card("tok_visa");

    let result = h
        .service
        .pay(&mut order, payment, PaymentType::SinglePayment)
        .await;

    assert!(!result.success);
    assert_eq!(result.status, PaymentStatus::Error);
    assert!(result.error_message.unwrap().contains("Shipped"));
    assert_eq!(order.status(), OrderStatus::Shipped);
    assert!(order.payments().is_empty());
    assert_eq!(h.gateway.charge_count(), 0);
    assert_eq!(h.payments.payment_count(), 0);
}

#[tokio::test]
async fn test_cancel_delivered_fails_without_event() {
    let h = TestHarness::new();
    let mut order = order_in(&[
        OrderStatus::AwaitingPayment,
        OrderStatus::PaymentApproved,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ]);

    let result = h.service.cancel(&mut order, "too late").await;

    assert!(matches!(result, Err(WorkflowError::TransitionRejected(_))));
    assert_eq!(order.status(), OrderStatus::Delivered);
    assert!(h.audit.entries().is_empty());
    assert_eq!(h.emails.sent_count(), 0);
}

#[tokio::test]
async fn test_cancel_after_payment_reports_refund() {
    let h = TestHarness::new();
    let order_id = h.create_and_finalize("SKU-KB", 2).await;
    h.service
        .make_payment(order_id, TestHarness::card(PaymentType::SinglePayment, None))
        .await
        .unwrap();

    let mut order = h.service.get_order(order_id).await.unwrap();
    let event = h.service.cancel(&mut order, "customer request").await.unwrap();

    assert!(event.refund_required);
    assert_eq!(event.refund_amount, Money::from_dollars(300));
    assert_eq!(
        h.service.get_order(order_id).await.unwrap().status(),
        OrderStatus::Canceled
    );
    assert_eq!(
        h.inventory.reservation_state(order_id),
        Some(ReservationState::Released)
    );
    let last_email = h.emails.sent().pop().unwrap();
    assert!(last_email.body.contains("refund of $300.00"));
}

#[tokio::test]
async fn test_failing_subscriber_does_not_block_others() {
    let h = TestHarness::new();
    h.emails.set_fail_on_send(true);

    let order_id = h.create("SKU-KB", 1).await;

    assert_eq!(h.emails.sent_count(), 0);
    assert_eq!(h.audit.entries_for("Order", &order_id.to_string()).len(), 1);
    assert_eq!(h.inventory.reserved_quantity(order_id), 1);
}

#[tokio::test]
async fn test_declined_payment_keeps_order_awaiting_payment() {
    let h = TestHarness::new();
    let order_id = h.create_and_finalize("SKU-KB", 1).await;
    h.gateway.set_fail_on_charge(true);

    let result = h
        .service
        .make_payment(order_id, TestHarness::card(PaymentType::SinglePayment, None))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.status, PaymentStatus::Declined);
    assert_eq!(result.next_status, Some(OrderStatus::PaymentError));

    let order = h.service.get_order(order_id).await.unwrap();
    assert_eq!(order.status(), OrderStatus::AwaitingPayment);
    assert_eq!(order.payments()[0].status, PaymentStatus::Declined);
    assert_eq!(
        h.inventory.reservation_state(order_id),
        Some(ReservationState::Reserved)
    );

    let payment_id = order.payments()[0].id.to_string();
    assert_eq!(h.audit.entries_for("Payment", &payment_id).len(), 1);
    assert!(
        h.emails
            .sent()
            .iter()
            .any(|e| e.subject.starts_with("Problem with the payment"))
    );

    // The customer can retry once the card works again.
    h.gateway.set_fail_on_charge(false);
    let retry = h
        .service
        .make_payment(order_id, TestHarness::card(PaymentType::SinglePayment, None))
        .await
        .unwrap();
    assert!(retry.success);
    let order = h.service.get_order(order_id).await.unwrap();
    assert_eq!(order.status(), OrderStatus::PaymentApproved);
    assert_eq!(order.payments().len(), 2);
    assert_eq!(
        h.inventory.reservation_state(order_id),
        Some(ReservationState::Confirmed)
    );
    assert_eq!(h.inventory.reserved_quantity(order_id), 1);
}

#[tokio::test]
async fn test_gateway_outage_is_an_error_result() {
    let h = TestHarness::new();
    let order_id = h.create_and_finalize("SKU-KB", 1).await;
    h.gateway.set_unavailable(true);

    let result = h
        .service
        .make_payment(order_id, TestHarness::card(PaymentType::SinglePayment, None))
        .await
        .unwrap();

    assert_eq!(result.status, PaymentStatus::Error);
    assert_eq!(result.next_status, Some(OrderStatus::PaymentError));
}

#[tokio::test]
async fn test_unsupported_payment_type() {
    let h = TestHarness::new();
    let order_id = h.create_and_finalize("SKU-KB", 1).await;

    let result = h
        .service
        .make_payment(order_id, TestHarness::card(PaymentType::CorporatePayment, None))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.next_status, Some(OrderStatus::PaymentError));
    assert_eq!(h.gateway.charge_count(), 0);
}

#[tokio::test]
async fn test_payment_store_failure_is_contained() {
    let h = TestHarness::new();
    let order_id = h.create_and_finalize("SKU-KB", 1).await;
    h.payments.set_fail_on_add(true);

    let result = h
        .service
        .make_payment(order_id, TestHarness::card(PaymentType::SinglePayment, None))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.status, PaymentStatus::Error);
    assert_eq!(
        result.error_message.as_deref(),
        Some("Internal error while processing the payment")
    );
    let order = h.service.get_order(order_id).await.unwrap();
    assert_eq!(order.status(), OrderStatus::AwaitingPayment);
    assert!(order.payments().is_empty());
    assert_eq!(
        h.inventory.reservation_state(order_id),
        Some(ReservationState::Reserved)
    );
    let payment_events: Vec<_> = h
        .audit
        .entries()
        .into_iter()
        .filter(|e| e.event_type == "PaymentProcessed")
        .collect();
    assert_eq!(payment_events.len(), 1);
    assert_eq!(payment_events[0].data["data"]["success"], false);
    // Created, finalized, failed payment.
    assert_eq!(h.audit.entries().len(), 3);

    h.payments.set_fail_on_add(false);
    let retry = h
        .service
        .make_payment(order_id, TestHarness::card(PaymentType::SinglePayment, None))
        .await
        .unwrap();
    assert!(retry.success);
    assert_eq!(
        h.service.get_order(order_id).await.unwrap().status(),
        OrderStatus::PaymentApproved
    );
}

#[tokio::test]
async fn test_order_store_failure_leaves_order_unpaid() {
    let h = TestHarness::new();
    let order_id = h.create_and_finalize("SKU-KB", 1).await;
    let mut order = h.service.get_order(order_id).await.unwrap();
    h.orders.set_fail_on_write(true);

    let payment = Payment::new(order_id, order.total_amount(), CARD_METHOD).with_card("tok_visa");
    let result = h
        .service
        .pay(&mut order, payment, PaymentType::SinglePayment)
        .await;

    assert_eq!(result.status, PaymentStatus::Error);
    assert_eq!(order.status(), OrderStatus::AwaitingPayment);
    assert!(order.payments().is_empty());
    assert_eq!(
        h.service.get_order(order_id).await.unwrap().status(),
        OrderStatus::AwaitingPayment
    );
    assert_eq!(
        h.inventory.reservation_state(order_id),
        Some(ReservationState::Reserved)
    );
}

#[tokio::test]
async fn test_accounting_failure_is_not_fatal() {
    let h = TestHarness::new();
    h.accounting.set_unavailable(true);
    let order_id = h.create("SKU-KB", 1).await;

    let order = h.service.finalize_order(order_id, None).await.unwrap();

    assert_eq!(order.status(), OrderStatus::AwaitingPayment);
    let accounting = order.accounting().unwrap();
    assert_eq!(accounting.status, AccountingStatus::Error);
    assert!(accounting.document_number.is_none());
    assert_eq!(
        h.service.get_order(order_id).await.unwrap().accounting(),
        Some(accounting)
    );
}

#[tokio::test]
async fn test_finalize_twice_is_rejected() {
    let h = TestHarness::new();
    let order_id = h.create_and_finalize("SKU-KB", 1).await;

    let result = h.service.finalize_order(order_id, None).await;

    assert!(matches!(result, Err(WorkflowError::TransitionRejected(_))));
    assert_eq!(h.accounting.registered_count(), 1);
}

#[tokio::test]
async fn test_validation_failure_persists_nothing() {
    let h = TestHarness::new();

    let result = h
        .service
        .create_order(
            h.customer_id,
            vec![OrderLine {
                product_id: "SKU-KB".into(),
                quantity: 101,
            }],
        )
        .await;

    let (message, errors) = match result {
        Err(WorkflowError::Validation { message, errors }) => (message, errors),
        other => panic!("expected a validation failure, got {other:?}"),
    };
    assert_eq!(message, "Inventory check failed");
    assert_eq!(
        errors,
        vec!["Product Keyboard: insufficient stock (available 100, requested 101)"]
    );
    assert_eq!(h.orders.order_count(), 0);
    assert_eq!(h.inventory.reservation_count(), 0);
    assert!(h.audit.entries().is_empty());
}

#[tokio::test]
async fn test_unknown_ids() {
    let h = TestHarness::new();

    let stranger = CustomerId::new();
    let result = h.service.create_order(stranger, Vec::new()).await;
    assert!(matches!(result, Err(WorkflowError::CustomerNotFound(id)) if id == stranger));

    let result = h
        .service
        .create_order(
            h.customer_id,
            vec![OrderLine {
                product_id: "SKU-404".into(),
                quantity: 1,
            }],
        )
        .await;
    assert!(matches!(result, Err(WorkflowError::Validation { .. })));

    let missing = OrderId::new();
    let result = h.service.get_order(missing).await;
    assert!(matches!(result, Err(WorkflowError::OrderNotFound(id)) if id == missing));
}

#[tokio::test]
async fn test_chain_short_circuits_on_structural_failure() {
    let h = TestHarness::new();
    let chain = ValidationChain::standard(
        Arc::new(h.customers.clone()),
        Arc::new(h.products.clone()),
        Arc::new(h.clock),
    );

    let result = chain
        .run(&Order::draft(None, Vec::new()), ProcessingAction::Validate)
        .await;

    assert!(!result.success);
    assert_eq!(result.failed_stage, Some(StageKind::Structural));
    assert!(result.log.iter().all(|entry| {
        !matches!(
            entry.stage,
            Some(StageKind::Inventory) | Some(StageKind::BusinessRules)
        )
    }));
}
