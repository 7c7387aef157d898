//! Order workflow service: the one place that mutates, persists and publishes.
//!
//! Each operation runs its steps in a fixed order: validation, then
//! mutation, then persistence, then event publication. A step that fails
//! ends the operation before the next one starts.

use std::sync::Arc;
use std::time::Instant;

use common::{CustomerId, OrderId, ProductId};
use domain::{
    AccountingResult, DiscountConfig, DiscountDetail, DiscountEngine, LifecycleMachine, Order,
    OrderAction, OrderCancelled, OrderCreated, OrderItem, OrderStatus, OrderStatusChanged,
    Payment, PaymentProcessed, PaymentStatus,
};
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::error::{Result, WorkflowError};
use crate::notifier::EventNotifier;
use crate::payment::{PaymentDispatcher, PaymentResult, PaymentType};
use crate::services::{
    AccountingService, CustomerRepository, OrderRepository, PaymentGatewayDirectory,
    PaymentRepository, ProductRepository,
};
use crate::validation::{ProcessingAction, ProcessingResult, ValidationChain};

/// External capabilities the workflow depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub customers: Arc<dyn CustomerRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub gateways: Arc<PaymentGatewayDirectory>,
    pub accounting: Arc<dyn AccountingService>,
    pub notifier: Arc<EventNotifier>,
    pub clock: Arc<dyn Clock>,
}

/// A product and quantity requested for a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Payment data supplied by the customer for [`OrderWorkflowService::make_payment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub payment_method_id: u32,
    pub card_reference: Option<String>,
    /// Defaults to one installment.
    pub installments: Option<u32>,
    pub payment_type: PaymentType,
}

/// Orchestrates order creation, finalization, payment and cancellation.
pub struct OrderWorkflowService {
    chain: ValidationChain,
    dispatcher: PaymentDispatcher,
    discounts: DiscountConfig,
    customers: Arc<dyn CustomerRepository>,
    products: Arc<dyn ProductRepository>,
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentRepository>,
    accounting: Arc<dyn AccountingService>,
    notifier: Arc<EventNotifier>,
    clock: Arc<dyn Clock>,
}

impl OrderWorkflowService {
    /// Builds the service with the standard validation chain and the
    /// default payment strategies.
    pub fn new(collaborators: Collaborators, discounts: DiscountConfig) -> Self {
        let Collaborators {
            customers,
            products,
            orders,
            payments,
            gateways,
            accounting,
            notifier,
            clock,
        } = collaborators;

        Self {
            chain: ValidationChain::standard(customers.clone(), products.clone(), clock.clone()),
            dispatcher: PaymentDispatcher::with_defaults(gateways),
            discounts,
            customers,
            products,
            orders,
            payments,
            accounting,
            notifier,
            clock,
        }
    }

    /// Replaces the validation chain.
    pub fn with_chain(mut self, chain: ValidationChain) -> Self {
        self.chain = chain;
        self
    }

    /// Replaces the payment dispatcher.
    pub fn with_dispatcher(mut self, dispatcher: PaymentDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn notifier(&self) -> &Arc<EventNotifier> {
        &self.notifier
    }

    pub fn dispatcher(&self) -> &PaymentDispatcher {
        &self.dispatcher
    }

    pub fn discount_config(&self) -> &DiscountConfig {
        &self.discounts
    }

    /// Validates and stores a new order, then publishes `OrderCreated`.
    ///
    /// Returns the validation result so callers can surface its warnings.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    pub async fn create(&self, order: &Order) -> Result<ProcessingResult> {
        let started = Instant::now();

        let validation = self.chain.run(order, ProcessingAction::Create).await;
        if !validation.success {
            warn!(errors = ?validation.errors, "order rejected at creation");
            return Err(validation.into_error());
        }

        self.orders.add(order).await?;
        self.notifier
            .publish_order_created(&OrderCreated::new(order))
            .await;

        info!(total = %order.total_amount(), warnings = validation.warnings.len(), "order created");
        metrics::counter!("orders_created_total").increment(1);
        record_duration("create", started);
        Ok(validation)
    }

    /// Validates the order, applies discounts, moves it to `AwaitingPayment`
    /// and registers the sale with accounting.
    ///
    /// If the status change is rejected the order is left untouched.
    /// Accounting failures are recorded on the order but do not abort.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    pub async fn finalize(&self, order: &mut Order, coupon: Option<&str>) -> Result<DiscountDetail> {
        let started = Instant::now();

        let validation = self.chain.run(order, ProcessingAction::Finalize).await;
        if !validation.success {
            warn!(errors = ?validation.errors, "order rejected at finalization");
            return Err(validation.into_error());
        }

        let customer_id = order.customer_id().ok_or_else(|| WorkflowError::Validation {
            message: "Order validation failed".to_string(),
            errors: vec!["Customer is required".to_string()],
        })?;
        let customer = self
            .customers
            .get_by_id(customer_id)
            .await?
            .ok_or(WorkflowError::CustomerNotFound(customer_id))?;

        let detail = DiscountEngine::calculate_with_birthday(
            order,
            &customer,
            &self.discounts,
            coupon,
            self.clock.today(),
            validation.flags.is_birthday_month,
        );

        let transition = LifecycleMachine::transition(
            order,
            OrderStatus::AwaitingPayment,
            "Order finalized and awaiting payment",
        )?;
        order.apply_discount(detail);

        let accounting = match self.accounting.register_sale(order).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "accounting registration failed");
                AccountingResult {
                    success: false,
                    document_number: None,
                    accounting_date: None,
                    message: Some(e.to_string()),
                }
            }
        };
        if !accounting.success {
            warn!(message = ?accounting.message, "sale not registered with accounting");
        }
        order.record_accounting(accounting);

        self.orders.update(order).await?;
        self.notifier
            .publish_status_changed(&OrderStatusChanged::new(
                order,
                transition.previous,
                Some(transition.reason),
            ))
            .await;

        info!(
            base = %detail.base_discount,
            promotional = %detail.promotional_discount,
            final_discount = %detail.final_discount,
            total = %order.total_amount(),
            "order finalized"
        );
        metrics::counter!("orders_finalized_total").increment(1);
        record_duration("finalize", started);
        Ok(detail)
    }

    /// Charges a payment against the order.
    ///
    /// Never fails: internal faults become an `Error` result with next
    /// status `PaymentError`, and a failed `PaymentProcessed` event is
    /// still published. A fault leaves `order` and its stored copy as they
    /// were before the call.
    #[tracing::instrument(
        skip(self, order, payment),
        fields(order_id = %order.id(), payment_id = %payment.id)
    )]
    pub async fn pay(
        &self,
        order: &mut Order,
        mut payment: Payment,
        payment_type: PaymentType,
    ) -> PaymentResult {
        let started = Instant::now();

        let result = match self.try_pay(order, &mut payment, payment_type).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "payment processing failed");
                let message = e.to_string();
                payment.status = PaymentStatus::Error;
                payment.error_message = Some(message.clone());
                self.notifier
                    .publish_payment_processed(&PaymentProcessed::new(
                        order,
                        &payment,
                        false,
                        Some(message),
                    ))
                    .await;
                PaymentResult::errored(
                    "Internal error while processing the payment",
                    payment.amount,
                )
            }
        };

        metrics::counter!("payments_processed_total", "outcome" => result.status.as_str())
            .increment(1);
        record_duration("pay", started);
        result
    }

    async fn try_pay(
        &self,
        order: &mut Order,
        payment: &mut Payment,
        payment_type: PaymentType,
    ) -> Result<PaymentResult> {
        if !order.status().allows(OrderAction::ProcessPayment) {
            warn!(status = %order.status(), "payment attempted in a status that forbids it");
            return Ok(PaymentResult::errored(
                format!("Order in status {} cannot receive payments", order.status()),
                payment.amount,
            ));
        }

        let result = self.dispatcher.dispatch(order, payment, payment_type).await;

        // The payment is stored first; `order` is replaced only once persisted.
        self.payments.add(payment).await?;

        match result.next_status.filter(|_| result.success) {
            Some(next) => {
                let mut updated = order.clone();
                match LifecycleMachine::transition(&mut updated, next, "Payment processed") {
                    Ok(transition) => {
                        updated.record_payment(payment.clone());
                        self.orders.update(&updated).await?;
                        *order = updated;
                        self.notifier
                            .publish_payment_processed(&PaymentProcessed::new(
                                order,
                                payment,
                                true,
                                Some(result.message.clone()),
                            ))
                            .await;
                        self.notifier
                            .publish_status_changed(&OrderStatusChanged::new(
                                order,
                                transition.previous,
                                Some(transition.reason),
                            ))
                            .await;
                        info!(transaction_id = ?result.transaction_id, "order paid");
                    }
                    Err(e) => {
                        warn!(error = %e, "payment approved but the order cannot move to {next}");
                    }
                }
            }
            None if result.success => {}
            None => {
                let mut updated = order.clone();
                updated.record_payment(payment.clone());
                self.orders.update(&updated).await?;
                *order = updated;
                self.notifier
                    .publish_payment_processed(&PaymentProcessed::new(
                        order,
                        payment,
                        false,
                        result.error_message.clone(),
                    ))
                    .await;
            }
        }

        Ok(result)
    }

    /// Cancels the order and publishes `OrderCancelled` with the refund owed.
    ///
    /// Fails without side effects if the order cannot be canceled.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    pub async fn cancel(&self, order: &mut Order, reason: &str) -> Result<OrderCancelled> {
        let started = Instant::now();

        LifecycleMachine::transition(order, OrderStatus::Canceled, reason)
            .inspect_err(|_| warn!(status = %order.status(), "order cannot be canceled"))?;

        self.orders.update(order).await?;
        let event = OrderCancelled::new(order, reason);
        self.notifier.publish_order_cancelled(&event).await;

        info!(refund = %event.refund_amount, "order canceled");
        metrics::counter!("orders_cancelled_total").increment(1);
        record_duration("cancel", started);
        Ok(event)
    }

    /// Builds an order from catalog products and creates it.
    #[tracing::instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn create_order(
        &self,
        customer_id: CustomerId,
        lines: Vec<OrderLine>,
    ) -> Result<(Order, ProcessingResult)> {
        if self.customers.get_by_id(customer_id).await?.is_none() {
            return Err(WorkflowError::CustomerNotFound(customer_id));
        }

        let mut items = Vec::with_capacity(lines.len());
        let mut errors = Vec::new();
        for line in lines {
            match self.products.get_by_id(&line.product_id).await? {
                Some(product) => match OrderItem::from_product(&product, line.quantity) {
                    Ok(item) => items.push(item),
                    Err(e) => errors.push(e.to_string()),
                },
                None => errors.push(format!("Product {} not found", line.product_id)),
            }
        }
        if !errors.is_empty() {
            return Err(WorkflowError::Validation {
                message: "Order validation failed".to_string(),
                errors,
            });
        }

        let order = Order::new(customer_id, items);
        let validation = self.create(&order).await?;
        Ok((order, validation))
    }

    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.orders
            .get_by_id(order_id)
            .await?
            .ok_or(WorkflowError::OrderNotFound(order_id))
    }

    /// Loads, finalizes and returns the order.
    pub async fn finalize_order(&self, order_id: OrderId, coupon: Option<&str>) -> Result<Order> {
        let mut order = self.get_order(order_id).await?;
        self.finalize(&mut order, coupon).await?;
        Ok(order)
    }

    /// Charges the order's current total.
    pub async fn make_payment(
        &self,
        order_id: OrderId,
        request: PaymentRequest,
    ) -> Result<PaymentResult> {
        let mut order = self.get_order(order_id).await?;

        let mut payment = Payment::new(order_id, order.total_amount(), request.payment_method_id)
            .with_installments(request.installments.unwrap_or(1));
        if let Some(card) = request.card_reference {
            payment = payment.with_card(card);
        }

        Ok(self.pay(&mut order, payment, request.payment_type).await)
    }

    /// Loads, cancels and returns the order.
    pub async fn cancel_order(&self, order_id: OrderId, reason: &str) -> Result<Order> {
        let mut order = self.get_order(order_id).await?;
        self.cancel(&mut order, reason).await?;
        Ok(order)
    }
}

fn record_duration(operation: &'static str, started: Instant) {
    metrics::histogram!("workflow_operation_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}
