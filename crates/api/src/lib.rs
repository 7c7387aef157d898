//! HTTP API server with observability for the order-processing engine.
//!
//! Exposes the order workflow (create, finalize, pay, cancel) as REST
//! endpoints, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use chrono::NaiveDate;
use domain::{Customer, CustomerId, Money, Product, ProductCategory};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;
use workflow::{
    AuditLogSubscriber, Collaborators, EmailNotificationSubscriber, EventNotifier,
    InMemoryAccountingService, InMemoryAuditLog, InMemoryCustomerRepository, InMemoryEmailSender,
    InMemoryInventoryService, InMemoryOrderRepository, InMemoryPaymentGateway,
    InMemoryPaymentRepository, InMemoryProductRepository, InventoryUpdateSubscriber,
    OrderWorkflowService, PaymentGatewayDirectory, SystemClock,
};

use config::Config;
use routes::orders::AppState;

/// Payment method routed to the in-memory card gateway.
pub const CARD_PAYMENT_METHOD: u32 = 1;

/// Customer seeded by [`seed_demo_catalog`].
pub const DEMO_CUSTOMER_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0001);

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create))
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/finalize", post(routes::orders::finalize))
        .route("/orders/{id}/payments", post(routes::orders::pay))
        .route("/orders/{id}/cancel", post(routes::orders::cancel))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state with in-memory collaborators and
/// the email, audit and inventory subscribers.
pub fn create_default_state(config: &Config) -> Arc<AppState> {
    let customers = InMemoryCustomerRepository::new();
    let products = InMemoryProductRepository::new();

    let notifier = Arc::new(EventNotifier::new());
    notifier.subscribe(Arc::new(EmailNotificationSubscriber::new(
        Arc::new(InMemoryEmailSender::new()),
        Arc::new(customers.clone()),
    )));
    notifier.subscribe(Arc::new(AuditLogSubscriber::new(Arc::new(
        InMemoryAuditLog::new(),
    ))));
    notifier.subscribe(Arc::new(InventoryUpdateSubscriber::new(Arc::new(
        InMemoryInventoryService::new(),
    ))));

    let gateways = PaymentGatewayDirectory::new()
        .with(CARD_PAYMENT_METHOD, Arc::new(InMemoryPaymentGateway::new()));

    let workflow = OrderWorkflowService::new(
        Collaborators {
            customers: Arc::new(customers.clone()),
            products: Arc::new(products.clone()),
            orders: Arc::new(InMemoryOrderRepository::new()),
            payments: Arc::new(InMemoryPaymentRepository::new()),
            gateways: Arc::new(gateways),
            accounting: Arc::new(InMemoryAccountingService::new()),
            notifier,
            clock: Arc::new(SystemClock),
        },
        config.discount_config(),
    );

    Arc::new(AppState {
        workflow,
        customers,
        products,
    })
}

/// Loads a small catalog and one returning customer.
pub fn seed_demo_catalog(state: &AppState) {
    for (sku, name, dollars, stock, category) in [
        ("SKU-LAPTOP", "Laptop", 1_200, 10, ProductCategory::Electronics),
        ("SKU-HEADPHONES", "Headphones", 150, 3, ProductCategory::Electronics),
        ("SKU-TSHIRT", "T-Shirt", 20, 200, ProductCategory::Clothing),
        ("SKU-NOVEL", "Novel", 15, 50, ProductCategory::Books),
        ("SKU-LAMP", "Desk Lamp", 45, 25, ProductCategory::Home),
        ("SKU-BALL", "Football", 30, 40, ProductCategory::Sports),
    ] {
        state.products.insert(Product::new(
            sku,
            name,
            Money::from_dollars(dollars),
            stock,
            category,
        ));
    }

    state.customers.insert(Customer {
        id: CustomerId::from_uuid(DEMO_CUSTOMER_ID),
        name: "Demo Customer".to_string(),
        email: "demo@example.com".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1990, 1, 15).unwrap_or_default(),
        is_first_purchase: false,
        average_order_value: Some(Money::from_dollars(200)),
    });
}
