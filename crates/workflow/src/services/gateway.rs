//! Payment gateway trait, in-memory implementation and method directory.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{Money, Payment};

use super::{read, write};
use crate::error::WorkflowError;

/// Answer of a payment gateway to a charge request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    pub success: bool,
    pub transaction_id: Option<String>,
    pub raw_response: String,
    pub error_message: Option<String>,
}

/// Trait for charging a payment through an external processor.
///
/// `Err` means the gateway could not be reached or answered garbage; a
/// regular decline is an `Ok` response with `success == false`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn process(&self, payment: &Payment) -> Result<GatewayResponse, WorkflowError>;
}

#[derive(Debug, Default)]
struct GatewayState {
    charges: HashMap<String, Money>,
    next_id: u32,
    fail_on_charge: bool,
    unavailable: bool,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<GatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the gateway decline every charge.
    pub fn set_fail_on_charge(&self, fail: bool) {
        write(&self.state).fail_on_charge = fail;
    }

    /// Makes the gateway fault instead of answering.
    pub fn set_unavailable(&self, unavailable: bool) {
        write(&self.state).unavailable = unavailable;
    }

    /// Returns the number of approved charges.
    pub fn charge_count(&self) -> usize {
        read(&self.state).charges.len()
    }

    /// Returns the amount charged under a transaction ID.
    pub fn charged_amount(&self, transaction_id: &str) -> Option<Money> {
        read(&self.state).charges.get(transaction_id).copied()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn process(&self, payment: &Payment) -> Result<GatewayResponse, WorkflowError> {
        let mut state = write(&self.state);

        if state.unavailable {
            return Err(WorkflowError::Gateway("Gateway timed out".to_string()));
        }

        if state.fail_on_charge {
            return Ok(GatewayResponse {
                success: false,
                transaction_id: None,
                raw_response: "DECLINED".to_string(),
                error_message: Some("Payment declined by issuer".to_string()),
            });
        }

        state.next_id += 1;
        let transaction_id = format!("TXN-{:04}", state.next_id);
        state.charges.insert(transaction_id.clone(), payment.amount);

        Ok(GatewayResponse {
            success: true,
            raw_response: format!("APPROVED {transaction_id}"),
            transaction_id: Some(transaction_id),
            error_message: None,
        })
    }
}

/// Resolves the gateway responsible for a payment method.
#[derive(Clone, Default)]
pub struct PaymentGatewayDirectory {
    gateways: HashMap<u32, Arc<dyn PaymentGateway>>,
}

impl PaymentGatewayDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes a payment method to a gateway, replacing any previous route.
    pub fn register(&mut self, payment_method_id: u32, gateway: Arc<dyn PaymentGateway>) {
        self.gateways.insert(payment_method_id, gateway);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, payment_method_id: u32, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.register(payment_method_id, gateway);
        self
    }

    /// Returns the gateway for a payment method.
    pub fn resolve(&self, payment_method_id: u32) -> Result<Arc<dyn PaymentGateway>, WorkflowError> {
        self.gateways
            .get(&payment_method_id)
            .cloned()
            .ok_or_else(|| {
                WorkflowError::Gateway(format!(
                    "No gateway registered for payment method {payment_method_id}"
                ))
            })
    }

    /// Returns the registered payment method IDs, sorted.
    pub fn payment_methods(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.gateways.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for PaymentGatewayDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentGatewayDirectory")
            .field("payment_methods", &self.payment_methods())
            .finish()
    }
}
