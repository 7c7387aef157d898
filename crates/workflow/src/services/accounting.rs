//! Accounting system registration.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use domain::{AccountingResult, Order, OrderId};

use super::{read, write};
use crate::error::WorkflowError;

/// Registers finalized sales with the ledger.
#[async_trait]
pub trait AccountingService: Send + Sync {
    async fn register_sale(&self, order: &Order) -> Result<AccountingResult, WorkflowError>;
}

#[derive(Debug, Default)]
struct AccountingState {
    registered: Vec<(OrderId, String)>,
    next_document: u32,
    reject_sales: bool,
    unavailable: bool,
}

/// In-memory ledger that hands out sequential document numbers.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountingService {
    state: Arc<RwLock<AccountingState>>,
}

impl InMemoryAccountingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the ledger answer every registration with a failure result.
    pub fn set_reject_sales(&self, reject: bool) {
        write(&self.state).reject_sales = reject;
    }

    /// Makes the ledger fault instead of answering.
    pub fn set_unavailable(&self, unavailable: bool) {
        write(&self.state).unavailable = unavailable;
    }

    /// Returns the number of registered sales.
    pub fn registered_count(&self) -> usize {
        read(&self.state).registered.len()
    }
}

#[async_trait]
impl AccountingService for InMemoryAccountingService {
    async fn register_sale(&self, order: &Order) -> Result<AccountingResult, WorkflowError> {
        let mut state = write(&self.state);

        if state.unavailable {
            return Err(WorkflowError::Accounting("Ledger unavailable".to_string()));
        }

        if state.reject_sales {
            return Ok(AccountingResult {
                success: false,
                document_number: None,
                accounting_date: None,
                message: Some("Sale rejected by ledger".to_string()),
            });
        }

        state.next_document += 1;
        let document_number = format!("DOC-{:06}", state.next_document);
        state.registered.push((order.id(), document_number.clone()));

        Ok(AccountingResult {
            success: true,
            document_number: Some(document_number),
            accounting_date: Some(Utc::now()),
            message: None,
        })
    }
}
