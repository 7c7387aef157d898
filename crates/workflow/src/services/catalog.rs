//! Customer and product lookups.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{Customer, CustomerId, Product, ProductId};

use super::{read, write};
use crate::error::WorkflowError;

/// Read access to the customer directory.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, WorkflowError>;
}

/// Read access to the product catalog.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn get_by_id(&self, id: &ProductId) -> Result<Option<Product>, WorkflowError>;
}

#[derive(Debug, Default)]
struct CustomerState {
    customers: HashMap<CustomerId, Customer>,
    fail_on_lookup: bool,
}

/// In-memory customer directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCustomerRepository {
    state: Arc<RwLock<CustomerState>>,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a customer.
    pub fn insert(&self, customer: Customer) {
        write(&self.state).customers.insert(customer.id, customer);
    }

    /// Makes every lookup fail.
    pub fn set_fail_on_lookup(&self, fail: bool) {
        write(&self.state).fail_on_lookup = fail;
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, WorkflowError> {
        let state = read(&self.state);
        if state.fail_on_lookup {
            return Err(WorkflowError::Repository(
                "Customer directory unavailable".to_string(),
            ));
        }
        Ok(state.customers.get(&id).cloned())
    }
}

#[derive(Debug, Default)]
struct ProductState {
    products: HashMap<ProductId, Product>,
    fail_on_lookup: bool,
}

/// In-memory product catalog.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductRepository {
    state: Arc<RwLock<ProductState>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a product.
    pub fn insert(&self, product: Product) {
        write(&self.state)
            .products
            .insert(product.id.clone(), product);
    }

    /// Makes every lookup fail.
    pub fn set_fail_on_lookup(&self, fail: bool) {
        write(&self.state).fail_on_lookup = fail;
    }

    /// Returns the number of products in the catalog.
    pub fn product_count(&self) -> usize {
        read(&self.state).products.len()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn get_by_id(&self, id: &ProductId) -> Result<Option<Product>, WorkflowError> {
        let state = read(&self.state);
        if state.fail_on_lookup {
            return Err(WorkflowError::Repository(
                "Product catalog unavailable".to_string(),
            ));
        }
        Ok(state.products.get(id).cloned())
    }
}
