//! Identifier types shared by the domain, workflow and API layers.

mod types;

pub use types::{CustomerId, EventId, OrderId, PaymentId, ProductId};
