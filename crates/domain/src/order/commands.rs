//! Order commands.

use serde::Deserialize;

/// Command to turn the caller's cart into an order.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrder {
    /// Stored with the order as-is; its shape is up to the storefront.
    pub delivery_address: serde_json::Value,
}

impl PlaceOrder {
    /// Creates a new PlaceOrder command.
    pub fn new(delivery_address: serde_json::Value) -> Self {
        Self { delivery_address }
    }
}
