use thiserror::Error;

use crate::{MAX_CART_QUANTITY, OrderId, OrderStatus, UserId};

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The cart changed between pricing and checkout.
    #[error("Cart for user {user_id} changed during checkout")]
    CartChanged { user_id: UserId },

    /// A compare-and-set status update found a different status.
    #[error("Order {order_id} status conflict: expected {expected}, found {actual}")]
    StatusConflict {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// A cart line would hold more than [`MAX_CART_QUANTITY`] units.
    #[error("Cart quantity {quantity} exceeds the limit of {max}", max = MAX_CART_QUANTITY)]
    QuantityLimit { quantity: u64 },

    /// A row referenced by id does not exist.
    #[error("{table} row not found: {id}")]
    RowNotFound { table: &'static str, id: String },

    /// A write referenced a row that does not exist.
    #[error("Missing {table} reference: {id}")]
    MissingReference { table: &'static str, id: String },

    /// A stored value could not be converted to its domain type.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
