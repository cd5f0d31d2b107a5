//! Domain error types.

use common::OrderStatus;
use store::{MAX_CART_QUANTITY, StoreError};
use thiserror::Error;

/// Errors that can occur during storefront operations.
///
/// Display strings are short and meant to be shown to shoppers as-is.
/// Storage details stay in the `source` of [`DomainError::StoreFailure`].
#[derive(Debug, Error)]
pub enum DomainError {
    /// No identity could be resolved for the request.
    #[error("Please sign in to {action}")]
    NotSignedIn { action: &'static str },

    /// The caller does not own the target row.
    #[error("You do not have access to this {entity}")]
    Unauthorized { entity: &'static str },

    /// Checkout was attempted with no items in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// The order status does not allow the requested change.
    #[error("Order cannot be {action} at this stage")]
    InvalidTransition {
        current: OrderStatus,
        action: &'static str,
    },

    /// A referenced row does not exist.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// A cart quantity outside the accepted range.
    #[error("Invalid quantity: {quantity} (must be between 1 and {max})", max = MAX_CART_QUANTITY)]
    InvalidQuantity { quantity: i64 },

    /// The underlying store failed.
    #[error("{message}")]
    StoreFailure {
        message: &'static str,
        #[source]
        source: StoreError,
    },
}

impl DomainError {
    /// Folds a store error into a generic, user-facing failure, logging the
    /// detail.
    pub fn store_failure(message: &'static str, source: StoreError) -> Self {
        tracing::error!(error = %source, "{message}");
        DomainError::StoreFailure { message, source }
    }
}

/// Converts store results into domain results.
pub(crate) trait StoreResultExt<T> {
    fn or_fail(self, message: &'static str) -> Result<T, DomainError>;
}

impl<T> StoreResultExt<T> for Result<T, StoreError> {
    fn or_fail(self, message: &'static str) -> Result<T, DomainError> {
        self.map_err(|e| match e {
            StoreError::QuantityLimit { quantity } => DomainError::InvalidQuantity {
                quantity: i64::try_from(quantity).unwrap_or(i64::MAX),
            },
            e => DomainError::store_failure(message, e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_user_facing() {
        assert_eq!(
            DomainError::NotSignedIn {
                action: "place an order"
            }
            .to_string(),
            "Please sign in to place an order"
        );
        assert_eq!(DomainError::EmptyCart.to_string(), "Cart is empty");
        assert_eq!(
            DomainError::InvalidTransition {
                current: OrderStatus::Completed,
                action: "cancelled"
            }
            .to_string(),
            "Order cannot be cancelled at this stage"
        );
        assert_eq!(
            DomainError::NotFound { entity: "Order" }.to_string(),
            "Order not found"
        );
    }

    #[test]
    fn quantity_limit_is_a_user_error() {
        let err: Result<(), DomainError> = Err(StoreError::QuantityLimit {
            quantity: u64::from(MAX_CART_QUANTITY) + 1,
        })
        .or_fail("Failed to update cart");

        let err = err.unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity { quantity: 10_001 }));
        assert_eq!(
            err.to_string(),
            "Invalid quantity: 10001 (must be between 1 and 10000)"
        );
    }

    #[test]
    fn store_failure_hides_storage_detail() {
        let err: Result<(), DomainError> = Err(StoreError::InvalidData(
            "relation \"cart_items\" does not exist".to_string(),
        ))
        .or_fail("Failed to update cart");

        let err = err.unwrap_err();
        assert_eq!(err.to_string(), "Failed to update cart");
        assert!(std::error::Error::source(&err).is_some());
    }
}
