use std::time::Duration;

use async_trait::async_trait;

use crate::{
    CartItem, CartItemId, CartLine, CartLineDelta, CartSnapshotEntry, Category, Money, NewOrder, Order,
    OrderDetails, OrderId, OrderStatus, Product, ProductDetails, ProductId, ProductQuery,
    ProductVariant, Result, UserId, VariantId,
};

/// Core trait for storefront storage backends.
///
/// Cart and order mutations take the owning user id and only ever touch
/// rows owned by that user. All implementations must be thread-safe
/// (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    // -- Sessions --

    /// Issues a session token for a user, valid for `ttl`.
    async fn create_session(&self, user_id: UserId, ttl: Duration) -> Result<String>;

    /// Resolves an unexpired session token to its user.
    async fn resolve_session(&self, token: &str) -> Result<Option<UserId>>;

    /// Deletes a session. Unknown tokens are ignored.
    async fn revoke_session(&self, token: &str) -> Result<()>;

    // -- Catalog --

    async fn insert_category(&self, category: Category) -> Result<()>;

    async fn insert_product(&self, product: Product) -> Result<()>;

    async fn insert_variant(&self, variant: ProductVariant) -> Result<()>;

    /// Changes a product's live price. Returns false if the product is unknown.
    async fn update_product_price(&self, product_id: ProductId, price: Money) -> Result<bool>;

    /// Lists all categories ordered by name.
    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Finds a category by case-insensitive name.
    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// Retrieves products matching a query, with category and variants.
    async fn query_products(&self, query: &ProductQuery) -> Result<Vec<ProductDetails>>;

    async fn get_product(&self, product_id: ProductId) -> Result<Option<ProductDetails>>;

    async fn get_variant(&self, variant_id: VariantId) -> Result<Option<ProductVariant>>;

    // -- Cart --

    /// Merges quantities into the user's cart.
    ///
    /// For each delta, increments the existing row for (user, product,
    /// variant) or inserts a new one. All deltas are applied atomically.
    /// Returns the resulting rows in delta order.
    async fn upsert_cart_lines(
        &self,
        user_id: UserId,
        lines: &[CartLineDelta],
    ) -> Result<Vec<CartItem>>;

    /// Retrieves a cart row by id regardless of owner.
    async fn get_cart_item(&self, cart_item_id: CartItemId) -> Result<Option<CartItem>>;

    /// Sets the quantity of a row owned by the user. Returns false if no
    /// such row exists.
    async fn set_cart_item_quantity(
        &self,
        user_id: UserId,
        cart_item_id: CartItemId,
        quantity: u32,
    ) -> Result<bool>;

    /// Deletes a row owned by the user. Returns false if nothing was deleted.
    async fn delete_cart_item(&self, user_id: UserId, cart_item_id: CartItemId) -> Result<bool>;

    /// Lists the user's cart joined with product, category and variant,
    /// newest first.
    async fn list_cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>>;

    /// Deletes every cart row of the user. Returns the number deleted.
    async fn clear_cart(&self, user_id: UserId) -> Result<u64>;

    // -- Orders --

    /// Writes an order and its items and removes the cart rows it was
    /// priced from, in one transaction.
    ///
    /// Fails with `CartChanged` (writing nothing) if the user's cart rows no
    /// longer match `snapshot` exactly.
    async fn place_order(&self, order: NewOrder, snapshot: &[CartSnapshotEntry]) -> Result<Order>;

    /// Retrieves an order with its items regardless of owner.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderDetails>>;

    /// Lists the user's orders with items, newest first.
    async fn list_orders(&self, user_id: UserId) -> Result<Vec<OrderDetails>>;

    /// Moves an order from `expected` to `next`.
    ///
    /// Fails with `StatusConflict` if the stored status is not `expected`,
    /// and with `RowNotFound` if the order does not exist.
    async fn update_order_status(
        &self,
        order_id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order>;
}

/// Extension trait providing convenience methods for stores.
#[async_trait]
pub trait StoreExt: Store {
    /// Merges a single quantity into the user's cart.
    async fn upsert_cart_line(&self, user_id: UserId, line: CartLineDelta) -> Result<CartItem> {
        let mut items = self.upsert_cart_lines(user_id, &[line]).await?;
        items.pop().ok_or_else(|| {
            crate::StoreError::InvalidData("upsert returned no cart row".to_string())
        })
    }

    /// Lists the raw cart rows of a user, newest first.
    async fn cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>> {
        Ok(self
            .list_cart_lines(user_id)
            .await?
            .into_iter()
            .map(|line| line.item)
            .collect())
    }
}

// Blanket implementation for all Store implementations
impl<T: Store + ?Sized> StoreExt for T {}

/// Generates an opaque session token.
pub(crate) fn new_session_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Converts a session lifetime to an absolute expiry.
pub(crate) fn session_expiry(ttl: Duration) -> Result<chrono::DateTime<chrono::Utc>> {
    let ttl = chrono::Duration::from_std(ttl)
        .map_err(|e| crate::StoreError::InvalidData(format!("session ttl: {e}")))?;
    Ok(chrono::Utc::now() + ttl)
}

/// Returns true if `rows` holds exactly the cart state in `snapshot`.
pub fn snapshot_matches(rows: &[CartSnapshotEntry], snapshot: &[CartSnapshotEntry]) -> bool {
    let mut rows = rows.to_vec();
    let mut snapshot = snapshot.to_vec();
    rows.sort();
    snapshot.sort();
    rows == snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_comparison_ignores_order() {
        let a = CartSnapshotEntry {
            cart_item_id: CartItemId::new(),
            quantity: 2,
        };
        let b = CartSnapshotEntry {
            cart_item_id: CartItemId::new(),
            quantity: 1,
        };
        assert!(snapshot_matches(&[a, b], &[b, a]));
        assert!(!snapshot_matches(&[a], &[a, b]));

        let bumped = CartSnapshotEntry { quantity: 3, ..a };
        assert!(!snapshot_matches(&[bumped, b], &[a, b]));
    }
}
