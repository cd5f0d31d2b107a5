//! Cart service providing the cart operations for a signed-in shopper.

use common::{CartItemId, UserId};
use store::{CartItem, CartLine, CartLineDelta, MAX_CART_QUANTITY, Store};

use crate::error::{DomainError, StoreResultExt};
use crate::identity::{IdentityProvider, RequestContext, SharedIdentity, optional_user, require_user};
use crate::pricing::{self, CartSummary};

use super::{AddToCart, UpdateCartItem};

/// Service for managing a shopper's cart.
///
/// Every operation resolves the caller from the [`RequestContext`] first
/// and only touches rows owned by that caller.
#[derive(Clone)]
pub struct CartService<S: Store> {
    store: S,
    identity: SharedIdentity,
}

impl<S: Store> CartService<S> {
    /// Creates a new cart service.
    pub fn new(store: S, identity: SharedIdentity) -> Self {
        Self { store, identity }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    /// Adds a product to the cart, merging into an existing line for the
    /// same product and variant.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn add(&self, ctx: &RequestContext, cmd: AddToCart) -> Result<CartItem, DomainError> {
        let user_id = require_user(self.identity.as_ref(), ctx, "add items to cart").await?;

        check_quantity(cmd.quantity)?;

        self.store
            .get_product(cmd.product_id)
            .await
            .or_fail("Failed to add to cart")?
            .ok_or(DomainError::NotFound { entity: "Product" })?;

        if let Some(variant_id) = cmd.variant_id {
            let variant = self
                .store
                .get_variant(variant_id)
                .await
                .or_fail("Failed to add to cart")?;
            if variant.is_none_or(|v| v.product_id != cmd.product_id) {
                return Err(DomainError::NotFound { entity: "Variant" });
            }
        }

        let mut merged = self
            .merge_lines(
                user_id,
                &[CartLineDelta::new(cmd.product_id, cmd.variant_id, cmd.quantity)],
            )
            .await?;
        merged
            .pop()
            .ok_or_else(|| DomainError::NotFound { entity: "Cart item" })
    }

    /// Sets the quantity of a cart line; zero or less removes it.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn update_quantity(
        &self,
        ctx: &RequestContext,
        cmd: UpdateCartItem,
    ) -> Result<(), DomainError> {
        let user_id = require_user(self.identity.as_ref(), ctx, "update your cart").await?;

        if cmd.quantity <= 0 {
            return self.remove(ctx, cmd.cart_item_id).await;
        }

        let quantity = u32::try_from(cmd.quantity)
            .map_err(|_| DomainError::InvalidQuantity {
                quantity: cmd.quantity,
            })
            .and_then(check_quantity)?;

        let item = self
            .store
            .get_cart_item(cmd.cart_item_id)
            .await
            .or_fail("Failed to update cart")?
            .ok_or(DomainError::NotFound {
                entity: "Cart item",
            })?;
        if item.user_id != user_id {
            return Err(DomainError::Unauthorized {
                entity: "cart item",
            });
        }

        let updated = self
            .store
            .set_cart_item_quantity(user_id, cmd.cart_item_id, quantity)
            .await
            .or_fail("Failed to update cart")?;
        if !updated {
            // Removed between the ownership check and the update
            return Err(DomainError::NotFound {
                entity: "Cart item",
            });
        }

        Ok(())
    }

    /// Removes a cart line.
    ///
    /// Removing a line that does not exist, or belongs to someone else,
    /// succeeds without deleting anything: the line is absent either way.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn remove(
        &self,
        ctx: &RequestContext,
        cart_item_id: CartItemId,
    ) -> Result<(), DomainError> {
        let user_id = require_user(self.identity.as_ref(), ctx, "update your cart").await?;

        let deleted = self
            .store
            .delete_cart_item(user_id, cart_item_id)
            .await
            .or_fail("Failed to remove from cart")?;
        if !deleted {
            tracing::debug!(%cart_item_id, "cart item already absent");
        }

        Ok(())
    }

    /// Lists the caller's cart, newest first. Anonymous callers get an
    /// empty cart.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<CartLine>, DomainError> {
        match optional_user(self.identity.as_ref(), ctx).await {
            Some(user_id) => self.lines_for(user_id).await,
            None => Ok(Vec::new()),
        }
    }

    /// Lists and prices the caller's cart.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn summary(&self, ctx: &RequestContext) -> Result<CartSummary, DomainError> {
        Ok(pricing::price_cart(self.list(ctx).await?))
    }

    /// Empties the caller's cart. Returns the number of lines removed.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn clear(&self, ctx: &RequestContext) -> Result<u64, DomainError> {
        let user_id = require_user(self.identity.as_ref(), ctx, "update your cart").await?;

        self.store
            .clear_cart(user_id)
            .await
            .or_fail("Failed to clear cart")
    }

    pub(crate) async fn lines_for(&self, user_id: UserId) -> Result<Vec<CartLine>, DomainError> {
        self.store
            .list_cart_lines(user_id)
            .await
            .or_fail("Failed to load cart")
    }

    /// Merges quantities into the user's cart.
    ///
    /// Shared by adding to the cart and reordering, so both follow the same
    /// find-or-increment rule.
    pub(crate) async fn merge_lines(
        &self,
        user_id: UserId,
        lines: &[CartLineDelta],
    ) -> Result<Vec<CartItem>, DomainError> {
        for line in lines {
            check_quantity(line.quantity)?;
        }

        let merged = self
            .store
            .upsert_cart_lines(user_id, lines)
            .await
            .or_fail("Failed to update cart")?;

        metrics::counter!("cart_lines_upserted_total").increment(merged.len() as u64);
        tracing::debug!(%user_id, lines = merged.len(), "cart lines merged");
        Ok(merged)
    }
}

/// Rejects quantities outside `1..=MAX_CART_QUANTITY`.
fn check_quantity(quantity: u32) -> Result<u32, DomainError> {
    if quantity == 0 || quantity > MAX_CART_QUANTITY {
        return Err(DomainError::InvalidQuantity {
            quantity: i64::from(quantity),
        });
    }
    Ok(quantity)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use common::{Money, ProductId};
    use store::{InMemoryStore, Product, ProductVariant};

    use super::*;
    use crate::identity::SessionIdentity;

    async fn setup() -> (CartService<InMemoryStore>, RequestContext, Product) {
        let store = InMemoryStore::new();
        let product = Product::new("Coffee", Money::from_dollars(12));
        store.insert_product(product.clone()).await.unwrap();
        let token = store
            .create_session(UserId::new(), Duration::from_secs(60))
            .await
            .unwrap();
        let identity = Arc::new(SessionIdentity::new(store.clone()));
        let service = CartService::new(store, identity);
        (service, RequestContext::with_session(token), product)
    }

    #[tokio::test]
    async fn add_twice_merges_into_one_line() {
        let (service, ctx, product) = setup().await;

        service
            .add(&ctx, AddToCart::new(product.id, None, 2))
            .await
            .unwrap();
        let item = service
            .add(&ctx, AddToCart::new(product.id, None, 3))
            .await
            .unwrap();

        assert_eq!(item.quantity, 5);
        let lines = service.list(&ctx).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].item.quantity, 5);
    }

    #[tokio::test]
    async fn add_rejects_zero_quantity() {
        let (service, ctx, product) = setup().await;
        let result = service.add(&ctx, AddToCart::new(product.id, None, 0)).await;
        assert!(matches!(result, Err(DomainError::InvalidQuantity { .. })));
    }

    #[tokio::test]
    async fn add_rejects_quantity_above_limit() {
        let (service, ctx, product) = setup().await;

        let result = service
            .add(&ctx, AddToCart::new(product.id, None, 3_000_000_000))
            .await;

        assert!(matches!(
            result,
            Err(DomainError::InvalidQuantity {
                quantity: 3_000_000_000
            })
        ));
        assert!(service.list(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn merging_past_limit_leaves_line_unchanged() {
        let (service, ctx, product) = setup().await;
        service
            .add(&ctx, AddToCart::new(product.id, None, MAX_CART_QUANTITY))
            .await
            .unwrap();

        let result = service.add(&ctx, AddToCart::one(product.id)).await;

        assert!(matches!(result, Err(DomainError::InvalidQuantity { .. })));
        let lines = service.list(&ctx).await.unwrap();
        assert_eq!(lines[0].item.quantity, MAX_CART_QUANTITY);
    }

    #[tokio::test]
    async fn update_rejects_quantity_above_limit() {
        let (service, ctx, product) = setup().await;
        let item = service.add(&ctx, AddToCart::one(product.id)).await.unwrap();

        for quantity in [i64::from(MAX_CART_QUANTITY) + 1, i64::MAX] {
            let result = service
                .update_quantity(&ctx, UpdateCartItem::new(item.id, quantity))
                .await;
            assert!(matches!(result, Err(DomainError::InvalidQuantity { .. })));
        }
        assert_eq!(service.list(&ctx).await.unwrap()[0].item.quantity, 1);
    }

    #[tokio::test]
    async fn summary_of_full_lines_counts_every_unit() {
        let (service, ctx, coffee) = setup().await;
        let muffin = Product::new("Muffin", Money::from_dollars(4));
        service.store().insert_product(muffin.clone()).await.unwrap();
        for id in [coffee.id, muffin.id] {
            service
                .add(&ctx, AddToCart::new(id, None, MAX_CART_QUANTITY))
                .await
                .unwrap();
        }

        let summary = service.summary(&ctx).await.unwrap();

        assert_eq!(summary.item_count, 2 * u64::from(MAX_CART_QUANTITY));
        assert_eq!(summary.total, Money::from_dollars(16 * 10_000));
    }

    #[tokio::test]
    async fn add_rejects_unknown_product_and_foreign_variant() {
        let (service, ctx, product) = setup().await;

        let unknown = service.add(&ctx, AddToCart::one(ProductId::new())).await;
        assert!(matches!(
            unknown,
            Err(DomainError::NotFound { entity: "Product" })
        ));

        let tea = Product::new("Tea", Money::from_cents(300));
        let large_tea = ProductVariant::new(tea.id, "Large", Money::from_cents(50));
        service.store().insert_product(tea).await.unwrap();
        service.store().insert_variant(large_tea.clone()).await.unwrap();

        let mismatched = service
            .add(&ctx, AddToCart::new(product.id, Some(large_tea.id), 1))
            .await;
        assert!(matches!(
            mismatched,
            Err(DomainError::NotFound { entity: "Variant" })
        ));
    }

    #[tokio::test]
    async fn anonymous_caller_cannot_add_but_sees_empty_cart() {
        let (service, _, product) = setup().await;
        let anonymous = RequestContext::anonymous();

        let result = service.add(&anonymous, AddToCart::one(product.id)).await;
        assert!(matches!(result, Err(DomainError::NotSignedIn { .. })));
        assert!(service.list(&anonymous).await.unwrap().is_empty());
        assert!(matches!(
            service.clear(&anonymous).await,
            Err(DomainError::NotSignedIn { .. })
        ));
    }

    #[tokio::test]
    async fn update_to_zero_removes_the_line() {
        let (service, ctx, product) = setup().await;
        let item = service.add(&ctx, AddToCart::one(product.id)).await.unwrap();

        service
            .update_quantity(&ctx, UpdateCartItem::new(item.id, 0))
            .await
            .unwrap();

        assert!(service.list(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_sets_quantity() {
        let (service, ctx, product) = setup().await;
        let item = service.add(&ctx, AddToCart::one(product.id)).await.unwrap();

        service
            .update_quantity(&ctx, UpdateCartItem::new(item.id, 7))
            .await
            .unwrap();

        let lines = service.list(&ctx).await.unwrap();
        assert_eq!(lines[0].item.quantity, 7);
    }

    #[tokio::test]
    async fn update_of_missing_item_is_not_found() {
        let (service, ctx, _) = setup().await;
        let result = service
            .update_quantity(&ctx, UpdateCartItem::new(CartItemId::new(), 2))
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (service, ctx, product) = setup().await;
        let item = service.add(&ctx, AddToCart::one(product.id)).await.unwrap();

        service.remove(&ctx, item.id).await.unwrap();
        service.remove(&ctx, item.id).await.unwrap();

        assert!(service.list(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn summary_prices_the_cart() {
        let (service, ctx, product) = setup().await;
        service
            .add(&ctx, AddToCart::new(product.id, None, 2))
            .await
            .unwrap();

        let summary = service.summary(&ctx).await.unwrap();
        assert_eq!(summary.total, Money::from_dollars(24));
        assert_eq!(summary.item_count, 2);
    }
}
