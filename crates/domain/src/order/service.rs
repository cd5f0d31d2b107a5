//! Order service providing checkout and order management for a signed-in
//! shopper.

use common::{OrderId, OrderStatus, UserId};
use store::{CartItem, CartLineDelta, Order, OrderDetails, Store, StoreError};

use crate::cart::CartService;
use crate::error::{DomainError, StoreResultExt};
use crate::identity::{RequestContext, optional_user, require_user};
use crate::pricing;

use super::PlaceOrder;

/// How many times checkout re-reads and re-prices a cart that changed
/// underneath it before giving up.
pub const MAX_CHECKOUT_ATTEMPTS: u32 = 3;

/// Service for placing and managing orders.
///
/// Shares the cart service so that checkout prices the same lines the
/// shopper sees and reorder merges through the same upsert as add.
#[derive(Clone)]
pub struct OrderService<S: Store> {
    cart: CartService<S>,
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service on top of a cart service.
    pub fn new(cart: CartService<S>) -> Self {
        Self { cart }
    }

    fn store(&self) -> &S {
        self.cart.store()
    }

    /// Turns the caller's cart into a pending order.
    ///
    /// Prices are frozen at this point. The order, its items and the removal
    /// of the priced cart lines are committed together; if the cart changes
    /// in between, the cart is re-read and re-priced.
    #[tracing::instrument(skip(self, ctx, cmd))]
    pub async fn place_order(
        &self,
        ctx: &RequestContext,
        cmd: PlaceOrder,
    ) -> Result<Order, DomainError> {
        let user_id = require_user(self.cart.identity(), ctx, "place an order").await?;

        for attempt in 1..=MAX_CHECKOUT_ATTEMPTS {
            let summary = pricing::price_cart(self.cart.lines_for(user_id).await?);
            if summary.is_empty() {
                return Err(DomainError::EmptyCart);
            }

            let snapshot = summary.snapshot();
            let new_order = summary.to_new_order(user_id, cmd.delivery_address.clone());

            match self.store().place_order(new_order, &snapshot).await {
                Ok(order) => {
                    metrics::counter!("orders_placed_total").increment(1);
                    metrics::histogram!("order_total_cents")
                        .record(order.total_amount.cents() as f64);
                    tracing::info!(
                        order_id = %order.id,
                        %user_id,
                        total = %order.total_amount,
                        items = snapshot.len(),
                        "order placed"
                    );
                    return Ok(order);
                }
                Err(StoreError::CartChanged { .. }) => {
                    metrics::counter!("checkout_conflicts_total").increment(1);
                    tracing::warn!(%user_id, attempt, "cart changed during checkout, retrying");
                }
                Err(e) => return Err(DomainError::store_failure("Failed to create order", e)),
            }
        }

        Err(DomainError::store_failure(
            "Failed to create order",
            StoreError::CartChanged { user_id },
        ))
    }

    /// Lists the caller's orders, newest first. Anonymous callers get none.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn list_orders(&self, ctx: &RequestContext) -> Result<Vec<OrderDetails>, DomainError> {
        let Some(user_id) = optional_user(self.cart.identity(), ctx).await else {
            return Ok(Vec::new());
        };

        self.store()
            .list_orders(user_id)
            .await
            .or_fail("Failed to load orders")
    }

    /// Loads one of the caller's orders.
    ///
    /// Returns None if there is no caller, the order does not exist, or it
    /// belongs to someone else.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn get_order(
        &self,
        ctx: &RequestContext,
        order_id: OrderId,
    ) -> Result<Option<OrderDetails>, DomainError> {
        let Some(user_id) = optional_user(self.cart.identity(), ctx).await else {
            return Ok(None);
        };

        let order = self
            .store()
            .get_order(order_id)
            .await
            .or_fail("Failed to load order")?;
        Ok(order.filter(|details| details.order.user_id == user_id))
    }

    /// Cancels a pending or confirmed order.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn cancel_order(
        &self,
        ctx: &RequestContext,
        order_id: OrderId,
    ) -> Result<Order, DomainError> {
        let user_id = require_user(self.cart.identity(), ctx, "cancel an order").await?;
        let mut current = self.owned_order(user_id, order_id).await?.order.status;

        // Statuses only move forward, so this settles within a few rounds.
        loop {
            if !current.can_cancel() {
                return Err(DomainError::InvalidTransition {
                    current,
                    action: "cancelled",
                });
            }

            match self
                .store()
                .update_order_status(order_id, current, OrderStatus::Cancelled)
                .await
            {
                Ok(order) => {
                    metrics::counter!("orders_cancelled_total").increment(1);
                    tracing::info!(%order_id, from = %current, "order cancelled");
                    return Ok(order);
                }
                Err(StoreError::StatusConflict { actual, .. }) => {
                    tracing::debug!(%order_id, expected = %current, %actual, "status changed concurrently");
                    current = actual;
                }
                Err(e) => return Err(DomainError::store_failure("Failed to cancel order", e)),
            }
        }
    }

    /// Puts the items of a past order back into the caller's cart.
    ///
    /// Quantities merge into existing lines and current prices apply.
    /// Items whose product or variant has since been removed from the
    /// catalog are skipped.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn reorder_items(
        &self,
        ctx: &RequestContext,
        order_id: OrderId,
    ) -> Result<Vec<CartItem>, DomainError> {
        let user_id = require_user(self.cart.identity(), ctx, "reorder").await?;
        let details = self.owned_order(user_id, order_id).await?;

        let mut deltas = Vec::with_capacity(details.order_items.len());
        for line in &details.order_items {
            let item = &line.item;
            if line.product.is_none() || (item.variant_id.is_some() && line.variant.is_none()) {
                tracing::warn!(
                    %order_id,
                    product_id = %item.product_id,
                    "skipping reorder line no longer in the catalog"
                );
                continue;
            }
            deltas.push(CartLineDelta::new(
                item.product_id,
                item.variant_id,
                item.quantity,
            ));
        }

        if deltas.is_empty() {
            return Ok(Vec::new());
        }

        self.cart.merge_lines(user_id, &deltas).await
    }

    async fn owned_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<OrderDetails, DomainError> {
        let details = self
            .store()
            .get_order(order_id)
            .await
            .or_fail("Failed to load order")?
            .ok_or(DomainError::NotFound { entity: "Order" })?;

        if details.order.user_id != user_id {
            return Err(DomainError::Unauthorized { entity: "order" });
        }
        Ok(details)
    }
}
