use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    CartItem, CartItemId, CartLine, CartLineDelta, CartSnapshotEntry, Category, Money, NewOrder,
    Order, OrderDetails, OrderId, OrderItem, OrderLine, OrderStatus, PaymentStatus, Product,
    ProductDetails, ProductId, ProductQuery, ProductVariant, Result, StoreError, UserId,
    VariantId, check_cart_quantity,
    store::{Store, new_session_token, session_expiry, snapshot_matches},
};

#[derive(Debug, Clone)]
struct Session {
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

/// All tables behind one lock, so every write is a transaction.
#[derive(Debug, Default)]
struct Tables {
    categories: Vec<Category>,
    products: HashMap<ProductId, Product>,
    variants: Vec<ProductVariant>,
    cart_items: Vec<CartItem>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    sessions: HashMap<String, Session>,
}

impl Tables {
    fn category(&self, product: &Product) -> Option<Category> {
        let category_id = product.category_id?;
        self.categories.iter().find(|c| c.id == category_id).cloned()
    }

    fn variant(&self, variant_id: Option<VariantId>) -> Option<ProductVariant> {
        let variant_id = variant_id?;
        self.variants.iter().find(|v| v.id == variant_id).cloned()
    }

    fn product_details(&self, product: &Product) -> ProductDetails {
        ProductDetails {
            product: product.clone(),
            category: self.category(product),
            variants: self
                .variants
                .iter()
                .filter(|v| v.product_id == product.id)
                .cloned()
                .collect(),
        }
    }

    fn order_details(&self, order: &Order) -> OrderDetails {
        let order_items = self
            .order_items
            .iter()
            .filter(|item| item.order_id == order.id)
            .map(|item| {
                let product = self.products.get(&item.product_id).cloned();
                OrderLine {
                    item: item.clone(),
                    category: product.as_ref().and_then(|p| self.category(p)),
                    product,
                    variant: self.variant(item.variant_id),
                }
            })
            .collect();

        OrderDetails {
            order: order.clone(),
            order_items,
        }
    }

    fn cart_snapshot(&self, user_id: UserId) -> Vec<CartSnapshotEntry> {
        self.cart_items
            .iter()
            .filter(|item| item.user_id == user_id)
            .map(|item| CartSnapshotEntry {
                cart_item_id: item.id,
                quantity: item.quantity,
            })
            .collect()
    }

    fn check_line(&self, line: &CartLineDelta) -> Result<()> {
        check_cart_quantity(line.quantity)?;
        if !self.products.contains_key(&line.product_id) {
            return Err(StoreError::MissingReference {
                table: "products",
                id: line.product_id.to_string(),
            });
        }
        if let Some(variant_id) = line.variant_id
            && self.variant(Some(variant_id)).is_none()
        {
            return Err(StoreError::MissingReference {
                table: "product_variants",
                id: variant_id.to_string(),
            });
        }
        Ok(())
    }
}

/// In-memory store implementation for testing and local development.
///
/// This implementation keeps every table in memory and provides the same
/// interface and guarantees as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Returns the total number of cart rows across all users.
    pub async fn cart_row_count(&self) -> usize {
        self.tables.read().await.cart_items.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_session(&self, user_id: UserId, ttl: Duration) -> Result<String> {
        let expires_at = session_expiry(ttl)?;
        let token = new_session_token();
        self.tables.write().await.sessions.insert(
            token.clone(),
            Session {
                user_id,
                expires_at,
            },
        );
        Ok(token)
    }

    async fn resolve_session(&self, token: &str) -> Result<Option<UserId>> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .get(token)
            .filter(|session| session.expires_at > Utc::now())
            .map(|session| session.user_id))
    }

    async fn revoke_session(&self, token: &str) -> Result<()> {
        self.tables.write().await.sessions.remove(token);
        Ok(())
    }

    async fn insert_category(&self, category: Category) -> Result<()> {
        self.tables.write().await.categories.push(category);
        Ok(())
    }

    async fn insert_product(&self, product: Product) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(category_id) = product.category_id
            && !tables.categories.iter().any(|c| c.id == category_id)
        {
            return Err(StoreError::MissingReference {
                table: "categories",
                id: category_id.to_string(),
            });
        }
        tables.products.insert(product.id, product);
        Ok(())
    }

    async fn insert_variant(&self, variant: ProductVariant) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&variant.product_id) {
            return Err(StoreError::MissingReference {
                table: "products",
                id: variant.product_id.to_string(),
            });
        }
        tables.variants.push(variant);
        Ok(())
    }

    async fn update_product_price(&self, product_id: ProductId, price: Money) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.products.get_mut(&product_id) {
            Some(product) => {
                product.price = price;
                product.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let tables = self.tables.read().await;
        let mut categories = tables.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let tables = self.tables.read().await;
        let name = name.to_lowercase();
        Ok(tables
            .categories
            .iter()
            .find(|c| c.name.to_lowercase() == name)
            .cloned())
    }

    async fn query_products(&self, query: &ProductQuery) -> Result<Vec<ProductDetails>> {
        let tables = self.tables.read().await;
        let mut products: Vec<&Product> = tables
            .products
            .values()
            .filter(|p| query.matches(p))
            .collect();

        products.sort_by(|a, b| query.sort.compare(a, b).then(a.id.cmp(&b.id)));

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(products
            .into_iter()
            .take(limit)
            .map(|p| tables.product_details(p))
            .collect())
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<ProductDetails>> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .get(&product_id)
            .map(|p| tables.product_details(p)))
    }

    async fn get_variant(&self, variant_id: VariantId) -> Result<Option<ProductVariant>> {
        Ok(self.tables.read().await.variant(Some(variant_id)))
    }

    async fn upsert_cart_lines(
        &self,
        user_id: UserId,
        lines: &[CartLineDelta],
    ) -> Result<Vec<CartItem>> {
        let mut tables = self.tables.write().await;

        // Validate everything before touching any row
        for line in lines {
            tables.check_line(line)?;
        }

        // Merge into a copy so a line over the limit leaves the cart untouched
        let mut cart_items = tables.cart_items.clone();
        let mut merged = Vec::with_capacity(lines.len());
        for line in lines {
            let now = Utc::now();
            let existing = cart_items
                .iter_mut()
                .find(|item| item.user_id == user_id && item.holds(line.product_id, line.variant_id));

            let item = match existing {
                Some(item) => {
                    let quantity = item.quantity.checked_add(line.quantity).ok_or(
                        StoreError::QuantityLimit {
                            quantity: u64::from(item.quantity) + u64::from(line.quantity),
                        },
                    )?;
                    item.quantity = check_cart_quantity(quantity)?;
                    item.updated_at = now;
                    item.clone()
                }
                None => {
                    let item = CartItem {
                        id: CartItemId::new(),
                        user_id,
                        product_id: line.product_id,
                        variant_id: line.variant_id,
                        quantity: line.quantity,
                        created_at: now,
                        updated_at: now,
                    };
                    cart_items.push(item.clone());
                    item
                }
            };
            merged.push(item);
        }

        tables.cart_items = cart_items;
        Ok(merged)
    }

    async fn get_cart_item(&self, cart_item_id: CartItemId) -> Result<Option<CartItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .cart_items
            .iter()
            .find(|item| item.id == cart_item_id)
            .cloned())
    }

    async fn set_cart_item_quantity(
        &self,
        user_id: UserId,
        cart_item_id: CartItemId,
        quantity: u32,
    ) -> Result<bool> {
        check_cart_quantity(quantity)?;
        let mut tables = self.tables.write().await;
        match tables
            .cart_items
            .iter_mut()
            .find(|item| item.id == cart_item_id && item.user_id == user_id)
        {
            Some(item) => {
                item.quantity = quantity;
                item.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_cart_item(&self, user_id: UserId, cart_item_id: CartItemId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.cart_items.len();
        tables
            .cart_items
            .retain(|item| !(item.id == cart_item_id && item.user_id == user_id));
        Ok(tables.cart_items.len() < before)
    }

    async fn list_cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>> {
        let tables = self.tables.read().await;
        let mut lines: Vec<CartLine> = tables
            .cart_items
            .iter()
            .rev()
            .filter(|item| item.user_id == user_id)
            .filter_map(|item| {
                let product = tables.products.get(&item.product_id)?.clone();
                Some(CartLine {
                    item: item.clone(),
                    category: tables.category(&product),
                    product,
                    variant: tables.variant(item.variant_id),
                })
            })
            .collect();

        lines.sort_by(|a, b| b.item.created_at.cmp(&a.item.created_at));
        Ok(lines)
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.cart_items.len();
        tables.cart_items.retain(|item| item.user_id != user_id);
        Ok((before - tables.cart_items.len()) as u64)
    }

    async fn place_order(&self, order: NewOrder, snapshot: &[CartSnapshotEntry]) -> Result<Order> {
        let mut tables = self.tables.write().await;

        if !snapshot_matches(&tables.cart_snapshot(order.user_id), snapshot) {
            return Err(StoreError::CartChanged {
                user_id: order.user_id,
            });
        }

        let now = Utc::now();
        let created = Order {
            id: order.id,
            user_id: order.user_id,
            status: OrderStatus::Pending,
            total_amount: order.total_amount,
            delivery_address: order.delivery_address,
            payment_status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let items = order.items.into_iter().map(|item| OrderItem {
            id: uuid::Uuid::new_v4(),
            order_id: created.id,
            product_id: item.product_id,
            variant_id: item.variant_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price,
            created_at: now,
        });
        tables.order_items.extend(items);
        tables.orders.push(created.clone());

        tables.cart_items.retain(|item| {
            !snapshot
                .iter()
                .any(|entry| entry.cart_item_id == item.id)
        });

        Ok(created)
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderDetails>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .iter()
            .find(|order| order.id == order_id)
            .map(|order| tables.order_details(order)))
    }

    async fn list_orders(&self, user_id: UserId) -> Result<Vec<OrderDetails>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<OrderDetails> = tables
            .orders
            .iter()
            .rev()
            .filter(|order| order.user_id == user_id)
            .map(|order| tables.order_details(order))
            .collect();

        orders.sort_by(|a, b| b.order.created_at.cmp(&a.order.created_at));
        Ok(orders)
    }

    async fn update_order_status(
        &self,
        order_id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .iter_mut()
            .find(|order| order.id == order_id)
            .ok_or_else(|| StoreError::RowNotFound {
                table: "orders",
                id: order_id.to_string(),
            })?;

        if order.status != expected {
            return Err(StoreError::StatusConflict {
                order_id,
                expected,
                actual: order.status,
            });
        }

        order.status = next;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}
