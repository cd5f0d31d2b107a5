use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    CartItem, CartItemId, CartLine, CartLineDelta, CartSnapshotEntry, Category, CategoryId, Money,
    NewOrder, Order, OrderDetails, OrderId, OrderItem, OrderLine, OrderStatus, PaymentStatus,
    Product, ProductDetails, ProductId, ProductQuery, ProductVariant, Result, StoreError, UserId,
    MAX_CART_QUANTITY, VariantId, check_cart_quantity,
    store::{Store, new_session_token, session_expiry, snapshot_matches},
};

const CATEGORY_COLUMNS: &str = "id, name, description, image_url, created_at, updated_at";
const PRODUCT_COLUMNS: &str = "id, name, description, price_cents, image_url, category_id, in_stock, featured, rating, review_count, created_at, updated_at";
const VARIANT_COLUMNS: &str = "id, product_id, name, price_modifier_cents, created_at";
const CART_COLUMNS: &str = "id, user_id, product_id, variant_id, quantity, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, user_id, status, total_amount_cents, delivery_address, payment_status, created_at, updated_at";
const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, variant_id, quantity, unit_price_cents, total_price_cents, created_at";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool whose connection acquisition gives up after
    /// `acquire_timeout`.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("storefront migrations applied");
        Ok(())
    }

    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<ProductId, Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row_to_product(row).map(|p| (p.id, p)))
            .collect()
    }

    async fn categories_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<CategoryId, Category>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row_to_category(row).map(|c| (c.id, c)))
            .collect()
    }

    async fn variants_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<VariantId, ProductVariant>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query(&format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variants WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row_to_variant(row).map(|v| (v.id, v)))
            .collect()
    }

    /// Joins products with their categories and variants.
    async fn attach_details(&self, products: Vec<Product>) -> Result<Vec<ProductDetails>> {
        let product_ids: Vec<Uuid> = products.iter().map(|p| p.id.as_uuid()).collect();
        let category_ids: Vec<Uuid> = products
            .iter()
            .filter_map(|p| p.category_id.map(|c| c.as_uuid()))
            .collect();
        let categories = self.categories_by_ids(&category_ids).await?;

        let rows = sqlx::query(&format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variants WHERE product_id = ANY($1) ORDER BY created_at ASC, id ASC"
        ))
        .bind(&product_ids)
        .fetch_all(&self.pool)
        .await?;
        let mut variants: HashMap<ProductId, Vec<ProductVariant>> = HashMap::new();
        for row in &rows {
            let variant = row_to_variant(row)?;
            variants.entry(variant.product_id).or_default().push(variant);
        }

        Ok(products
            .into_iter()
            .map(|product| ProductDetails {
                category: product
                    .category_id
                    .and_then(|id| categories.get(&id).cloned()),
                variants: variants.remove(&product.id).unwrap_or_default(),
                product,
            })
            .collect())
    }

    /// Joins orders with their items and the catalog rows still present.
    async fn attach_items(&self, orders: Vec<Order>) -> Result<Vec<OrderDetails>> {
        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id.as_uuid()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY created_at ASC, id ASC"
        ))
        .bind(&order_ids)
        .fetch_all(&self.pool)
        .await?;
        let items: Vec<OrderItem> = rows.iter().map(row_to_order_item).collect::<Result<_>>()?;

        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id.as_uuid()).collect();
        let variant_ids: Vec<Uuid> = items
            .iter()
            .filter_map(|i| i.variant_id.map(|v| v.as_uuid()))
            .collect();
        let products = self.products_by_ids(&product_ids).await?;
        let category_ids: Vec<Uuid> = products
            .values()
            .filter_map(|p| p.category_id.map(|c| c.as_uuid()))
            .collect();
        let categories = self.categories_by_ids(&category_ids).await?;
        let variants = self.variants_by_ids(&variant_ids).await?;

        let mut lines: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for item in items {
            let product = products.get(&item.product_id).cloned();
            let line = OrderLine {
                category: product
                    .as_ref()
                    .and_then(|p| p.category_id)
                    .and_then(|id| categories.get(&id).cloned()),
                product,
                variant: item.variant_id.and_then(|id| variants.get(&id).cloned()),
                item,
            };
            lines.entry(line.item.order_id).or_default().push(line);
        }

        Ok(orders
            .into_iter()
            .map(|order| OrderDetails {
                order_items: lines.remove(&order.id).unwrap_or_default(),
                order,
            })
            .collect())
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn create_session(&self, user_id: UserId, ttl: Duration) -> Result<String> {
        let expires_at = session_expiry(ttl)?;
        let token = new_session_token();

        sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&token)
            .bind(user_id.as_uuid())
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        Ok(token)
    }

    async fn resolve_session(&self, token: &str) -> Result<Option<UserId>> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM sessions WHERE token = $1 AND expires_at > NOW()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user_id.map(UserId::from_uuid))
    }

    async fn revoke_session(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_category(&self, category: Category) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, image_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.image_url)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_product(&self, product: Product) -> Result<()> {
        let review_count = i32::try_from(product.review_count)
            .map_err(|_| StoreError::InvalidData("review_count out of range".to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price_cents, image_url, category_id,
                                  in_stock, featured, rating, review_count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(&product.image_url)
        .bind(product.category_id.map(|c| c.as_uuid()))
        .bind(product.in_stock)
        .bind(product.featured)
        .bind(product.rating)
        .bind(review_count)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_variant(&self, variant: ProductVariant) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO product_variants (id, product_id, name, price_modifier_cents, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(variant.id.as_uuid())
        .bind(variant.product_id.as_uuid())
        .bind(&variant.name)
        .bind(variant.price_modifier.cents())
        .bind(variant.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_product_price(&self, product_id: ProductId, price: Money) -> Result<bool> {
        let result =
            sqlx::query("UPDATE products SET price_cents = $2, updated_at = NOW() WHERE id = $1")
                .bind(product_id.as_uuid())
                .bind(price.cents())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_category).collect()
    }

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let row = sqlx::query(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE LOWER(name) = LOWER($1) LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_category).transpose()
    }

    async fn query_products(&self, query: &ProductQuery) -> Result<Vec<ProductDetails>> {
        let mut sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.in_stock_only {
            sql.push_str(" AND in_stock = TRUE");
        }
        if query.category_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND category_id = ${param_count}"));
        }
        if query.search.is_some() {
            param_count += 1;
            sql.push_str(&format!(
                " AND (name ILIKE ${param_count} OR description ILIKE ${param_count})"
            ));
        }
        if query.min_price.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND price_cents >= ${param_count}"));
        }
        if query.max_price.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND price_cents <= ${param_count}"));
        }
        if query.min_rating.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND rating >= ${param_count}"));
        }
        if query.featured.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND featured = ${param_count}"));
        }

        sql.push_str(&format!(" ORDER BY {}, id ASC", query.sort.order_by()));

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(category_id) = query.category_id {
            sqlx_query = sqlx_query.bind(category_id.as_uuid());
        }
        if let Some(ref term) = query.search {
            sqlx_query = sqlx_query.bind(format!("%{}%", escape_like(term)));
        }
        if let Some(min_price) = query.min_price {
            sqlx_query = sqlx_query.bind(min_price.cents());
        }
        if let Some(max_price) = query.max_price {
            sqlx_query = sqlx_query.bind(max_price.cents());
        }
        if let Some(min_rating) = query.min_rating {
            sqlx_query = sqlx_query.bind(min_rating);
        }
        if let Some(featured) = query.featured {
            sqlx_query = sqlx_query.bind(featured);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        let products = rows.iter().map(row_to_product).collect::<Result<Vec<_>>>()?;
        self.attach_details(products).await
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<ProductDetails>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let product = row_to_product(&row)?;
                Ok(self.attach_details(vec![product]).await?.pop())
            }
            None => Ok(None),
        }
    }

    async fn get_variant(&self, variant_id: VariantId) -> Result<Option<ProductVariant>> {
        let row = sqlx::query(&format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variants WHERE id = $1"
        ))
        .bind(variant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_variant).transpose()
    }

    async fn upsert_cart_lines(
        &self,
        user_id: UserId,
        lines: &[CartLineDelta],
    ) -> Result<Vec<CartItem>> {
        let mut tx = self.pool.begin().await?;
        let mut merged = Vec::with_capacity(lines.len());

        for line in lines {
            check_cart_quantity(line.quantity)?;

            // The unique index on (user, product, variant) turns a second add
            // of the same line into an increment.
            let row = sqlx::query(&format!(
                r#"
                INSERT INTO cart_items (id, user_id, product_id, variant_id, quantity, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
                ON CONFLICT (user_id, product_id, (COALESCE(variant_id, '00000000-0000-0000-0000-000000000000'::uuid)))
                DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, updated_at = NOW()
                RETURNING {CART_COLUMNS}
                "#
            ))
            .bind(CartItemId::new().as_uuid())
            .bind(user_id.as_uuid())
            .bind(line.product_id.as_uuid())
            .bind(line.variant_id.map(|v| v.as_uuid()))
            .bind(quantity_to_db(line.quantity)?)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_foreign_key_violation()
                {
                    return StoreError::MissingReference {
                        table: "products",
                        id: line.product_id.to_string(),
                    };
                }
                StoreError::Database(e)
            })?;

            // Dropping the transaction rolls back every line merged so far
            let item = row_to_cart_item(&row)?;
            if item.quantity > MAX_CART_QUANTITY {
                tracing::debug!(%user_id, quantity = item.quantity, "cart merge over the quantity limit");
                return Err(StoreError::QuantityLimit {
                    quantity: u64::from(item.quantity),
                });
            }
            merged.push(item);
        }

        tx.commit().await?;
        Ok(merged)
    }

    async fn get_cart_item(&self, cart_item_id: CartItemId) -> Result<Option<CartItem>> {
        let row = sqlx::query(&format!("SELECT {CART_COLUMNS} FROM cart_items WHERE id = $1"))
            .bind(cart_item_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_cart_item).transpose()
    }

    async fn set_cart_item_quantity(
        &self,
        user_id: UserId,
        cart_item_id: CartItemId,
        quantity: u32,
    ) -> Result<bool> {
        check_cart_quantity(quantity)?;
        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $3, updated_at = NOW() WHERE id = $1 AND user_id = $2",
        )
        .bind(cart_item_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(quantity_to_db(quantity)?)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_cart_item(&self, user_id: UserId, cart_item_id: CartItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(cart_item_id.as_uuid())
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>> {
        let rows = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        let items: Vec<CartItem> = rows.iter().map(row_to_cart_item).collect::<Result<_>>()?;

        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id.as_uuid()).collect();
        let variant_ids: Vec<Uuid> = items
            .iter()
            .filter_map(|i| i.variant_id.map(|v| v.as_uuid()))
            .collect();
        let products = self.products_by_ids(&product_ids).await?;
        let category_ids: Vec<Uuid> = products
            .values()
            .filter_map(|p| p.category_id.map(|c| c.as_uuid()))
            .collect();
        let categories = self.categories_by_ids(&category_ids).await?;
        let variants = self.variants_by_ids(&variant_ids).await?;

        Ok(items
            .into_iter()
            .filter_map(|item| {
                let product = products.get(&item.product_id)?.clone();
                Some(CartLine {
                    category: product
                        .category_id
                        .and_then(|id| categories.get(&id).cloned()),
                    variant: item.variant_id.and_then(|id| variants.get(&id).cloned()),
                    product,
                    item,
                })
            })
            .collect())
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn place_order(&self, order: NewOrder, snapshot: &[CartSnapshotEntry]) -> Result<Order> {
        // Start a transaction
        let mut tx = self.pool.begin().await?;

        // Lock the cart rows so a concurrent checkout waits for this one
        let rows = sqlx::query("SELECT id, quantity FROM cart_items WHERE user_id = $1 FOR UPDATE")
            .bind(order.user_id.as_uuid())
            .fetch_all(&mut *tx)
            .await?;
        let current = rows
            .iter()
            .map(|row| -> Result<CartSnapshotEntry> {
                Ok(CartSnapshotEntry {
                    cart_item_id: CartItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
                    quantity: quantity_from_db(row.try_get("quantity")?)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if !snapshot_matches(&current, snapshot) {
            tracing::debug!(
                user_id = %order.user_id,
                rows = current.len(),
                priced = snapshot.len(),
                "cart rows differ from the priced snapshot"
            );
            return Err(StoreError::CartChanged {
                user_id: order.user_id,
            });
        }

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO orders (id, user_id, status, total_amount_cents, delivery_address, payment_status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(OrderStatus::Pending.as_str())
        .bind(order.total_amount.cents())
        .bind(&order.delivery_address)
        .bind(PaymentStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let created = row_to_order(&row)?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, variant_id, quantity,
                                         unit_price_cents, total_price_cents, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(created.id.as_uuid())
            .bind(item.product_id.as_uuid())
            .bind(item.variant_id.map(|v| v.as_uuid()))
            .bind(quantity_to_db(item.quantity)?)
            .bind(item.unit_price.cents())
            .bind(item.total_price.cents())
            .bind(created.created_at)
            .execute(&mut *tx)
            .await?;
        }

        let consumed: Vec<Uuid> = snapshot.iter().map(|e| e.cart_item_id.as_uuid()).collect();
        sqlx::query("DELETE FROM cart_items WHERE id = ANY($1)")
            .bind(&consumed)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderDetails>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let order = row_to_order(&row)?;
                Ok(self.attach_items(vec![order]).await?.pop())
            }
            None => Ok(None),
        }
    }

    async fn list_orders(&self, user_id: UserId) -> Result<Vec<OrderDetails>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let orders = rows.iter().map(row_to_order).collect::<Result<Vec<_>>>()?;
        self.attach_items(orders).await
    }

    async fn update_order_status(
        &self,
        order_id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Order> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order_id.as_uuid())
        .bind(expected.as_str())
        .bind(next.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return row_to_order(&row);
        }

        let actual: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match actual {
            Some(actual) => Err(StoreError::StatusConflict {
                order_id,
                expected,
                actual: parse_status(&actual)?,
            }),
            None => Err(StoreError::RowNotFound {
                table: "orders",
                id: order_id.to_string(),
            }),
        }
    }
}

fn quantity_to_db(quantity: u32) -> Result<i32> {
    i32::try_from(quantity).map_err(|_| StoreError::QuantityLimit {
        quantity: u64::from(quantity),
    })
}

fn quantity_from_db(quantity: i32) -> Result<u32> {
    u32::try_from(quantity)
        .map_err(|_| StoreError::InvalidData(format!("stored quantity {quantity} is negative")))
}

fn parse_status(value: &str) -> Result<OrderStatus> {
    value
        .parse()
        .map_err(|e: common::ParseStatusError| StoreError::InvalidData(e.to_string()))
}

/// Escapes `%`, `_` and `\` for use inside an ILIKE pattern.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn row_to_category(row: &PgRow) -> Result<Category> {
    Ok(Category {
        id: CategoryId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        image_url: row.try_get("image_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    let review_count: i32 = row.try_get("review_count")?;
    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        image_url: row.try_get("image_url")?,
        category_id: row
            .try_get::<Option<Uuid>, _>("category_id")?
            .map(CategoryId::from_uuid),
        in_stock: row.try_get("in_stock")?,
        featured: row.try_get("featured")?,
        rating: row.try_get("rating")?,
        review_count: u32::try_from(review_count)
            .map_err(|_| StoreError::InvalidData(format!("review_count {review_count}")))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_variant(row: &PgRow) -> Result<ProductVariant> {
    Ok(ProductVariant {
        id: VariantId::from_uuid(row.try_get::<Uuid, _>("id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        name: row.try_get("name")?,
        price_modifier: Money::from_cents(row.try_get("price_modifier_cents")?),
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_cart_item(row: &PgRow) -> Result<CartItem> {
    Ok(CartItem {
        id: CartItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        variant_id: row
            .try_get::<Option<Uuid>, _>("variant_id")?
            .map(VariantId::from_uuid),
        quantity: quantity_from_db(row.try_get("quantity")?)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order(row: &PgRow) -> Result<Order> {
    let payment_status: String = row.try_get("payment_status")?;
    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        status: parse_status(&row.try_get::<String, _>("status")?)?,
        total_amount: Money::from_cents(row.try_get("total_amount_cents")?),
        delivery_address: row.try_get("delivery_address")?,
        payment_status: payment_status
            .parse()
            .map_err(|e: common::ParseStatusError| StoreError::InvalidData(e.to_string()))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order_item(row: &PgRow) -> Result<OrderItem> {
    Ok(OrderItem {
        id: row.try_get("id")?,
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        variant_id: row
            .try_get::<Option<Uuid>, _>("variant_id")?
            .map(VariantId::from_uuid),
        quantity: quantity_from_db(row.try_get("quantity")?)?,
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        total_price: Money::from_cents(row.try_get("total_price_cents")?),
        created_at: row.try_get("created_at")?,
    })
}
