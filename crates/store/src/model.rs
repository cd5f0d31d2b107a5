//! Row types for the storefront tables and their joined views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    CartItemId, CategoryId, Money, OrderId, OrderStatus, PaymentStatus, ProductId, UserId,
    VariantId,
};

/// Largest quantity a single cart line may hold, after merging.
pub const MAX_CART_QUANTITY: u32 = 10_000;

/// Checks a quantity against `1..=MAX_CART_QUANTITY`.
pub fn check_cart_quantity(quantity: u32) -> crate::Result<u32> {
    if quantity == 0 {
        return Err(crate::StoreError::InvalidData(
            "cart quantity must be at least 1".to_string(),
        ));
    }
    if quantity > MAX_CART_QUANTITY {
        return Err(crate::StoreError::QuantityLimit {
            quantity: u64::from(quantity),
        });
    }
    Ok(quantity)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: CategoryId::new(),
            name: name.into(),
            description: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A catalog product. Read-only from the cart and order workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub image_url: Option<String>,
    pub category_id: Option<CategoryId>,
    pub in_stock: bool,
    pub featured: bool,
    /// Average rating, 0 to 5.
    pub rating: f64,
    pub review_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates an in-stock, unfeatured, unrated product.
    pub fn new(name: impl Into<String>, price: Money) -> Self {
        let now = Utc::now();
        Self {
            id: ProductId::new(),
            name: name.into(),
            description: None,
            price,
            image_url: None,
            category_id: None,
            in_stock: true,
            featured: false,
            rating: 0.0,
            review_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn in_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub name: String,
    /// Added to the product's base price; may be negative.
    pub price_modifier: Money,
    pub created_at: DateTime<Utc>,
}

impl ProductVariant {
    pub fn new(product_id: ProductId, name: impl Into<String>, price_modifier: Money) -> Self {
        Self {
            id: VariantId::new(),
            product_id,
            name: name.into(),
            price_modifier,
            created_at: Utc::now(),
        }
    }
}

/// A product joined with its category and variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetails {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<Category>,
    pub variants: Vec<ProductVariant>,
}

/// One line in a shopper's cart.
///
/// At most one row exists per (user, product, variant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    /// Returns true if this row holds the given (product, variant) pair.
    pub fn holds(&self, product_id: ProductId, variant_id: Option<VariantId>) -> bool {
        self.product_id == product_id && self.variant_id == variant_id
    }
}

/// A cart row joined with the product (and its category) and the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub item: CartItem,
    pub product: Product,
    pub category: Option<Category>,
    pub variant: Option<ProductVariant>,
}

/// A quantity to merge into a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLineDelta {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
}

impl CartLineDelta {
    pub fn new(product_id: ProductId, variant_id: Option<VariantId>, quantity: u32) -> Self {
        Self {
            product_id,
            variant_id,
            quantity,
        }
    }
}

/// The cart row state an order was priced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CartSnapshotEntry {
    pub cart_item_id: CartItemId,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    /// Frozen at creation; never recomputed from live prices.
    pub total_amount: Money,
    /// Stored as-is; its shape belongs to the presentation layer.
    pub delivery_address: serde_json::Value,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order line. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: uuid::Uuid,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
}

/// An order item joined with whatever catalog rows still exist for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(flatten)]
    pub item: OrderItem,
    pub product: Option<Product>,
    pub category: Option<Category>,
    pub variant: Option<ProductVariant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub order_items: Vec<OrderLine>,
}

/// An order ready to be written together with its items.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub id: OrderId,
    pub user_id: UserId,
    pub total_amount: Money,
    pub delivery_address: serde_json::Value,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
}
