//! Cart commands.

use common::{CartItemId, ProductId, VariantId};
use serde::Deserialize;

fn one() -> u32 {
    1
}

/// Command to add a product (optionally a specific variant) to the cart.
#[derive(Debug, Clone, Deserialize)]
pub struct AddToCart {
    pub product_id: ProductId,

    #[serde(default)]
    pub variant_id: Option<VariantId>,

    /// Quantity to add; merged into an existing line if there is one.
    #[serde(default = "one")]
    pub quantity: u32,
}

impl AddToCart {
    /// Creates a new AddToCart command.
    pub fn new(product_id: ProductId, variant_id: Option<VariantId>, quantity: u32) -> Self {
        Self {
            product_id,
            variant_id,
            quantity,
        }
    }

    /// Adds a single unit of a product with no variant.
    pub fn one(product_id: ProductId) -> Self {
        Self::new(product_id, None, 1)
    }
}

/// Command to set the quantity of a cart line.
///
/// A quantity of zero or less removes the line.
#[derive(Debug, Clone)]
pub struct UpdateCartItem {
    pub cart_item_id: CartItemId,
    pub quantity: i64,
}

impl UpdateCartItem {
    /// Creates a new UpdateCartItem command.
    pub fn new(cart_item_id: CartItemId, quantity: i64) -> Self {
        Self {
            cart_item_id,
            quantity,
        }
    }
}
