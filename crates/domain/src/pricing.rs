//! Cart pricing.
//!
//! This is the only place prices are derived. Cart display and checkout both
//! go through [`price_cart`], so the total a shopper sees is the total that
//! gets frozen into the order.

use common::{Money, UserId};
use serde::Serialize;
use store::{
    CartLine, CartSnapshotEntry, NewOrder, NewOrderItem, OrderId, Product, ProductVariant,
};

/// Base price plus the variant's modifier.
pub fn unit_price(product: &Product, variant: Option<&ProductVariant>) -> Money {
    product.price + variant.map_or(Money::zero(), |v| v.price_modifier)
}

/// Unit price times quantity.
pub fn line_total(unit_price: Money, quantity: u32) -> Money {
    unit_price.multiply(quantity)
}

/// A cart line with its derived prices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedLine {
    #[serde(flatten)]
    pub line: CartLine,
    pub unit_price: Money,
    pub line_total: Money,
}

/// A priced cart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartSummary {
    pub lines: Vec<PricedLine>,
    /// Sum of quantities over all lines.
    pub item_count: u64,
    pub total: Money,
}

impl CartSummary {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The cart rows this summary was priced from.
    pub fn snapshot(&self) -> Vec<CartSnapshotEntry> {
        self.lines
            .iter()
            .map(|priced| CartSnapshotEntry {
                cart_item_id: priced.line.item.id,
                quantity: priced.line.item.quantity,
            })
            .collect()
    }

    /// Freezes this summary into an order for `user_id`.
    pub fn to_new_order(&self, user_id: UserId, delivery_address: serde_json::Value) -> NewOrder {
        NewOrder {
            id: OrderId::new(),
            user_id,
            total_amount: self.total,
            delivery_address,
            items: self
                .lines
                .iter()
                .map(|priced| NewOrderItem {
                    product_id: priced.line.item.product_id,
                    variant_id: priced.line.item.variant_id,
                    quantity: priced.line.item.quantity,
                    unit_price: priced.unit_price,
                    total_price: priced.line_total,
                })
                .collect(),
        }
    }
}

/// Prices every line of a cart against the catalog rows joined into it.
pub fn price_cart(lines: Vec<CartLine>) -> CartSummary {
    let lines: Vec<PricedLine> = lines
        .into_iter()
        .map(|line| {
            let unit_price = unit_price(&line.product, line.variant.as_ref());
            let line_total = line_total(unit_price, line.item.quantity);
            PricedLine {
                line,
                unit_price,
                line_total,
            }
        })
        .collect();

    CartSummary {
        item_count: lines
            .iter()
            .map(|priced| u64::from(priced.line.item.quantity))
            .sum(),
        total: lines.iter().map(|priced| priced.line_total).sum(),
        lines,
    }
}
