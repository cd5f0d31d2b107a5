//! Storefront workflows.
//!
//! This crate holds the rules of the storefront, independent of how it is
//! served:
//! - Identity lookup through an explicit [`RequestContext`]
//! - Cart management with merge-on-add semantics
//! - A single pricing function shared by cart display and checkout
//! - Order placement, cancellation and reorder
//! - Catalog reads

pub mod cart;
pub mod catalog;
pub mod error;
pub mod identity;
pub mod order;
pub mod pricing;

pub use cart::{AddToCart, CartService, UpdateCartItem};
pub use catalog::{CatalogService, PriceRange, ProductFilter};
pub use error::DomainError;
pub use identity::{IdentityProvider, RequestContext, SessionIdentity, SharedIdentity};
pub use order::{MAX_CHECKOUT_ATTEMPTS, OrderService, PlaceOrder};
pub use pricing::{CartSummary, PricedLine, line_total, price_cart, unit_price};
