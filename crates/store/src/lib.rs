//! Storage layer for the storefront.
//!
//! The [`Store`] trait is the only seam between the workflow code and the
//! database. Every cart and order row is scoped by its owning user; writes
//! that touch more than one row run in a single transaction.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::{CartItemId, CategoryId, Money, OrderId, OrderStatus, PaymentStatus, ProductId, UserId, VariantId};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use model::{
    CartItem, CartLine, CartLineDelta, CartSnapshotEntry, Category, MAX_CART_QUANTITY, NewOrder,
    NewOrderItem, Order, OrderDetails, OrderItem, OrderLine, Product, ProductDetails,
    ProductVariant, check_cart_quantity,
};
pub use postgres::PostgresStore;
pub use query::{ProductQuery, ProductSort};
pub use store::{Store, StoreExt};
