//! Order workflow: checkout, order history, cancellation and reorder.

mod commands;
mod service;

pub use commands::PlaceOrder;
pub use service::{MAX_CHECKOUT_ATTEMPTS, OrderService};
