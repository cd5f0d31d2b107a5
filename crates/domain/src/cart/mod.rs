//! Shopping cart: one merged line per (user, product, variant).

mod commands;
mod service;

pub use commands::{AddToCart, UpdateCartItem};
pub use service::CartService;
