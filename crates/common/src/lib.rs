//! Types shared by every storefront crate.

pub mod money;
pub mod status;
pub mod types;

pub use money::Money;
pub use status::{OrderStatus, ParseStatusError, PaymentStatus};
pub use types::{CartItemId, CategoryId, OrderId, ProductId, UserId, VariantId};
