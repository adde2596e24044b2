// storefront/src/models/mod.rs

//! Rows of the pricing/inventory store and the order ledger, plus the
//! untrusted cart payload a browser submits at checkout.

pub mod cart_item;
pub mod order;
pub mod order_item;
pub mod requester;
pub mod variant;

pub use cart_item::CartItem;
pub use order::{NewOrder, Order, OrderStatus};
pub use order_item::{NewOrderItem, OrderItem};
pub use requester::Requester;
pub use variant::Variant;
