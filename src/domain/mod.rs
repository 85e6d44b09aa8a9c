//! Domain module
pub mod cart;
pub mod events;
pub mod money;

pub use cart::{Cart, CartLine, CartStore, PgCartStore};
pub use events::OrderEvent;
pub use money::{IntField, PriceField};
