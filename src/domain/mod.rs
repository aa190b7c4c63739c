//! Domain model: cart, location cascade, checkout flow, orders.

pub mod cart;
pub mod cascade;
pub mod checkout;
pub mod order;

pub use cart::{Cart, CartLine};
pub use cascade::{Cascade, Level, Place, SubdistrictCandidate};
pub use checkout::{CheckoutError, CheckoutSession, ContactForm, Stage};
pub use order::{OrderDraft, OrderItemDraft, OrderStatus};
