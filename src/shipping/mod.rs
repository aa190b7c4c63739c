//! Shipping-rate integration: provider client, quote normalization, and the
//! per-carrier rate resolver.

pub mod client;
pub mod normalize;
pub mod resolver;
mod retry;

pub use client::{RateClient, ShippingError};
pub use normalize::ShippingOption;
pub use resolver::resolve_rates;
