//! Kopi Storefront
//!
//! Backend for a single-brand coffee storefront: product catalog, session
//! carts, and a multi-step checkout that quotes Indonesian courier rates and
//! collects payment through a hosted invoice page.
//!
//! ## Layout
//! - [`domain`] — cart, location cascade, and checkout state machines
//! - [`shipping`] — rate-provider client and quote normalization
//! - [`payment`] — invoice-provider client
//! - [`api`] — the axum HTTP surface

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod payment;
pub mod shipping;
