//! Fee-split ERC-20 payment relay library.
//!
//! Accepts a payment request over HTTP, splits the gross amount into a
//! recipient share and a fee share, and broadcasts the two token transfers
//! from a single custodial wallet with consecutive nonces.

pub mod blockchain;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod payments;

pub use config::schema::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
