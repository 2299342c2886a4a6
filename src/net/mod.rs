//! Network layer subsystem.
//!
//! TLS is optional and handled transparently by `axum-server`; plain
//! listeners are bound directly in `main`.

pub mod tls;
