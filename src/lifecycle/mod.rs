//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting → in-flight payments finish → exit
//! ```
//!
//! # Design Decisions
//! - A payment whose legs are signed always finishes broadcasting, even
//!   while the server is draining
//! - There is no reload signal; configuration is fixed for the process

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
