//! Split payment execution.
//!
//! # Data Flow
//! ```text
//! types.rs (PaymentRequest, validation)
//!     → split.rs (decimal → token units, fee floor)
//!     → processor.rs (endpoint, nonce, sign, broadcast under the sender lock)
//!     → types.rs (PaymentOutcome per leg)
//! ```

pub mod processor;
pub mod split;
pub mod types;

pub use processor::PaymentProcessor;
pub use split::{split, DecimalAmount, SplitResult};
pub use types::{AmountInput, ErrorBody, PaymentError, PaymentOutcome, PaymentRequest, PaymentStatus};
