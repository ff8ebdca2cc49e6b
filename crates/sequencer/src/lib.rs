//! Ordered, receipt-gated execution of contract deployments and calls.

pub mod error;
pub mod result;
pub mod sequencer;
pub mod step;

pub use error::*;
pub use result::*;
pub use sequencer::*;
pub use step::*;
