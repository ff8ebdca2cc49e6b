pub mod chain;
pub mod mock;
pub mod web3_client;

pub use chain::*;
pub use mock::{MockChain, MockEvent};
pub use web3_client::*;
