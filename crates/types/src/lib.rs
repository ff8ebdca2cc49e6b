pub mod address;
pub mod artifact;
pub mod bytes32;
pub mod display;
pub mod receipt;
pub mod signer;
pub mod units;

pub use address::*;
pub use artifact::*;
pub use bytes32::*;
pub use display::*;
pub use receipt::*;
pub use signer::*;
pub use units::*;

pub use web3::ethabi::Token;
pub use web3::types::{Address, H256, U256};
