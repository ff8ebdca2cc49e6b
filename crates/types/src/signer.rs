use web3::signing::{Key, SecretKey, SecretKeyRef};
use web3::types::Address;

use crate::to_checksum_address;

/// An account able to authorize transactions.
///
/// `Local` keys sign client side and submit raw transactions, which is how
/// remote networks are reached. `Node` accounts are unlocked on the node
/// itself (hardhat, anvil) and are submitted through `eth_sendTransaction`.
#[derive(Clone)]
pub enum Signer {
    Local { address: Address, key: SecretKey },
    Node(Address),
}

impl Signer {
    pub fn local(key: SecretKey) -> Self {
        let address = SecretKeyRef::new(&key).address();
        Signer::Local { address, key }
    }

    pub fn node(address: Address) -> Self {
        Signer::Node(address)
    }

    pub fn address(&self) -> Address {
        match self {
            Signer::Local { address, .. } => *address,
            Signer::Node(address) => *address,
        }
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signer::Local { address, .. } => f
                .debug_struct("Local")
                .field("address", address)
                .finish_non_exhaustive(),
            Signer::Node(address) => f.debug_tuple("Node").field(address).finish(),
        }
    }
}

impl std::fmt::Display for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", to_checksum_address(&self.address()))
    }
}
