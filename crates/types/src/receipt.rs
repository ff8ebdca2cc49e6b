use web3::types::{Address, H256, U256};

use crate::to_checksum_address;

/// Confirmation record of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: H256,
    pub block_number: u64,
    pub block_hash: Option<H256>,
    pub gas_used: Option<U256>,
    pub contract_address: Option<Address>,
    pub success: bool,
}

impl std::fmt::Display for Receipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tx {:?} in block {}", self.transaction_hash, self.block_number)?;
        if let Some(hash) = self.block_hash {
            write!(f, " ({hash:?})")?;
        }
        if let Some(gas) = self.gas_used {
            write!(f, ", gas used {gas}")?;
        }
        if let Some(address) = self.contract_address {
            write!(f, ", created {}", to_checksum_address(&address))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSummary {
    pub number: u64,
    pub hash: Option<H256>,
}

/// Execution parameters attached to a transaction request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxOptions {
    /// Gas ceiling. Estimated by the node when absent.
    pub gas: Option<U256>,
    pub value: Option<U256>,
}

impl TxOptions {
    pub fn with_gas_limit(gas: u64) -> Self {
        Self {
            gas: Some(U256::from(gas)),
            value: None,
        }
    }
}
