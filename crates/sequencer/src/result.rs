use ballot_types::{
    render_tokens, to_checksum_address, BlockSummary, ContractHandle, Receipt, ValueFormat,
};
use web3::ethabi::Token;
use web3::types::{Address, U256};

#[derive(Debug, Clone)]
pub enum StepOutcome {
    Deployed {
        contract: ContractHandle,
        receipt: Receipt,
    },
    Confirmed {
        receipt: Receipt,
    },
    Values(Vec<Token>),
    Block(BlockSummary),
    Balance(U256),
}

impl StepOutcome {
    pub fn contract(&self) -> Option<&ContractHandle> {
        match self {
            StepOutcome::Deployed { contract, .. } => Some(contract),
            _ => None,
        }
    }

    pub fn address(&self) -> Option<Address> {
        self.contract().map(ContractHandle::address)
    }

    pub fn receipt(&self) -> Option<&Receipt> {
        match self {
            StepOutcome::Deployed { receipt, .. } | StepOutcome::Confirmed { receipt } => {
                Some(receipt)
            }
            _ => None,
        }
    }

    /// Inclusion block of a transaction step, or the block a block step read.
    pub fn block_number(&self) -> Option<u64> {
        match self {
            StepOutcome::Block(block) => Some(block.number),
            other => other.receipt().map(|r| r.block_number),
        }
    }

    pub fn values(&self) -> Option<&[Token]> {
        match self {
            StepOutcome::Values(values) => Some(values),
            _ => None,
        }
    }

    pub fn output(&self, index: usize) -> Option<&Token> {
        self.values().and_then(|v| v.get(index))
    }
}

/// Outcome of one executed step, in sequence order.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub index: usize,
    pub label: String,
    pub outcome: StepOutcome,
    pub format: ValueFormat,
}

impl std::fmt::Display for StepResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: ", self.index, self.label)?;
        match &self.outcome {
            StepOutcome::Deployed { contract, receipt } => write!(
                f,
                "deployed {} to {} at block {}",
                contract.name(),
                to_checksum_address(&contract.address()),
                receipt.block_number
            ),
            StepOutcome::Confirmed { receipt } => write!(f, "confirmed {receipt}"),
            StepOutcome::Values(values) => write!(f, "{}", render_tokens(values, self.format)),
            StepOutcome::Block(block) => write!(f, "block number {}", block.number),
            StepOutcome::Balance(balance) => write!(
                f,
                "balance {} ETH",
                ballot_types::format_units(*balance, ballot_types::DEFAULT_DECIMALS)
            ),
        }
    }
}
