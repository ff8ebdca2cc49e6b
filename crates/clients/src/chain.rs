use async_trait::async_trait;
use ballot_types::{Artifact, BlockSummary, ContractHandle, Receipt, Signer, TxOptions};
use thiserror::Error;
use web3::ethabi::Token;
use web3::types::{Address, H256, U256};

/// Broad class of a chain failure, used when reporting which kind of
/// problem stopped a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Connectivity,
    Authorization,
    Execution,
    Decoding,
    Provider,
    /// The request never reached the chain: no such method or contract.
    Sequencing,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("unable to reach network: {0}")]
    Connectivity(String),

    #[error("transaction not authorized: {0}")]
    Authorization(String),

    #[error("execution reverted: {0}")]
    Reverted(String),

    #[error("unable to decode result of {method}: {reason}")]
    Decoding { method: String, reason: String },

    #[error("no contract named {0} is known")]
    UnknownArtifact(String),

    #[error("contract {contract} has no method {method}")]
    UnknownMethod { contract: String, method: String },

    #[error("invalid arguments for {method}: {reason}")]
    InvalidArguments { method: String, reason: String },

    #[error("provider error: {0}")]
    Provider(String),
}

impl ChainError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ChainError::Connectivity(_) => ErrorClass::Connectivity,
            ChainError::Authorization(_) => ErrorClass::Authorization,
            ChainError::Reverted(_) => ErrorClass::Execution,
            ChainError::Decoding { .. } => ErrorClass::Decoding,
            ChainError::UnknownArtifact(_)
            | ChainError::UnknownMethod { .. }
            | ChainError::InvalidArguments { .. } => ErrorClass::Sequencing,
            ChainError::Provider(_) => ErrorClass::Provider,
        }
    }

    /// Sorts a node's error message into the failure taxonomy. Nodes only
    /// report reverts and funding problems as free text.
    pub fn from_rpc_message(message: &str) -> Self {
        let lowered = message.to_lowercase();
        if lowered.contains("revert") || lowered.contains("invalid opcode") {
            ChainError::Reverted(message.to_string())
        } else if lowered.contains("insufficient funds")
            || lowered.contains("nonce")
            || lowered.contains("signature")
            || lowered.contains("unknown account")
            || lowered.contains("sender account not recognized")
        {
            ChainError::Authorization(message.to_string())
        } else {
            ChainError::Provider(message.to_string())
        }
    }
}

impl From<web3::Error> for ChainError {
    fn from(err: web3::Error) -> Self {
        match err {
            web3::Error::Unreachable => ChainError::Connectivity("node unreachable".to_string()),
            web3::Error::Transport(e) => ChainError::Connectivity(e.to_string()),
            web3::Error::Rpc(e) => match e.data {
                Some(data) => ChainError::from_rpc_message(&format!("{} ({})", e.message, data)),
                None => ChainError::from_rpc_message(&e.message),
            },
            web3::Error::Decoder(e) | web3::Error::InvalidResponse(e) => ChainError::Decoding {
                method: "rpc response".to_string(),
                reason: e,
            },
            other => ChainError::Provider(other.to_string()),
        }
    }
}

/// Network, signer and contract access as the sequencer consumes them.
///
/// State-changing operations return as soon as the node accepted the
/// transaction; confirmation is observed separately through
/// [`ChainClient::receipt`].
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn latest_block(&self) -> Result<BlockSummary, ChainError>;

    async fn balance(&self, address: Address) -> Result<U256, ChainError>;

    async fn code_at(&self, address: Address) -> Result<Vec<u8>, ChainError>;

    /// Accounts the node manages and will sign for.
    async fn accounts(&self) -> Result<Vec<Address>, ChainError>;

    async fn deploy(
        &self,
        signer: &Signer,
        artifact: &Artifact,
        args: &[Token],
        options: TxOptions,
    ) -> Result<H256, ChainError>;

    async fn send(
        &self,
        signer: &Signer,
        contract: &ContractHandle,
        method: &str,
        args: &[Token],
        options: TxOptions,
    ) -> Result<H256, ChainError>;

    async fn call(
        &self,
        contract: &ContractHandle,
        method: &str,
        args: &[Token],
        from: Option<Address>,
    ) -> Result<Vec<Token>, ChainError>;

    /// `None` while the transaction is still pending.
    async fn receipt(&self, hash: H256) -> Result<Option<Receipt>, ChainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_node_messages() {
        let revert = ChainError::from_rpc_message(
            "VM Exception while processing transaction: reverted with reason string 'Has no right to vote'",
        );
        assert_eq!(revert.class(), ErrorClass::Execution);

        let funds = ChainError::from_rpc_message("insufficient funds for gas * price + value");
        assert_eq!(funds.class(), ErrorClass::Authorization);

        let nonce = ChainError::from_rpc_message("Nonce too low. Expected nonce to be 3");
        assert_eq!(nonce.class(), ErrorClass::Authorization);

        let other = ChainError::from_rpc_message("header not found");
        assert_eq!(other, ChainError::Provider("header not found".to_string()));
    }

    #[test]
    fn maps_transport_failures_to_connectivity() {
        let err: ChainError = web3::Error::Unreachable.into();
        assert_eq!(err.class(), ErrorClass::Connectivity);

        let err: ChainError = web3::Error::InvalidResponse("bad json".to_string()).into();
        assert_eq!(err.class(), ErrorClass::Decoding);
    }

    #[test]
    fn malformed_requests_are_sequencing_errors() {
        let method = ChainError::UnknownMethod {
            contract: "Ballot".to_string(),
            method: "chairpersn".to_string(),
        };
        assert_eq!(method.class(), ErrorClass::Sequencing);

        let args = ChainError::InvalidArguments {
            method: "vote".to_string(),
            reason: "Invalid data".to_string(),
        };
        assert_eq!(args.class(), ErrorClass::Sequencing);

        let artifact = ChainError::UnknownArtifact("Ballott".to_string());
        assert_eq!(artifact.class(), ErrorClass::Sequencing);
    }
}
