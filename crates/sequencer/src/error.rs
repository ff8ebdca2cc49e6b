use ballot_clients::{ChainError, ErrorClass};
use thiserror::Error;
use web3::types::{Address, H256};

/// Why a single step failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("transaction {hash:?} reverted in block {block_number}")]
    FailedReceipt { hash: H256, block_number: u64 },

    #[error("step `{0}` does not exist or has not run yet")]
    UnresolvedReference(String),

    #[error("step `{step}` produced no {wanted}")]
    MissingValue { step: String, wanted: &'static str },

    #[error("block {base} shifted by {offset} is out of range")]
    BlockOutOfRange { base: u64, offset: i64 },

    #[error("deployment {0:?} was mined without creating a contract")]
    NoContractCreated(H256),

    #[error("state-changing call has no signer")]
    MissingSigner,

    #[error("label is already used by step {0}")]
    DuplicateLabel(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Connectivity,
    Authorization,
    Execution,
    Decoding,
    Provider,
    Sequencing,
}

impl StepError {
    pub fn kind(&self) -> FailureKind {
        match self {
            StepError::Chain(e) => match e.class() {
                ErrorClass::Connectivity => FailureKind::Connectivity,
                ErrorClass::Authorization => FailureKind::Authorization,
                ErrorClass::Execution => FailureKind::Execution,
                ErrorClass::Decoding => FailureKind::Decoding,
                ErrorClass::Provider => FailureKind::Provider,
                ErrorClass::Sequencing => FailureKind::Sequencing,
            },
            StepError::FailedReceipt { .. } => FailureKind::Execution,
            StepError::NoContractCreated(_) => FailureKind::Execution,
            StepError::UnresolvedReference(_)
            | StepError::MissingValue { .. }
            | StepError::BlockOutOfRange { .. }
            | StepError::MissingSigner
            | StepError::DuplicateLabel(_) => FailureKind::Sequencing,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreflightError {
    #[error("account {0:?} has no funds to pay for gas")]
    Unfunded(Address),

    #[error("no contract code at {0:?}")]
    NoCode(Address),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SequencerError {
    #[error("step {index} ({label}) failed: {source}")]
    StepFailed {
        index: usize,
        label: String,
        #[source]
        source: StepError,
    },

    #[error("preflight check failed: {0}")]
    Preflight(#[from] PreflightError),
}

impl SequencerError {
    /// Index and label of the step that stopped the run.
    pub fn failed_step(&self) -> Option<(usize, &str)> {
        match self {
            SequencerError::StepFailed { index, label, .. } => Some((*index, label)),
            SequencerError::Preflight(_) => None,
        }
    }

    pub fn step_error(&self) -> Option<&StepError> {
        match self {
            SequencerError::StepFailed { source, .. } => Some(source),
            SequencerError::Preflight(_) => None,
        }
    }
}
