//! Step lists for the ballot, token and tokenized ballot deployments.
//!
//! Each scenario turns a [`ScenarioConfig`] and the signers it needs into a
//! `Vec<Step>` for [`ballot_sequencer::Sequencer::run`]. Nothing here talks
//! to the chain except [`node_signers`] and [`Contracts::load`].

pub mod ballot;
pub mod config;
pub mod erc20_votes;
pub mod tokenized_ballot;

pub use config::*;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use ballot_clients::mock::{BALLOT, ERC20_VOTES, TOKENIZED_BALLOT};

use ballot_clients::{ChainClient, ChainError};
use ballot_sequencer::{SequencerBuilderError, SequencerError};
use ballot_types::{Artifact, ArtifactError, Bytes32Error, Signer, UnitsError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("unable to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("invalid token amount: {0}")]
    Amount(#[from] UnitsError),

    #[error("invalid proposal name: {0}")]
    Proposal(#[from] Bytes32Error),

    #[error("no proposals configured")]
    NoProposals,

    #[error("scenario needs {needed} accounts, node has {found}")]
    NotEnoughAccounts { needed: usize, found: usize },

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("invalid sequencer settings: {0}")]
    Sequencer(#[from] SequencerBuilderError),

    #[error(transparent)]
    Run(#[from] SequencerError),
}

/// Compiled contracts the scenarios deploy or attach to.
#[derive(Debug, Clone)]
pub struct Contracts {
    pub ballot: Arc<Artifact>,
    pub erc20_votes: Arc<Artifact>,
    pub tokenized_ballot: Arc<Artifact>,
}

impl Contracts {
    /// Reads `<dir>/<Name>.sol/<Name>.json` for every contract.
    pub async fn load(dir: &Path) -> Result<Self, ScenarioError> {
        Ok(Self {
            ballot: load_artifact(dir, BALLOT).await?,
            erc20_votes: load_artifact(dir, ERC20_VOTES).await?,
            tokenized_ballot: load_artifact(dir, TOKENIZED_BALLOT).await?,
        })
    }
}

async fn load_artifact(dir: &Path, name: &str) -> Result<Arc<Artifact>, ScenarioError> {
    Ok(Arc::new(Artifact::load(dir, name).await?))
}

/// Accounts unlocked on the node, wrapped as signers in node order.
pub async fn node_signers<C: ChainClient>(client: &C) -> Result<Vec<Signer>, ScenarioError> {
    let accounts = client.accounts().await?;
    Ok(accounts.into_iter().map(Signer::node).collect())
}

/// The first `needed` signers, or an error naming how many there are.
pub(crate) fn take_signers(signers: &[Signer], needed: usize) -> Result<&[Signer], ScenarioError> {
    signers
        .get(..needed)
        .ok_or(ScenarioError::NotEnoughAccounts {
            needed,
            found: signers.len(),
        })
}

pub(crate) fn proposal_names(config: &ScenarioConfig) -> Result<&[String], ScenarioError> {
    if config.proposals.is_empty() {
        return Err(ScenarioError::NoProposals);
    }
    Ok(&config.proposals)
}
