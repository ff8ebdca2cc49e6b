//! Scenario parameters, read from an optional TOML file.

use std::path::Path;
use std::time::Duration;

use ballot_clients::ChainClient;
use ballot_sequencer::{Sequencer, SequencerBuilder};
use serde::Deserialize;
use web3::types::Address;

use crate::ScenarioError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Proposal names, each at most 31 bytes of UTF-8.
    pub proposals: Vec<String>,
    pub ballot: BallotConfig,
    pub remote: RemoteConfig,
    pub erc20_votes: Erc20VotesConfig,
    pub tokenized_ballot: TokenizedBallotConfig,
    pub sequencer: SequencerConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            proposals: vec![
                "proposal_1".to_string(),
                "proposal_2".to_string(),
                "proposal_3".to_string(),
            ],
            ballot: BallotConfig::default(),
            remote: RemoteConfig::default(),
            erc20_votes: Erc20VotesConfig::default(),
            tokenized_ballot: TokenizedBallotConfig::default(),
            sequencer: SequencerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BallotConfig {
    pub vote_proposal: u64,
    /// Voter read back through a fresh handle at the end of the local run.
    pub inspect_voter: Address,
}

impl Default for BallotConfig {
    fn default() -> Self {
        Self {
            vote_proposal: 2,
            inspect_voter: Address::from([
                0x70, 0x99, 0x79, 0x70, 0xc5, 0x18, 0x12, 0xdc, 0x3a, 0x01, 0x0c, 0x7d, 0x01,
                0xb5, 0x0e, 0x0d, 0x17, 0xdc, 0x79, 0xc8,
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub voters: Vec<Address>,
    pub gas_limit: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            voters: vec![
                Address::from([
                    0x09, 0x26, 0x51, 0x9a, 0x5c, 0x3c, 0x7e, 0x9b, 0x99, 0x38, 0xb0, 0x52, 0xee,
                    0x41, 0x11, 0x8f, 0xbe, 0x6e, 0xf5, 0x6f,
                ]),
                Address::from([
                    0xa0, 0xa2, 0x20, 0x6f, 0x78, 0xca, 0xbd, 0xf6, 0xd5, 0x77, 0x0f, 0x5f, 0x8b,
                    0x61, 0x77, 0x74, 0xf6, 0x99, 0xf6, 0x9a,
                ]),
            ],
            gas_limit: 5_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Erc20VotesConfig {
    /// Whole tokens minted to the first holder.
    pub mint: String,
}

impl Default for Erc20VotesConfig {
    fn default() -> Self {
        Self {
            mint: "10".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TokenizedBallotConfig {
    pub mint: String,
    pub target_block: u64,
    pub vote_proposal: u64,
    /// Raw voting power spent by the vote, not scaled by decimals.
    pub vote_amount: u64,
}

impl Default for TokenizedBallotConfig {
    fn default() -> Self {
        Self {
            mint: "100".to_string(),
            target_block: 6,
            vote_proposal: 1,
            vote_amount: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    pub poll_interval_ms: u64,
    pub confirmations: u64,
    pub preflight: bool,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            confirmations: 1,
            preflight: true,
        }
    }
}

impl SequencerConfig {
    pub fn build<C: ChainClient>(&self, client: C) -> Result<Sequencer<C>, ScenarioError> {
        Ok(SequencerBuilder::default()
            .client(client)
            .poll_interval(Duration::from_millis(self.poll_interval_ms))
            .confirmations(self.confirmations)
            .preflight(self.preflight)
            .build()?)
    }
}

impl ScenarioConfig {
    pub fn from_toml(source: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(source)?)
    }

    /// Reads `path` when given, otherwise returns the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ScenarioError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        log::info!("loading scenario config from {}", path.display());
        let source = std::fs::read_to_string(path).map_err(|source| ScenarioError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballot_types::parse_address;
    use std::io::Write;

    #[test]
    fn defaults_match_the_reference_runs() {
        let config = ScenarioConfig::default();
        assert_eq!(config.proposals, ["proposal_1", "proposal_2", "proposal_3"]);
        assert_eq!(
            config.ballot.inspect_voter,
            parse_address("0x70997970C51812dc3A010C7d01b50e0d17dc79C8").unwrap()
        );
        assert_eq!(
            config.remote.voters,
            vec![
                parse_address("0x0926519a5C3c7e9b9938b052Ee41118FBe6ef56F").unwrap(),
                parse_address("0xa0a2206F78CAbdf6d5770F5f8B617774F699F69A").unwrap(),
            ]
        );
        assert_eq!(config.tokenized_ballot.target_block, 6);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = ScenarioConfig::from_toml(
            r#"
            proposals = ["yes", "no"]

            [tokenized_ballot]
            vote_amount = 7

            [sequencer]
            poll_interval_ms = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.proposals, ["yes", "no"]);
        assert_eq!(config.tokenized_ballot.vote_amount, 7);
        assert_eq!(config.tokenized_ballot.mint, "100");
        assert_eq!(config.sequencer.poll_interval_ms, 50);
        assert!(config.sequencer.preflight);
        assert_eq!(config.remote.gas_limit, 5_000_000);
    }

    #[test]
    fn loads_from_file() {
        let tmp = tempfile::NamedTempFile::new().expect("temp file");
        let mut f = tmp.reopen().expect("reopen");
        write!(
            f,
            "[remote]\nvoters = [\"0x0926519a5c3c7e9b9938b052ee41118fbe6ef56f\"]\ngas_limit = 1\n"
        )
        .expect("write");

        let config = ScenarioConfig::load(Some(tmp.path())).expect("load");
        assert_eq!(config.remote.voters.len(), 1);
        assert_eq!(config.remote.gas_limit, 1);
        assert_eq!(ScenarioConfig::load(None).unwrap(), ScenarioConfig::default());
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = ScenarioConfig::load(Some(Path::new("/nonexistent/scenario.toml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/scenario.toml"));
    }
}
