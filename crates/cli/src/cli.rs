use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use ballot_clients::{alchemy_goerli_url, ChainClient, ChainError, Web3Client};
use ballot_scenarios::{
    ballot, erc20_votes, node_signers, tokenized_ballot, Contracts, ScenarioConfig, ScenarioError,
    BALLOT, ERC20_VOTES,
};
use ballot_sequencer::{SequencerError, Step};
use ballot_types::{parse_address, to_checksum_address, Artifact, Signer};
use clap::{Parser, Subcommand, ValueHint};
use thiserror::Error;
use web3::signing::SecretKey;
use web3::types::Address;

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

#[derive(Debug, Parser)]
#[command(author, version, about = "Deploys voting contracts and drives them one confirmed step at a time")]
struct Cli {
    /// JSON-RPC endpoint of the node.
    #[arg(long, env = "ETH_RPC_URL", global = true, value_hint = ValueHint::Url)]
    rpc_url: Option<String>,

    /// Directory holding `<Name>.sol/<Name>.json` build artifacts.
    #[arg(
        long,
        env = "ARTIFACTS_DIR",
        default_value = "./artifacts/contracts",
        global = true,
        value_hint = ValueHint::DirPath
    )]
    artifacts: PathBuf,

    /// TOML file overriding scenario parameters.
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "info", global = true)]
    log_level: log::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Deploy a Ballot on a development node, delegate and vote.
    BallotLocal,
    /// Deploy a Ballot on Goerli from a single key and hand out voting rights.
    BallotRemote {
        #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
        private_key: String,
        /// Used to build the endpoint when no RPC URL is given.
        #[arg(long, env = "ALCHEMY_API_KEY", hide_env_values = true)]
        alchemy_api_key: Option<String>,
    },
    /// Mint, delegate and transfer MyERC20Votes tokens.
    Erc20Votes,
    /// Vote on a TokenizedBallot with token voting power.
    TokenizedBallot,
    /// Read the state of an already deployed Ballot.
    Inspect {
        #[arg(long)]
        address: String,
        /// Voter to look up. Defaults to the configured inspect voter.
        #[arg(long)]
        voter: Option<String>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("invalid address {value}: {reason}")]
    InvalidAddress { value: String, reason: String },

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("no RPC URL: set ETH_RPC_URL or ALCHEMY_API_KEY")]
    MissingRpcUrl,

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

impl From<SequencerError> for CliError {
    fn from(err: SequencerError) -> Self {
        CliError::Scenario(ScenarioError::Run(err))
    }
}

fn address_arg(value: &str) -> Result<Address, CliError> {
    parse_address(value).map_err(|e| CliError::InvalidAddress {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn private_key(value: &str) -> Result<SecretKey, CliError> {
    let value = value.trim();
    let hex = value.strip_prefix("0x").unwrap_or(value);
    SecretKey::from_str(hex).map_err(|e| CliError::InvalidKey(e.to_string()))
}

fn remote_rpc_url(rpc_url: Option<String>, alchemy_api_key: Option<&str>) -> Result<String, CliError> {
    match (rpc_url, alchemy_api_key) {
        (Some(url), _) => Ok(url),
        (None, Some(key)) => Ok(alchemy_goerli_url(key)),
        (None, None) => Err(CliError::MissingRpcUrl),
    }
}

async fn load(dir: &Path, name: &str) -> Result<Arc<Artifact>, CliError> {
    let artifact = Artifact::load(dir, name).await.map_err(ScenarioError::from)?;
    Ok(Arc::new(artifact))
}

async fn execute<C: ChainClient>(
    config: &ScenarioConfig,
    client: C,
    steps: &[Step],
) -> Result<(), CliError> {
    let sequencer = config.sequencer.build(client)?;
    let results = sequencer.run(steps).await?;
    log::info!("all {} steps completed", results.len());
    Ok(())
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ScenarioConfig::load(cli.config.as_deref())?;
    let local_url = || {
        cli.rpc_url
            .clone()
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string())
    };

    match &cli.command {
        Commands::BallotLocal => {
            let client = Web3Client::connect(&local_url())?;
            let signers = node_signers(&client).await?;
            let ballot = load(&cli.artifacts, BALLOT).await?;
            let steps = ballot::local(&config, &ballot, &signers)?;
            execute(&config, client, &steps).await
        }
        Commands::BallotRemote {
            private_key: key,
            alchemy_api_key,
        } => {
            let url = remote_rpc_url(cli.rpc_url.clone(), alchemy_api_key.as_deref())?;
            let signer = Signer::local(private_key(key)?);
            log::info!("signing as {}", signer);
            let client = Web3Client::connect(&url)?;
            log::info!("connected to chain {}", client.chain_id().await?);
            let ballot = load(&cli.artifacts, BALLOT).await?;
            let steps = ballot::remote(&config, &ballot, &signer)?;
            execute(&config, client, &steps).await
        }
        Commands::Erc20Votes => {
            let client = Web3Client::connect(&local_url())?;
            let signers = node_signers(&client).await?;
            let token = load(&cli.artifacts, ERC20_VOTES).await?;
            let steps = erc20_votes::steps(&config, &token, &signers)?;
            execute(&config, client, &steps).await
        }
        Commands::TokenizedBallot => {
            let client = Web3Client::connect(&local_url())?;
            let signers = node_signers(&client).await?;
            let contracts = Contracts::load(&cli.artifacts).await?;
            let steps = tokenized_ballot::steps(&config, &contracts, &signers)?;
            execute(&config, client, &steps).await
        }
        Commands::Inspect { address, voter } => {
            let address = address_arg(address)?;
            let voter = match voter {
                Some(voter) => address_arg(voter)?,
                None => config.ballot.inspect_voter,
            };
            log::info!(
                "inspecting ballot at {} for voter {}",
                to_checksum_address(&address),
                to_checksum_address(&voter)
            );
            let client = Web3Client::connect(&local_url())?;
            let ballot = load(&cli.artifacts, BALLOT).await?;
            execute(&config, client, &ballot::inspect(&ballot, address, voter)).await
        }
    }
}

fn report(err: &CliError) {
    if let CliError::Scenario(ScenarioError::Run(run)) = err {
        if let (Some((index, label)), Some(cause)) = (run.failed_step(), run.step_error()) {
            log::error!(
                "step {} ({}) failed with a {:?} error: {}",
                index,
                label,
                cause.kind(),
                cause
            );
            return;
        }
    }
    log::error!("{}", err);
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    if let Err(e) = simple_logger::init_with_level(cli.log_level) {
        eprintln!("unable to initialise logger: {e}");
    }

    if let Err(err) = run(cli).await {
        report(&err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inspect_with_global_flags_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "ballot_cli",
            "inspect",
            "--address",
            "0x5FbDB2315678afecb367f032d93F642f64180aa3",
            "--log-level",
            "debug",
            "--config",
            "scenario.toml",
        ])
        .unwrap();
        assert_eq!(cli.log_level, log::Level::Debug);
        assert_eq!(cli.config, Some(PathBuf::from("scenario.toml")));
        match cli.command {
            Commands::Inspect { address, voter } => {
                assert_eq!(address, "0x5FbDB2315678afecb367f032d93F642f64180aa3");
                assert!(voter.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn private_key_accepts_an_optional_prefix() {
        let raw = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        let plain = private_key(raw).unwrap();
        let prefixed = private_key(&format!("0x{raw}\n")).unwrap();
        assert_eq!(plain, prefixed);
        assert!(matches!(private_key("0x1234"), Err(CliError::InvalidKey(_))));
    }

    #[test]
    fn remote_url_falls_back_to_alchemy() {
        assert_eq!(
            remote_rpc_url(Some("http://node:8545".into()), Some("key")).unwrap(),
            "http://node:8545"
        );
        assert_eq!(
            remote_rpc_url(None, Some("key")).unwrap(),
            alchemy_goerli_url("key")
        );
        assert!(matches!(remote_rpc_url(None, None), Err(CliError::MissingRpcUrl)));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(matches!(
            address_arg("0x1234"),
            Err(CliError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn sequencer_failures_keep_their_step() {
        let err = CliError::from(SequencerError::StepFailed {
            index: 3,
            label: "vote".to_string(),
            source: ballot_sequencer::StepError::MissingSigner,
        });
        assert!(err.to_string().starts_with("step 3 (vote) failed"));
    }
}
