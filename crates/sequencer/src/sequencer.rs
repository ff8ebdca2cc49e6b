use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use ballot_clients::ChainClient;
use ballot_types::{to_checksum_address, ContractHandle, Receipt, Signer};
use derive_builder::Builder;
use web3::ethabi::Token;
use web3::types::{H256, U256};

use crate::{
    Arg, Mutability, PreflightError, SequencerError, Step, StepError, StepKind, StepOutcome,
    StepResult, Target,
};

/// Runs step lists one at a time against a [`ChainClient`].
///
/// A state-changing step is not considered done until its receipt has been
/// observed, so a later step never reads state from before an earlier
/// transaction landed. The first failure ends the run.
#[derive(Builder)]
#[builder(pattern = "owned")]
pub struct Sequencer<C: ChainClient> {
    client: C,
    /// Delay between receipt polls.
    #[builder(default = "Duration::from_secs(1)")]
    poll_interval: Duration,
    /// Blocks that must include a transaction before it counts as confirmed.
    #[builder(default = "1")]
    confirmations: u64,
    /// Check signer funds and attach targets before the first step.
    #[builder(default = "true")]
    preflight: bool,
}

impl<C: ChainClient> Sequencer<C> {
    pub async fn run(&self, steps: &[Step]) -> Result<Vec<StepResult>, SequencerError> {
        Self::validate(steps)?;
        if self.preflight {
            self.check_preconditions(steps).await?;
        }

        let mut results: Vec<StepResult> = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            log::debug!("[{}] {}: starting", index, step.label);
            let outcome = match self.execute(step, &results).await {
                Ok(outcome) => outcome,
                Err(source) => {
                    log::error!("[{}] {}: {}", index, step.label, source);
                    return Err(SequencerError::StepFailed {
                        index,
                        label: step.label.clone(),
                        source,
                    });
                }
            };
            let result = StepResult {
                index,
                label: step.label.clone(),
                outcome,
                format: step.format,
            };
            log::info!("{}", result);
            results.push(result);
        }

        Ok(results)
    }

    /// Rejects duplicate labels and references to steps that do not run
    /// earlier in the list, before anything is sent.
    fn validate(steps: &[Step]) -> Result<(), SequencerError> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (index, step) in steps.iter().enumerate() {
            let fail = |source| SequencerError::StepFailed {
                index,
                label: step.label.clone(),
                source,
            };
            if let Some(missing) = step.references().into_iter().find(|r| !seen.contains_key(r)) {
                return Err(fail(StepError::UnresolvedReference(missing.to_string())));
            }
            if let Some(previous) = seen.insert(step.label.as_str(), index) {
                return Err(fail(StepError::DuplicateLabel(previous)));
            }
        }
        Ok(())
    }

    async fn check_preconditions(&self, steps: &[Step]) -> Result<(), PreflightError> {
        let signers: BTreeSet<_> = steps
            .iter()
            .filter(|s| s.is_state_changing())
            .filter_map(Step::signer)
            .map(Signer::address)
            .collect();
        for address in signers {
            let balance = self.client.balance(address).await?;
            log::debug!(
                "signer {} holds {} wei",
                to_checksum_address(&address),
                balance
            );
            if balance.is_zero() {
                return Err(PreflightError::Unfunded(address));
            }
        }

        let attached: BTreeSet<_> = steps
            .iter()
            .filter_map(|s| match &s.kind {
                StepKind::Call {
                    target: Target::At(handle),
                    ..
                } => Some(handle.address()),
                _ => None,
            })
            .collect();
        for address in attached {
            if self.client.code_at(address).await?.is_empty() {
                return Err(PreflightError::NoCode(address));
            }
        }

        Ok(())
    }

    async fn execute(&self, step: &Step, done: &[StepResult]) -> Result<StepOutcome, StepError> {
        match &step.kind {
            StepKind::Deploy {
                artifact,
                args,
                signer,
                options,
            } => {
                let args = resolve_args(args, done)?;
                let hash = self.client.deploy(signer, artifact, &args, *options).await?;
                log::info!(
                    "{}: {} deployment submitted as {:?}, waiting for confirmation",
                    step.label,
                    artifact.name(),
                    hash
                );
                let receipt = self.wait_for_receipt(hash).await?;
                let address = receipt
                    .contract_address
                    .ok_or(StepError::NoContractCreated(hash))?;
                Ok(StepOutcome::Deployed {
                    contract: artifact.attach(address),
                    receipt,
                })
            }
            StepKind::Call {
                target,
                method,
                args,
                signer,
                mutability,
                options,
            } => {
                let contract = resolve_target(target, done)?;
                let args = resolve_args(args, done)?;
                match mutability {
                    Mutability::ReadOnly => {
                        let from = signer.as_ref().map(Signer::address);
                        let values = self.client.call(&contract, method, &args, from).await?;
                        Ok(StepOutcome::Values(values))
                    }
                    Mutability::StateChanging => {
                        let signer = signer.as_ref().ok_or(StepError::MissingSigner)?;
                        let hash = self
                            .client
                            .send(signer, &contract, method, &args, *options)
                            .await?;
                        log::info!(
                            "{}: {}.{} submitted as {:?}, waiting for confirmation",
                            step.label,
                            contract.name(),
                            method,
                            hash
                        );
                        let receipt = self.wait_for_receipt(hash).await?;
                        Ok(StepOutcome::Confirmed { receipt })
                    }
                }
            }
            StepKind::LatestBlock => Ok(StepOutcome::Block(self.client.latest_block().await?)),
            StepKind::Balance { account } => {
                Ok(StepOutcome::Balance(self.client.balance(*account).await?))
            }
        }
    }

    async fn wait_for_receipt(&self, hash: H256) -> Result<Receipt, StepError> {
        let receipt = loop {
            if let Some(receipt) = self.client.receipt(hash).await? {
                break receipt;
            }
            log::debug!("receipt for {:?} not yet available", hash);
            tokio::time::sleep(self.poll_interval).await;
        };

        if self.confirmations > 1 {
            let wanted = receipt.block_number + self.confirmations - 1;
            loop {
                let latest = self.client.latest_block().await?;
                if latest.number >= wanted {
                    break;
                }
                log::debug!(
                    "{:?} mined in block {}, waiting for block {} (latest {})",
                    hash,
                    receipt.block_number,
                    wanted,
                    latest.number
                );
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        if !receipt.success {
            return Err(StepError::FailedReceipt {
                hash,
                block_number: receipt.block_number,
            });
        }
        Ok(receipt)
    }
}

fn find<'a>(done: &'a [StepResult], label: &str) -> Result<&'a StepResult, StepError> {
    done.iter()
        .find(|r| r.label == label)
        .ok_or_else(|| StepError::UnresolvedReference(label.to_string()))
}

fn missing(step: &str, wanted: &'static str) -> StepError {
    StepError::MissingValue {
        step: step.to_string(),
        wanted,
    }
}

fn resolve_target(target: &Target, done: &[StepResult]) -> Result<ContractHandle, StepError> {
    match target {
        Target::Deployed(step) => find(done, step)?
            .outcome
            .contract()
            .cloned()
            .ok_or_else(|| missing(step, "contract")),
        Target::At(handle) => Ok(handle.clone()),
        Target::AttachTo { artifact, step } => {
            let address = find(done, step)?
                .outcome
                .address()
                .ok_or_else(|| missing(step, "contract address"))?;
            Ok(artifact.attach(address))
        }
    }
}

fn resolve_args(args: &[Arg], done: &[StepResult]) -> Result<Vec<Token>, StepError> {
    args.iter().map(|arg| resolve_arg(arg, done)).collect()
}

fn resolve_arg(arg: &Arg, done: &[StepResult]) -> Result<Token, StepError> {
    match arg {
        Arg::Value(token) => Ok(token.clone()),
        Arg::AddressOf(step) => find(done, step)?
            .outcome
            .address()
            .map(Token::Address)
            .ok_or_else(|| missing(step, "contract address")),
        Arg::BlockOf { step, offset } => {
            let base = find(done, step)?
                .outcome
                .block_number()
                .ok_or_else(|| missing(step, "block number"))?;
            let shifted = i128::from(base) + i128::from(*offset);
            let block = u64::try_from(shifted).map_err(|_| StepError::BlockOutOfRange {
                base,
                offset: *offset,
            })?;
            Ok(Token::Uint(U256::from(block)))
        }
        Arg::Output { step, index } => find(done, step)?
            .outcome
            .output(*index)
            .cloned()
            .ok_or_else(|| missing(step, "output at that index")),
    }
}
