use std::sync::Arc;

use ballot_types::{bytes32_array, Artifact, Bytes32Error, ContractHandle, Signer, TxOptions, ValueFormat};
use web3::ethabi::Token;
use web3::types::{Address, U256};

/// An argument to a deploy or call, possibly computed from an earlier step.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(Token),
    /// Address of the contract created by a deploy step.
    AddressOf(String),
    /// Block number recorded by a step, shifted by `offset`.
    BlockOf { step: String, offset: i64 },
    /// The `index`-th decoded value returned by a read step.
    Output { step: String, index: usize },
}

impl Arg {
    pub fn address(address: Address) -> Self {
        Arg::Value(Token::Address(address))
    }

    pub fn uint(value: impl Into<U256>) -> Self {
        Arg::Value(Token::Uint(value.into()))
    }

    pub fn bytes32_array<S: AsRef<str>>(names: &[S]) -> Result<Self, Bytes32Error> {
        bytes32_array(names).map(Arg::Value)
    }

    pub fn address_of(step: impl Into<String>) -> Self {
        Arg::AddressOf(step.into())
    }

    pub fn block_of(step: impl Into<String>, offset: i64) -> Self {
        Arg::BlockOf {
            step: step.into(),
            offset,
        }
    }

    pub fn output(step: impl Into<String>, index: usize) -> Self {
        Arg::Output {
            step: step.into(),
            index,
        }
    }

    pub(crate) fn reference(&self) -> Option<&str> {
        match self {
            Arg::Value(_) => None,
            Arg::AddressOf(step) | Arg::BlockOf { step, .. } | Arg::Output { step, .. } => {
                Some(step)
            }
        }
    }
}

impl From<Token> for Arg {
    fn from(token: Token) -> Self {
        Arg::Value(token)
    }
}

/// The contract a call is dispatched to.
#[derive(Debug, Clone)]
pub enum Target {
    /// The handle a deploy step returned.
    Deployed(String),
    /// A fixed, already deployed contract.
    At(ContractHandle),
    /// A fresh handle from `artifact` at the address a deploy step created.
    AttachTo { artifact: Arc<Artifact>, step: String },
}

impl Target {
    pub fn deployed(step: impl Into<String>) -> Self {
        Target::Deployed(step.into())
    }

    pub fn attach_to(artifact: &Arc<Artifact>, step: impl Into<String>) -> Self {
        Target::AttachTo {
            artifact: Arc::clone(artifact),
            step: step.into(),
        }
    }

    pub(crate) fn reference(&self) -> Option<&str> {
        match self {
            Target::Deployed(step) | Target::AttachTo { step, .. } => Some(step),
            Target::At(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    ReadOnly,
    StateChanging,
}

#[derive(Debug, Clone)]
pub enum StepKind {
    Deploy {
        artifact: Arc<Artifact>,
        args: Vec<Arg>,
        signer: Signer,
        options: TxOptions,
    },
    Call {
        target: Target,
        method: String,
        args: Vec<Arg>,
        /// Required for state-changing calls; the caller address for reads.
        signer: Option<Signer>,
        mutability: Mutability,
        options: TxOptions,
    },
    LatestBlock,
    Balance {
        account: Address,
    },
}

/// One entry of a sequence: a label other steps can refer to, and what to do.
#[derive(Debug, Clone)]
pub struct Step {
    pub label: String,
    pub kind: StepKind,
    /// Rendering of decoded values in the trace.
    pub format: ValueFormat,
}

impl Step {
    fn new(label: impl Into<String>, kind: StepKind) -> Self {
        Self {
            label: label.into(),
            kind,
            format: ValueFormat::Raw,
        }
    }

    pub fn deploy(
        label: impl Into<String>,
        artifact: &Arc<Artifact>,
        args: Vec<Arg>,
        signer: &Signer,
    ) -> Self {
        Self::new(
            label,
            StepKind::Deploy {
                artifact: Arc::clone(artifact),
                args,
                signer: signer.clone(),
                options: TxOptions::default(),
            },
        )
    }

    /// A state-changing call; the sequence waits for its receipt.
    pub fn send(
        label: impl Into<String>,
        target: Target,
        method: impl Into<String>,
        args: Vec<Arg>,
        signer: &Signer,
    ) -> Self {
        Self::new(
            label,
            StepKind::Call {
                target,
                method: method.into(),
                args,
                signer: Some(signer.clone()),
                mutability: Mutability::StateChanging,
                options: TxOptions::default(),
            },
        )
    }

    pub fn read(
        label: impl Into<String>,
        target: Target,
        method: impl Into<String>,
        args: Vec<Arg>,
    ) -> Self {
        Self::new(
            label,
            StepKind::Call {
                target,
                method: method.into(),
                args,
                signer: None,
                mutability: Mutability::ReadOnly,
                options: TxOptions::default(),
            },
        )
    }

    pub fn latest_block(label: impl Into<String>) -> Self {
        Self::new(label, StepKind::LatestBlock)
    }

    pub fn balance(label: impl Into<String>, account: Address) -> Self {
        Self::new(label, StepKind::Balance { account })
    }

    pub fn with_options(mut self, new_options: TxOptions) -> Self {
        match &mut self.kind {
            StepKind::Deploy { options, .. } | StepKind::Call { options, .. } => {
                *options = new_options
            }
            StepKind::LatestBlock | StepKind::Balance { .. } => {}
        }
        self
    }

    /// Renders unsigned results as token amounts with `decimals`.
    pub fn in_units(mut self, decimals: u32) -> Self {
        self.format = ValueFormat::Units(decimals);
        self
    }

    pub fn is_state_changing(&self) -> bool {
        matches!(
            self.kind,
            StepKind::Deploy { .. }
                | StepKind::Call {
                    mutability: Mutability::StateChanging,
                    ..
                }
        )
    }

    pub fn signer(&self) -> Option<&Signer> {
        match &self.kind {
            StepKind::Deploy { signer, .. } => Some(signer),
            StepKind::Call { signer, .. } => signer.as_ref(),
            StepKind::LatestBlock | StepKind::Balance { .. } => None,
        }
    }

    /// Labels of the earlier steps this step reads from.
    pub fn references(&self) -> Vec<&str> {
        match &self.kind {
            StepKind::Deploy { args, .. } => args.iter().filter_map(Arg::reference).collect(),
            StepKind::Call { target, args, .. } => target
                .reference()
                .into_iter()
                .chain(args.iter().filter_map(Arg::reference))
                .collect(),
            StepKind::LatestBlock | StepKind::Balance { .. } => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> Arc<Artifact> {
        Arc::new(Artifact::new(
            "Ballot",
            web3::ethabi::Contract::load(&b"[]"[..]).unwrap(),
            Vec::new(),
        ))
    }

    #[test]
    fn collects_references_from_target_and_args() {
        let signer = Signer::node(Address::from_low_u64_be(1));
        let step = Step::send(
            "vote",
            Target::attach_to(&artifact(), "deploy"),
            "vote",
            vec![Arg::output("winner", 0), Arg::uint(2u64), Arg::block_of("latest", -1)],
            &signer,
        );
        assert_eq!(step.references(), vec!["deploy", "winner", "latest"]);
        assert!(step.is_state_changing());
        assert_eq!(step.signer().map(Signer::address), Some(signer.address()));
    }

    #[test]
    fn options_only_apply_to_transactions() {
        let deploy = Step::deploy("deploy", &artifact(), Vec::new(), &Signer::node(Address::zero()))
            .with_options(TxOptions::with_gas_limit(5_000_000));
        match deploy.kind {
            StepKind::Deploy { options, .. } => assert_eq!(options.gas, Some(U256::from(5_000_000u64))),
            other => panic!("unexpected {other:?}"),
        }

        let block = Step::latest_block("latest").with_options(TxOptions::with_gas_limit(1));
        assert!(!block.is_state_changing());
        assert!(block.references().is_empty());
    }
}
