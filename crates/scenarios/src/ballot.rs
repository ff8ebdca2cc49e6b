use std::sync::Arc;

use ballot_sequencer::{Arg, Step, Target};
use ballot_types::{to_checksum_address, Artifact, Signer, TxOptions};
use web3::types::Address;

use crate::{proposal_names, take_signers, ScenarioConfig, ScenarioError};

fn deploy(
    config: &ScenarioConfig,
    ballot: &Arc<Artifact>,
    chairperson: &Signer,
) -> Result<Step, ScenarioError> {
    let names = Arg::bytes32_array(proposal_names(config)?)?;
    Ok(Step::deploy("deploy", ballot, vec![names], chairperson))
}

fn describe_accounts(chairperson: &Signer, first: &Signer, second: &Signer) -> String {
    format!(
        "chairperson {}, voter 1 {}, voter 2 {}",
        to_checksum_address(&chairperson.address()),
        to_checksum_address(&first.address()),
        to_checksum_address(&second.address())
    )
}

fn voter(label: impl Into<String>, target: Target, account: Address) -> Step {
    Step::read(label, target, "voters", vec![Arg::address(account)])
}

/// Deploy on a development node, hand out two voting rights, delegate one
/// to the other and vote with the combined weight.
///
/// Needs three unlocked accounts: the chairperson and two voters.
pub fn local(
    config: &ScenarioConfig,
    ballot: &Arc<Artifact>,
    signers: &[Signer],
) -> Result<Vec<Step>, ScenarioError> {
    let signers = take_signers(signers, 3)?;
    let (chairperson, first, second) = (&signers[0], &signers[1], &signers[2]);
    log::info!("{}", describe_accounts(chairperson, first, second));
    let deployed = || Target::deployed("deploy");

    Ok(vec![
        deploy(config, ballot, chairperson)?,
        Step::read("chairperson", deployed(), "chairperson", Vec::new()),
        Step::send(
            "give-right-1",
            deployed(),
            "giveRightToVote",
            vec![Arg::address(first.address())],
            chairperson,
        ),
        Step::send(
            "give-right-2",
            deployed(),
            "giveRightToVote",
            vec![Arg::address(second.address())],
            chairperson,
        ),
        voter("voter-1", deployed(), first.address()),
        voter("voter-2", deployed(), second.address()),
        Step::send(
            "delegate",
            deployed(),
            "delegate",
            vec![Arg::address(first.address())],
            second,
        ),
        voter("voter-1-after-delegate", deployed(), first.address()),
        voter("voter-2-after-delegate", deployed(), second.address()),
        Step::read("winner-before-vote", deployed(), "winningProposal", Vec::new()),
        Step::send(
            "vote",
            deployed(),
            "vote",
            vec![Arg::uint(config.ballot.vote_proposal)],
            first,
        ),
        Step::read("winner-after-vote", deployed(), "winningProposal", Vec::new()),
        Step::read("winner-name", deployed(), "winnerName", Vec::new()),
        voter(
            "inspect-voter",
            Target::attach_to(ballot, "deploy"),
            config.ballot.inspect_voter,
        ),
    ])
}

/// Deploy from a single funded key on a public network and give voting
/// rights to the configured addresses.
pub fn remote(
    config: &ScenarioConfig,
    ballot: &Arc<Artifact>,
    signer: &Signer,
) -> Result<Vec<Step>, ScenarioError> {
    let gas = TxOptions::with_gas_limit(config.remote.gas_limit);
    let deployed = || Target::deployed("deploy");

    let mut steps = vec![
        Step::latest_block("latest-block"),
        Step::balance("balance", signer.address()),
        deploy(config, ballot, signer)?.with_options(gas),
        Step::read("chairperson", deployed(), "chairperson", Vec::new()),
    ];
    for (i, account) in config.remote.voters.iter().enumerate() {
        steps.push(
            Step::send(
                format!("give-right-{}", i + 1),
                deployed(),
                "giveRightToVote",
                vec![Arg::address(*account)],
                signer,
            )
            .with_options(gas),
        );
    }
    for (i, account) in config.remote.voters.iter().enumerate() {
        steps.push(voter(format!("voter-{}", i + 1), deployed(), *account));
    }
    steps.push(Step::read(
        "winning-proposal",
        deployed(),
        "winningProposal",
        Vec::new(),
    ));
    Ok(steps)
}

/// Read-only look at a ballot that is already deployed at `address`.
pub fn inspect(ballot: &Arc<Artifact>, address: Address, account: Address) -> Vec<Step> {
    let at = || Target::At(ballot.attach(address));
    vec![
        Step::read("chairperson", at(), "chairperson", Vec::new()),
        Step::read("proposal-0", at(), "proposals", vec![Arg::uint(0u64)]),
        voter("voter", at(), account),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballot_sequencer::StepKind;

    fn ballot() -> Arc<Artifact> {
        Arc::new(Artifact::new(
            crate::BALLOT,
            web3::ethabi::Contract::load(&b"[]"[..]).unwrap(),
            Vec::new(),
        ))
    }

    fn signers(n: u64) -> Vec<Signer> {
        (1..=n).map(|i| Signer::node(Address::from_low_u64_be(i))).collect()
    }

    #[test]
    fn local_needs_three_accounts() {
        let err = local(&ScenarioConfig::default(), &ballot(), &signers(2)).unwrap_err();
        assert!(matches!(
            err,
            ScenarioError::NotEnoughAccounts { needed: 3, found: 2 }
        ));
    }

    #[test]
    fn remote_transactions_carry_the_gas_limit() {
        let config = ScenarioConfig::default();
        let steps = remote(&config, &ballot(), &signers(1)[0]).unwrap();
        let limited = steps
            .iter()
            .filter(|s| match &s.kind {
                StepKind::Deploy { options, .. } | StepKind::Call { options, .. } => {
                    options.gas == Some(config.remote.gas_limit.into())
                }
                _ => false,
            })
            .count();
        // the deploy plus one right per configured voter
        assert_eq!(limited, 1 + config.remote.voters.len());
    }

    #[test]
    fn accounts_are_described_in_checksum_form() {
        let accounts = signers(3);
        let line = describe_accounts(&accounts[0], &accounts[1], &accounts[2]);
        assert_eq!(
            line,
            format!(
                "chairperson {}, voter 1 {}, voter 2 {}",
                to_checksum_address(&Address::from_low_u64_be(1)),
                to_checksum_address(&Address::from_low_u64_be(2)),
                to_checksum_address(&Address::from_low_u64_be(3))
            )
        );
        assert!(line.contains("0x0000000000000000000000000000000000000001"));
    }

    #[test]
    fn overlong_proposal_names_are_rejected() {
        let config = ScenarioConfig {
            proposals: vec!["a proposal name that does not fit in 32 bytes".to_string()],
            ..Default::default()
        };
        let err = local(&config, &ballot(), &signers(3)).unwrap_err();
        assert!(matches!(err, ScenarioError::Proposal(_)));
    }
}
