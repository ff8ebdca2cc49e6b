use ballot_sequencer::{Arg, Step, Target};
use ballot_types::{parse_units, Signer, DEFAULT_DECIMALS};

use crate::{proposal_names, take_signers, Contracts, ScenarioConfig, ScenarioError};

fn proposal_reads(prefix: &str, count: usize) -> impl Iterator<Item = Step> + '_ {
    (0..count).map(move |i| {
        Step::read(
            format!("{prefix}-{i}"),
            Target::deployed("deploy-ballot"),
            "proposals",
            vec![Arg::uint(i as u64)],
        )
    })
}

/// Deploy a token and a ballot weighted by its votes at
/// `tokenized_ballot.target_block`, then build up voting power and spend
/// part of it.
///
/// The default target block is the one the self-delegations land in when
/// the run starts on a fresh development chain.
pub fn steps(
    config: &ScenarioConfig,
    contracts: &Contracts,
    signers: &[Signer],
) -> Result<Vec<Step>, ScenarioError> {
    let settings = &config.tokenized_ballot;
    let signers = take_signers(signers, 3)?;
    let (deployer, first, second) = (&signers[0], &signers[1], &signers[2]);
    let names = proposal_names(config)?;
    let minted = parse_units(&settings.mint, DEFAULT_DECIMALS)?;

    let token = || Target::deployed("deploy-token");
    let ballot = || Target::deployed("deploy-ballot");
    let votes = |label: &str, signer: &Signer| {
        Step::read(
            label,
            token(),
            "getVotes",
            vec![Arg::address(signer.address())],
        )
        .in_units(DEFAULT_DECIMALS)
    };
    let self_delegate = |label: &str, signer: &Signer| {
        Step::send(
            label,
            token(),
            "delegate",
            vec![Arg::address(signer.address())],
            signer,
        )
    };

    let mut steps = vec![
        Step::deploy("deploy-token", &contracts.erc20_votes, Vec::new(), deployer),
        Step::deploy(
            "deploy-ballot",
            &contracts.tokenized_ballot,
            vec![
                Arg::bytes32_array(names)?,
                Arg::address_of("deploy-token"),
                Arg::uint(settings.target_block),
            ],
            deployer,
        ),
    ];
    steps.extend(proposal_reads("proposal", names.len()));
    steps.extend([
        Step::send(
            "mint",
            token(),
            "mint",
            vec![Arg::address(first.address()), Arg::uint(minted)],
            deployer,
        ),
        Step::read(
            "balance",
            token(),
            "balanceOf",
            vec![Arg::address(first.address())],
        )
        .in_units(DEFAULT_DECIMALS),
        votes("votes-1-before-delegate", first),
        self_delegate("self-delegate-1", first),
        votes("votes-1-after-delegate", first),
        Step::send(
            "transfer",
            token(),
            "transfer",
            vec![Arg::address(second.address()), Arg::uint(minted / 2)],
            first,
        ),
        votes("votes-1-after-transfer", first),
        votes("votes-2-after-transfer", second),
        self_delegate("self-delegate-2", second),
        votes("votes-2-after-delegate", second),
        votes("votes-1-after-delegate-2", first),
        Step::latest_block("latest-block"),
        Step::read(
            "past-votes-1",
            token(),
            "getPastVotes",
            vec![
                Arg::address(first.address()),
                Arg::block_of("latest-block", -1),
            ],
        )
        .in_units(DEFAULT_DECIMALS),
        Step::send(
            "vote",
            ballot(),
            "vote",
            vec![
                Arg::uint(settings.vote_proposal),
                Arg::uint(settings.vote_amount),
            ],
            first,
        ),
        Step::read(
            "voting-power-spent-1",
            ballot(),
            "votingPowerSpent",
            vec![Arg::address(first.address())],
        ),
    ]);
    steps.extend(proposal_reads("proposal-after-vote", names.len()));
    Ok(steps)
}

