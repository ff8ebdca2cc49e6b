use std::sync::Arc;

use ballot_sequencer::{Arg, Step, Target};
use ballot_types::{parse_units, Artifact, Signer, DEFAULT_DECIMALS};

use crate::{take_signers, ScenarioConfig, ScenarioError};

/// Mint to one holder, activate its votes by self-delegation, move half of
/// the balance away and read the checkpointed voting power back.
pub fn steps(
    config: &ScenarioConfig,
    token: &Arc<Artifact>,
    signers: &[Signer],
) -> Result<Vec<Step>, ScenarioError> {
    let signers = take_signers(signers, 3)?;
    let (deployer, holder, receiver) = (&signers[0], &signers[1], &signers[2]);
    let minted = parse_units(&config.erc20_votes.mint, DEFAULT_DECIMALS)?;
    let deployed = || Target::deployed("deploy");
    let votes = |label: &str, signer: &Signer| {
        Step::read(
            label,
            deployed(),
            "getVotes",
            vec![Arg::address(signer.address())],
        )
        .in_units(DEFAULT_DECIMALS)
    };

    Ok(vec![
        Step::deploy("deploy", token, Vec::new(), deployer),
        Step::send(
            "mint",
            deployed(),
            "mint",
            vec![Arg::address(holder.address()), Arg::uint(minted)],
            deployer,
        ),
        Step::read(
            "balance",
            deployed(),
            "balanceOf",
            vec![Arg::address(holder.address())],
        )
        .in_units(DEFAULT_DECIMALS),
        votes("votes-before-delegate", holder),
        Step::send(
            "self-delegate",
            deployed(),
            "delegate",
            vec![Arg::address(holder.address())],
            holder,
        ),
        votes("votes-after-delegate", holder),
        Step::send(
            "transfer",
            deployed(),
            "transfer",
            vec![Arg::address(receiver.address()), Arg::uint(minted / 2)],
            holder,
        ),
        votes("holder-votes-after-transfer", holder),
        votes("receiver-votes-after-transfer", receiver),
        Step::latest_block("latest-block"),
        Step::read(
            "past-votes",
            deployed(),
            "getPastVotes",
            vec![
                Arg::address(holder.address()),
                Arg::block_of("latest-block", -1),
            ],
        )
        .in_units(DEFAULT_DECIMALS),
    ])
}
