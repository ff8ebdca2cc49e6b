#![cfg(test)]
//! Every scenario run end to end against the mock chain.

use std::sync::Arc;

use ballot_clients::MockChain;
use ballot_scenarios::{
    ballot, erc20_votes, node_signers, tokenized_ballot, Contracts, ScenarioConfig,
    SequencerConfig, BALLOT, ERC20_VOTES, TOKENIZED_BALLOT,
};
use ballot_sequencer::{Sequencer, StepOutcome, StepResult};
use ballot_types::{parse_units, Artifact, Signer};
use web3::ethabi::Token;
use web3::signing::SecretKey;
use web3::types::U256;

fn artifact(name: &str) -> Arc<Artifact> {
    let abi = web3::ethabi::Contract::load(&b"[]"[..]).expect("empty abi");
    Arc::new(Artifact::new(name, abi, vec![0x60, 0x80]))
}

fn contracts() -> Contracts {
    Contracts {
        ballot: artifact(BALLOT),
        erc20_votes: artifact(ERC20_VOTES),
        tokenized_ballot: artifact(TOKENIZED_BALLOT),
    }
}

fn sequencer(chain: &MockChain) -> Sequencer<MockChain> {
    SequencerConfig {
        poll_interval_ms: 0,
        ..Default::default()
    }
    .build(chain.clone())
    .expect("failed to build sequencer")
}

fn step<'a>(results: &'a [StepResult], label: &str) -> &'a StepResult {
    results
        .iter()
        .find(|r| r.label == label)
        .unwrap_or_else(|| panic!("no result for {label}"))
}

fn first_value(results: &[StepResult], label: &str) -> Token {
    step(results, label)
        .outcome
        .output(0)
        .cloned()
        .unwrap_or_else(|| panic!("{label} returned no values"))
}

fn tokens(amount: &str) -> Token {
    Token::Uint(parse_units(amount, 18).expect("amount"))
}

#[tokio::test]
async fn local_ballot_delegated_vote_wins() {
    let chain = MockChain::with_voting_contracts().await;
    let signers = node_signers(&chain).await.expect("accounts");
    let mut config = ScenarioConfig::default();
    config.ballot.inspect_voter = signers[1].address();

    let steps = ballot::local(&config, &contracts().ballot, &signers).expect("steps");
    let results = sequencer(&chain).run(&steps).await.expect("run succeeds");
    assert_eq!(results.len(), steps.len());

    assert_eq!(
        first_value(&results, "chairperson"),
        Token::Address(signers[0].address())
    );
    assert_eq!(first_value(&results, "voter-1"), Token::Uint(U256::one()));
    assert_eq!(
        first_value(&results, "voter-1-after-delegate"),
        Token::Uint(U256::from(2u64))
    );
    assert_eq!(first_value(&results, "winner-before-vote"), Token::Uint(U256::zero()));
    assert_eq!(
        first_value(&results, "winner-after-vote"),
        Token::Uint(U256::from(2u64))
    );
    assert_eq!(
        step(&results, "winner-name").to_string(),
        "[12] winner-name: \"proposal_3\""
    );

    // the freshly attached handle sees the vote
    let inspected = step(&results, "inspect-voter").outcome.values().expect("voter");
    assert_eq!(inspected[1], Token::Bool(true));
    assert_eq!(inspected[3], Token::Uint(U256::from(2u64)));
}

#[tokio::test]
async fn remote_ballot_signs_with_a_local_key() {
    let chain = MockChain::with_voting_contracts().await;
    let key: SecretKey = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
        .parse()
        .expect("valid key");
    let signer = Signer::local(key);
    chain
        .set_balance(signer.address(), U256::exp10(18))
        .await;
    let config = ScenarioConfig::default();

    let steps = ballot::remote(&config, &contracts().ballot, &signer).expect("steps");
    let results = sequencer(&chain).run(&steps).await.expect("run succeeds");

    assert!(matches!(
        step(&results, "latest-block").outcome,
        StepOutcome::Block(ref block) if block.number == 0
    ));
    assert_eq!(
        step(&results, "balance").to_string(),
        "[1] balance: balance 1.0 ETH"
    );
    assert_eq!(
        first_value(&results, "chairperson"),
        Token::Address(signer.address())
    );
    assert_eq!(first_value(&results, "voter-1"), Token::Uint(U256::one()));
    assert_eq!(first_value(&results, "voter-2"), Token::Uint(U256::one()));
    assert_eq!(first_value(&results, "winning-proposal"), Token::Uint(U256::zero()));
}

#[tokio::test]
async fn inspect_reads_an_existing_ballot() {
    let chain = MockChain::with_voting_contracts().await;
    let signers = node_signers(&chain).await.expect("accounts");
    let contracts = contracts();
    let config = ScenarioConfig::default();

    let deployed = sequencer(&chain)
        .run(&ballot::local(&config, &contracts.ballot, &signers).expect("steps"))
        .await
        .expect("local run succeeds");
    let address = step(&deployed, "deploy").outcome.address().expect("address");

    let steps = ballot::inspect(&contracts.ballot, address, signers[2].address());
    let results = sequencer(&chain).run(&steps).await.expect("inspect succeeds");
    assert_eq!(
        first_value(&results, "chairperson"),
        Token::Address(signers[0].address())
    );
    let voter = step(&results, "voter").outcome.values().expect("voter");
    assert_eq!(voter[2], Token::Address(signers[1].address()));
}

#[tokio::test]
async fn token_votes_follow_delegation_and_transfers() {
    let chain = MockChain::with_voting_contracts().await;
    let signers = node_signers(&chain).await.expect("accounts");
    let config = ScenarioConfig::default();

    let steps = erc20_votes::steps(&config, &contracts().erc20_votes, &signers).expect("steps");
    let results = sequencer(&chain).run(&steps).await.expect("run succeeds");

    assert_eq!(first_value(&results, "balance"), tokens("10"));
    assert_eq!(first_value(&results, "votes-before-delegate"), tokens("0"));
    assert_eq!(first_value(&results, "votes-after-delegate"), tokens("10"));
    assert_eq!(first_value(&results, "holder-votes-after-transfer"), tokens("5"));
    assert_eq!(first_value(&results, "receiver-votes-after-transfer"), tokens("0"));
    // the block before the transfer still has the full delegation
    assert_eq!(first_value(&results, "past-votes"), tokens("10"));
    assert_eq!(
        step(&results, "balance").to_string(),
        "[2] balance: 10.0"
    );
}

#[tokio::test]
async fn tokenized_ballot_spends_past_voting_power() {
    let chain = MockChain::with_voting_contracts().await;
    let signers = node_signers(&chain).await.expect("accounts");
    let config = ScenarioConfig::default();

    let steps = tokenized_ballot::steps(&config, &contracts(), &signers).expect("steps");
    let results = sequencer(&chain).run(&steps).await.expect("run succeeds");

    assert_eq!(
        step(&results, "self-delegate-2").outcome.block_number(),
        Some(config.tokenized_ballot.target_block)
    );
    assert_eq!(first_value(&results, "votes-1-after-transfer"), tokens("50"));
    assert_eq!(first_value(&results, "votes-2-after-delegate"), tokens("50"));
    // the second delegation leaves the first holder's votes alone
    assert_eq!(first_value(&results, "votes-1-after-delegate-2"), tokens("50"));
    assert_eq!(first_value(&results, "past-votes-1"), tokens("50"));
    assert_eq!(
        first_value(&results, "voting-power-spent-1"),
        Token::Uint(U256::from(50u64))
    );

    let voted = step(&results, "proposal-after-vote-1")
        .outcome
        .values()
        .expect("proposal");
    assert_eq!(voted[1], Token::Uint(U256::from(50u64)));
    let untouched = step(&results, "proposal-after-vote-0")
        .outcome
        .values()
        .expect("proposal");
    assert_eq!(untouched[1], Token::Uint(U256::zero()));
}

#[tokio::test]
async fn tokenized_vote_before_target_block_fails_at_the_vote() {
    let chain = MockChain::with_voting_contracts().await;
    let signers = node_signers(&chain).await.expect("accounts");
    let mut config = ScenarioConfig::default();
    config.tokenized_ballot.target_block = 100;

    let steps = tokenized_ballot::steps(&config, &contracts(), &signers).expect("steps");
    let err = sequencer(&chain).run(&steps).await.unwrap_err();
    let (index, label) = err.failed_step().expect("a step failed");
    assert_eq!(label, "vote");
    assert_eq!(steps[index].label, "vote");
    assert!(err.to_string().contains("ERC20Votes: block not yet mined"));
}

#[tokio::test]
async fn local_scenarios_need_three_accounts() {
    let chain = MockChain::with_voting_contracts().await;
    let signers = node_signers(&chain).await.expect("accounts");
    let err = erc20_votes::steps(&ScenarioConfig::default(), &contracts().erc20_votes, &signers[..2])
        .unwrap_err();
    assert_eq!(err.to_string(), "scenario needs 3 accounts, node has 2");
}
