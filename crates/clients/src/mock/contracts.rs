use std::collections::HashMap;

use web3::ethabi::Token;
use web3::types::{Address, U256};

use super::{args, MockContract, MockEnv};

/// Contract names as they appear in artifact paths.
pub const BALLOT: &str = "Ballot";
pub const ERC20_VOTES: &str = "MyERC20Votes";
pub const TOKENIZED_BALLOT: &str = "TokenizedBallot";

fn unknown(contract: &str, method: &str) -> String {
    format!("{contract}: function selector for {method} was not recognized")
}

#[derive(Clone, Debug)]
struct Proposal {
    name: Vec<u8>,
    vote_count: U256,
}

#[derive(Clone, Debug, Default)]
struct Proposals(Vec<Proposal>);

impl Proposals {
    fn new(names: Vec<Vec<u8>>) -> Self {
        Proposals(
            names
                .into_iter()
                .map(|name| Proposal {
                    name,
                    vote_count: U256::zero(),
                })
                .collect(),
        )
    }

    fn get(&self, index: U256) -> Result<&Proposal, String> {
        if index >= U256::from(self.0.len()) {
            return Err("reverted with panic code 0x32 (Array accessed at an out-of-bounds or negative index)".to_string());
        }
        Ok(&self.0[index.as_usize()])
    }

    fn add_votes(&mut self, index: U256, amount: U256) -> Result<(), String> {
        self.get(index)?;
        let proposal = &mut self.0[index.as_usize()];
        proposal.vote_count = proposal.vote_count.saturating_add(amount);
        Ok(())
    }

    fn winning(&self) -> U256 {
        let mut winner = 0usize;
        let mut best = U256::zero();
        for (i, p) in self.0.iter().enumerate() {
            if p.vote_count > best {
                best = p.vote_count;
                winner = i;
            }
        }
        U256::from(winner)
    }

    fn query(&self, method: &str, args: &[Token]) -> Option<Result<Vec<Token>, String>> {
        let res = match method {
            "proposals" => args::uint(args, 0).and_then(|i| {
                let p = self.get(i)?;
                Ok(vec![
                    Token::FixedBytes(p.name.clone()),
                    Token::Uint(p.vote_count),
                ])
            }),
            "winningProposal" => Ok(vec![Token::Uint(self.winning())]),
            "winnerName" => {
                let winner = self.get(self.winning()).map(|p| p.name.clone());
                winner.map(|name| vec![Token::FixedBytes(name)])
            }
            _ => return None,
        };
        Some(res)
    }
}

#[derive(Clone, Debug, Default)]
struct Voter {
    weight: U256,
    voted: bool,
    delegate: Address,
    vote: U256,
}

/// Chairperson-managed ballot where one right to vote is one vote.
pub struct MockBallot {
    chairperson: Address,
    voters: HashMap<Address, Voter>,
    proposals: Proposals,
}

impl MockBallot {
    pub fn deploy(env: &MockEnv<'_>, args: &[Token]) -> Result<Box<dyn MockContract>, String> {
        let names = args::bytes32_array(args, 0)?;
        let mut voters = HashMap::new();
        voters.insert(
            env.sender,
            Voter {
                weight: U256::one(),
                ..Default::default()
            },
        );
        Ok(Box::new(MockBallot {
            chairperson: env.sender,
            voters,
            proposals: Proposals::new(names),
        }))
    }

    fn voter(&self, address: &Address) -> Voter {
        self.voters.get(address).cloned().unwrap_or_default()
    }

    fn give_right_to_vote(&mut self, sender: Address, voter: Address) -> Result<(), String> {
        if sender != self.chairperson {
            return Err("Only chairperson can give right to vote.".to_string());
        }
        let current = self.voter(&voter);
        if current.voted {
            return Err("The voter already voted.".to_string());
        }
        if !current.weight.is_zero() {
            return Err("reverted without a reason".to_string());
        }
        self.voters.entry(voter).or_default().weight = U256::one();
        Ok(())
    }

    fn delegate(&mut self, sender: Address, to: Address) -> Result<(), String> {
        let me = self.voter(&sender);
        if me.weight.is_zero() {
            return Err("You have no right to vote".to_string());
        }
        if me.voted {
            return Err("You already voted.".to_string());
        }
        if to == sender {
            return Err("Self-delegation is disallowed.".to_string());
        }

        let mut to = to;
        loop {
            let next = self.voter(&to).delegate;
            if next.is_zero() {
                break;
            }
            to = next;
            if to == sender {
                return Err("Found loop in delegation.".to_string());
            }
        }

        let delegate = self.voter(&to);
        if delegate.weight.is_zero() {
            return Err("reverted without a reason".to_string());
        }

        {
            let me = self.voters.entry(sender).or_default();
            me.voted = true;
            me.delegate = to;
        }
        if delegate.voted {
            self.proposals.add_votes(delegate.vote, me.weight)?;
        } else {
            let d = self.voters.entry(to).or_default();
            d.weight = d.weight.saturating_add(me.weight);
        }
        Ok(())
    }

    fn vote(&mut self, sender: Address, proposal: U256) -> Result<(), String> {
        let me = self.voter(&sender);
        if me.weight.is_zero() {
            return Err("Has no right to vote".to_string());
        }
        if me.voted {
            return Err("Already voted.".to_string());
        }
        self.proposals.add_votes(proposal, me.weight)?;
        let me = self.voters.entry(sender).or_default();
        me.voted = true;
        me.vote = proposal;
        Ok(())
    }
}

impl MockContract for MockBallot {
    fn transact(&mut self, env: &MockEnv<'_>, method: &str, args: &[Token]) -> Result<(), String> {
        match method {
            "giveRightToVote" => self.give_right_to_vote(env.sender, args::address(args, 0)?),
            "delegate" => self.delegate(env.sender, args::address(args, 0)?),
            "vote" => self.vote(env.sender, args::uint(args, 0)?),
            _ => Err(unknown(BALLOT, method)),
        }
    }

    fn query(&self, _env: &MockEnv<'_>, method: &str, args: &[Token]) -> Result<Vec<Token>, String> {
        if let Some(res) = self.proposals.query(method, args) {
            return res;
        }
        match method {
            "chairperson" => Ok(vec![Token::Address(self.chairperson)]),
            "voters" => {
                let v = self.voter(&args::address(args, 0)?);
                Ok(vec![
                    Token::Uint(v.weight),
                    Token::Bool(v.voted),
                    Token::Address(v.delegate),
                    Token::Uint(v.vote),
                ])
            }
            _ => Err(unknown(BALLOT, method)),
        }
    }
}

/// ERC20 with vote delegation and per-block checkpoints. Only the deployer
/// holds the minter role.
pub struct MockErc20Votes {
    minter: Address,
    balances: HashMap<Address, U256>,
    delegates: HashMap<Address, Address>,
    checkpoints: HashMap<Address, Vec<(u64, U256)>>,
    total_supply: U256,
}

impl MockErc20Votes {
    pub fn deploy(env: &MockEnv<'_>, _args: &[Token]) -> Result<Box<dyn MockContract>, String> {
        Ok(Box::new(MockErc20Votes {
            minter: env.sender,
            balances: HashMap::new(),
            delegates: HashMap::new(),
            checkpoints: HashMap::new(),
            total_supply: U256::zero(),
        }))
    }

    fn balance(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn delegate_of(&self, account: &Address) -> Address {
        self.delegates.get(account).copied().unwrap_or_default()
    }

    fn votes(&self, account: &Address) -> U256 {
        self.checkpoints
            .get(account)
            .and_then(|c| c.last())
            .map(|(_, votes)| *votes)
            .unwrap_or_default()
    }

    fn past_votes(&self, account: &Address, block: U256, current: u64) -> Result<U256, String> {
        if block >= U256::from(current) {
            return Err("ERC20Votes: block not yet mined".to_string());
        }
        let block = block.as_u64();
        Ok(self
            .checkpoints
            .get(account)
            .and_then(|c| c.iter().rev().find(|(from, _)| *from <= block))
            .map(|(_, votes)| *votes)
            .unwrap_or_default())
    }

    fn write_checkpoint(&mut self, account: Address, block: u64, votes: U256) {
        let checkpoints = self.checkpoints.entry(account).or_default();
        match checkpoints.last_mut() {
            Some((from, value)) if *from == block => *value = votes,
            _ => checkpoints.push((block, votes)),
        }
    }

    fn move_voting_power(&mut self, from: Address, to: Address, amount: U256, block: u64) {
        if from == to || amount.is_zero() {
            return;
        }
        if !from.is_zero() {
            let votes = self.votes(&from).saturating_sub(amount);
            self.write_checkpoint(from, block, votes);
        }
        if !to.is_zero() {
            let votes = self.votes(&to).saturating_add(amount);
            self.write_checkpoint(to, block, votes);
        }
    }

    fn transfer(&mut self, env: &MockEnv<'_>, to: Address, amount: U256) -> Result<(), String> {
        if to.is_zero() {
            return Err("ERC20: transfer to the zero address".to_string());
        }
        let from = env.sender;
        let balance = self.balance(&from);
        if balance < amount {
            return Err("ERC20: transfer amount exceeds balance".to_string());
        }
        self.balances.insert(from, balance - amount);
        let to_balance = self.balance(&to);
        self.balances.insert(to, to_balance.saturating_add(amount));
        let (from_delegate, to_delegate) = (self.delegate_of(&from), self.delegate_of(&to));
        self.move_voting_power(from_delegate, to_delegate, amount, env.block_number);
        Ok(())
    }

    fn mint(&mut self, env: &MockEnv<'_>, to: Address, amount: U256) -> Result<(), String> {
        if env.sender != self.minter {
            return Err(format!(
                "AccessControl: account {:?} is missing role MINTER_ROLE",
                env.sender
            ));
        }
        if to.is_zero() {
            return Err("ERC20: mint to the zero address".to_string());
        }
        self.total_supply = self.total_supply.saturating_add(amount);
        let balance = self.balance(&to);
        self.balances.insert(to, balance.saturating_add(amount));
        let delegate = self.delegate_of(&to);
        self.move_voting_power(Address::zero(), delegate, amount, env.block_number);
        Ok(())
    }

    fn delegate(&mut self, env: &MockEnv<'_>, delegatee: Address) {
        let old = self.delegate_of(&env.sender);
        self.delegates.insert(env.sender, delegatee);
        let balance = self.balance(&env.sender);
        self.move_voting_power(old, delegatee, balance, env.block_number);
    }
}

impl MockContract for MockErc20Votes {
    fn transact(&mut self, env: &MockEnv<'_>, method: &str, args: &[Token]) -> Result<(), String> {
        match method {
            "mint" => self.mint(env, args::address(args, 0)?, args::uint(args, 1)?),
            "transfer" => self.transfer(env, args::address(args, 0)?, args::uint(args, 1)?),
            "delegate" => {
                self.delegate(env, args::address(args, 0)?);
                Ok(())
            }
            _ => Err(unknown(ERC20_VOTES, method)),
        }
    }

    fn query(&self, env: &MockEnv<'_>, method: &str, args: &[Token]) -> Result<Vec<Token>, String> {
        let value = match method {
            "balanceOf" => Token::Uint(self.balance(&args::address(args, 0)?)),
            "totalSupply" => Token::Uint(self.total_supply),
            "getVotes" => Token::Uint(self.votes(&args::address(args, 0)?)),
            "getPastVotes" => Token::Uint(self.past_votes(
                &args::address(args, 0)?,
                args::uint(args, 1)?,
                env.block_number,
            )?),
            "delegates" => Token::Address(self.delegate_of(&args::address(args, 0)?)),
            _ => return Err(unknown(ERC20_VOTES, method)),
        };
        Ok(vec![value])
    }
}

/// Ballot weighted by token voting power at a fixed past block.
pub struct MockTokenizedBallot {
    token: Address,
    target_block: U256,
    proposals: Proposals,
    spent: HashMap<Address, U256>,
}

impl MockTokenizedBallot {
    pub fn deploy(_env: &MockEnv<'_>, args: &[Token]) -> Result<Box<dyn MockContract>, String> {
        Ok(Box::new(MockTokenizedBallot {
            proposals: Proposals::new(args::bytes32_array(args, 0)?),
            token: args::address(args, 1)?,
            target_block: args::uint(args, 2)?,
            spent: HashMap::new(),
        }))
    }

    fn spent(&self, account: &Address) -> U256 {
        self.spent.get(account).copied().unwrap_or_default()
    }

    fn voting_power(&self, env: &MockEnv<'_>, account: Address) -> Result<U256, String> {
        let past = env.query(
            self.token,
            "getPastVotes",
            &[Token::Address(account), Token::Uint(self.target_block)],
        )?;
        let past = args::uint(&past, 0)?;
        Ok(past.saturating_sub(self.spent(&account)))
    }
}

impl MockContract for MockTokenizedBallot {
    fn transact(&mut self, env: &MockEnv<'_>, method: &str, args: &[Token]) -> Result<(), String> {
        match method {
            "vote" => {
                let proposal = args::uint(args, 0)?;
                let amount = args::uint(args, 1)?;
                if self.voting_power(env, env.sender)? < amount {
                    return Err("TokenizedBallot: trying to vote more than allowed".to_string());
                }
                self.proposals.add_votes(proposal, amount)?;
                let spent = self.spent(&env.sender);
                self.spent.insert(env.sender, spent.saturating_add(amount));
                Ok(())
            }
            _ => Err(unknown(TOKENIZED_BALLOT, method)),
        }
    }

    fn query(&self, env: &MockEnv<'_>, method: &str, args: &[Token]) -> Result<Vec<Token>, String> {
        if let Some(res) = self.proposals.query(method, args) {
            return res;
        }
        match method {
            "votingPowerSpent" => Ok(vec![Token::Uint(self.spent(&args::address(args, 0)?))]),
            "votingPower" => Ok(vec![Token::Uint(
                self.voting_power(env, args::address(args, 0)?)?,
            )]),
            "tokenContract" => Ok(vec![Token::Address(self.token)]),
            "targetBlockNumber" => Ok(vec![Token::Uint(self.target_block)]),
            _ => Err(unknown(TOKENIZED_BALLOT, method)),
        }
    }
}
