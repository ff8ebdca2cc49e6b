//! In-memory chain used for testing step sequences without a node.
//!
//! `MockChain` mines one block per accepted transaction, the way a
//! development node with automine does, and keeps a journal of every
//! submission, receipt poll and read so tests can assert on ordering.

mod contracts;

pub use contracts::*;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ballot_types::{Artifact, BlockSummary, ContractHandle, Receipt, Signer, TxOptions};
use tokio::sync::Mutex;
use web3::ethabi::Token;
use web3::types::{Address, H256, U256};

use crate::{ChainClient, ChainError};

/// Number of funded accounts a fresh [`MockChain`] exposes.
pub const MOCK_ACCOUNTS: u64 = 10;

/// A contract living on the mock chain.
pub trait MockContract: Send + Sync {
    fn transact(&mut self, env: &MockEnv<'_>, method: &str, args: &[Token]) -> Result<(), String>;

    fn query(&self, env: &MockEnv<'_>, method: &str, args: &[Token]) -> Result<Vec<Token>, String>;
}

pub type MockFactory =
    Arc<dyn Fn(&MockEnv<'_>, &[Token]) -> Result<Box<dyn MockContract>, String> + Send + Sync>;

/// Execution context handed to mock contracts.
pub struct MockEnv<'a> {
    pub sender: Address,
    pub block_number: u64,
    contracts: &'a HashMap<Address, Box<dyn MockContract>>,
}

impl<'a> MockEnv<'a> {
    /// Read-only call into another contract.
    pub fn query(&self, address: Address, method: &str, args: &[Token]) -> Result<Vec<Token>, String> {
        let contract = self
            .contracts
            .get(&address)
            .ok_or_else(|| format!("no contract at {address:?}"))?;
        contract.query(self, method, args)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Submitted { hash: H256, method: String, from: Address },
    Rejected { method: String, reason: String },
    ReceiptPending { hash: H256 },
    ReceiptObserved { hash: H256 },
    Read { method: String, to: Address },
}

struct PendingReceipt {
    receipt: Receipt,
    polls_left: usize,
}

struct MockState {
    block_number: u64,
    next_hash: u64,
    next_contract: u64,
    accounts: Vec<Address>,
    balances: HashMap<Address, U256>,
    factories: HashMap<String, MockFactory>,
    contracts: HashMap<Address, Box<dyn MockContract>>,
    receipts: HashMap<H256, PendingReceipt>,
    events: Vec<MockEvent>,
    receipt_delay: usize,
    mine_reverts: bool,
}

/// Cheap to clone; clones share the same chain.
#[derive(Clone)]
pub struct MockChain(Arc<Mutex<MockState>>);

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    pub fn new() -> Self {
        let accounts: Vec<Address> = (1..=MOCK_ACCOUNTS)
            .map(|i| Address::from_low_u64_be(0xacc0 + i))
            .collect();
        let funds = U256::exp10(22);
        let balances = accounts.iter().map(|a| (*a, funds)).collect();
        MockChain(Arc::new(Mutex::new(MockState {
            block_number: 0,
            next_hash: 1,
            next_contract: 1,
            accounts,
            balances,
            factories: HashMap::new(),
            contracts: HashMap::new(),
            receipts: HashMap::new(),
            events: Vec::new(),
            receipt_delay: 0,
            mine_reverts: false,
        })))
    }

    /// A chain with the ballot, token and tokenized ballot behaviours registered.
    pub async fn with_voting_contracts() -> Self {
        let chain = Self::new();
        chain.register(BALLOT, Arc::new(MockBallot::deploy)).await;
        chain.register(ERC20_VOTES, Arc::new(MockErc20Votes::deploy)).await;
        chain
            .register(TOKENIZED_BALLOT, Arc::new(MockTokenizedBallot::deploy))
            .await;
        chain
    }

    /// Deploying an artifact named `name` runs `factory`.
    pub async fn register(&self, name: &str, factory: MockFactory) {
        self.0.lock().await.factories.insert(name.to_string(), factory);
    }

    /// Receipts become visible only after `polls` unsuccessful polls.
    pub async fn set_receipt_delay(&self, polls: usize) {
        self.0.lock().await.receipt_delay = polls;
    }

    /// Mine reverted transactions with a failed status instead of
    /// rejecting them at submission.
    pub async fn set_mine_reverts(&self, mine: bool) {
        self.0.lock().await.mine_reverts = mine;
    }

    pub async fn set_balance(&self, address: Address, amount: U256) {
        self.0.lock().await.balances.insert(address, amount);
    }

    pub async fn events(&self) -> Vec<MockEvent> {
        self.0.lock().await.events.clone()
    }

    pub async fn block_number(&self) -> u64 {
        self.0.lock().await.block_number
    }

    /// Mines `blocks` empty blocks.
    pub async fn advance(&self, blocks: u64) {
        self.0.lock().await.block_number += blocks;
    }

    async fn mine(
        &self,
        signer: &Signer,
        method: String,
        execute: impl FnOnce(&mut MockState, u64) -> Result<Option<Address>, String> + Send,
    ) -> Result<H256, ChainError> {
        let mut state = self.0.lock().await;
        let from = signer.address();
        if state.balances.get(&from).copied().unwrap_or_default().is_zero() {
            let reason = format!("insufficient funds for gas * price + value from {from:?}");
            state.events.push(MockEvent::Rejected {
                method,
                reason: reason.clone(),
            });
            return Err(ChainError::Authorization(reason));
        }

        let block_number = state.block_number + 1;
        let (contract_address, success) = match execute(&mut *state, block_number) {
            Ok(created) => (created, true),
            Err(reason) if !state.mine_reverts => {
                state.events.push(MockEvent::Rejected {
                    method,
                    reason: reason.clone(),
                });
                return Err(ChainError::Reverted(reason));
            }
            Err(_) => (None, false),
        };

        state.block_number = block_number;
        let hash = H256::from_low_u64_be(state.next_hash);
        state.next_hash += 1;
        let polls_left = state.receipt_delay;
        state.receipts.insert(
            hash,
            PendingReceipt {
                receipt: Receipt {
                    transaction_hash: hash,
                    block_number,
                    block_hash: Some(H256::from_low_u64_be(0xb10c_0000 + block_number)),
                    gas_used: Some(U256::from(21_000u64)),
                    contract_address,
                    success,
                },
                polls_left,
            },
        );
        state.events.push(MockEvent::Submitted { hash, method, from });
        Ok(hash)
    }
}

impl MockState {
    /// Runs a transaction against the contract at `address`. The contract
    /// is taken out of the map so it can read the others while mutating.
    fn transact(
        &mut self,
        sender: Address,
        block_number: u64,
        address: Address,
        method: &str,
        args: &[Token],
    ) -> Result<(), String> {
        let mut contract = self
            .contracts
            .remove(&address)
            .ok_or_else(|| format!("no contract at {address:?}"))?;
        let res = {
            let env = MockEnv {
                sender,
                block_number,
                contracts: &self.contracts,
            };
            contract.transact(&env, method, args)
        };
        self.contracts.insert(address, contract);
        res
    }
}

/// Handles built from a real ABI only accept methods it declares, like
/// the web3 client. An empty ABI lets every method through.
fn check_method(contract: &ContractHandle, method: &str) -> Result<(), ChainError> {
    let abi = contract.artifact().abi();
    if abi.functions().next().is_some() && abi.function(method).is_err() {
        return Err(ChainError::UnknownMethod {
            contract: contract.name().to_string(),
            method: method.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl ChainClient for MockChain {
    async fn latest_block(&self) -> Result<BlockSummary, ChainError> {
        let number = self.0.lock().await.block_number;
        Ok(BlockSummary {
            number,
            hash: Some(H256::from_low_u64_be(0xb10c_0000 + number)),
        })
    }

    async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        Ok(self
            .0
            .lock()
            .await
            .balances
            .get(&address)
            .copied()
            .unwrap_or_default())
    }

    async fn code_at(&self, address: Address) -> Result<Vec<u8>, ChainError> {
        let state = self.0.lock().await;
        Ok(if state.contracts.contains_key(&address) {
            vec![0x60, 0x80]
        } else {
            Vec::new()
        })
    }

    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        Ok(self.0.lock().await.accounts.clone())
    }

    async fn deploy(
        &self,
        signer: &Signer,
        artifact: &Artifact,
        args: &[Token],
        _options: TxOptions,
    ) -> Result<H256, ChainError> {
        let name = artifact.name().to_string();
        let factory = self
            .0
            .lock()
            .await
            .factories
            .get(&name)
            .cloned()
            .ok_or_else(|| ChainError::UnknownArtifact(name.clone()))?;
        let sender = signer.address();
        let args = args.to_vec();
        self.mine(signer, format!("{name} constructor"), move |state, block_number| {
            let contract = {
                let env = MockEnv {
                    sender,
                    block_number,
                    contracts: &state.contracts,
                };
                factory(&env, &args)?
            };
            let address = Address::from_low_u64_be(0xc0_0000 + state.next_contract);
            state.next_contract += 1;
            state.contracts.insert(address, contract);
            Ok(Some(address))
        })
        .await
    }

    async fn send(
        &self,
        signer: &Signer,
        contract: &ContractHandle,
        method: &str,
        args: &[Token],
        _options: TxOptions,
    ) -> Result<H256, ChainError> {
        check_method(contract, method)?;
        let sender = signer.address();
        let address = contract.address();
        let method_name = method.to_string();
        let args = args.to_vec();
        self.mine(signer, method.to_string(), move |state, block_number| {
            state.transact(sender, block_number, address, &method_name, &args)?;
            Ok(None)
        })
        .await
    }

    async fn call(
        &self,
        contract: &ContractHandle,
        method: &str,
        args: &[Token],
        from: Option<Address>,
    ) -> Result<Vec<Token>, ChainError> {
        check_method(contract, method)?;
        let mut state = self.0.lock().await;
        state.events.push(MockEvent::Read {
            method: method.to_string(),
            to: contract.address(),
        });
        let target = state.contracts.get(&contract.address()).ok_or_else(|| {
            ChainError::Decoding {
                method: method.to_string(),
                reason: "call to an address without code returned no data".to_string(),
            }
        })?;
        // calls execute on top of the latest block
        let env = MockEnv {
            sender: from.unwrap_or_default(),
            block_number: state.block_number + 1,
            contracts: &state.contracts,
        };
        target
            .query(&env, method, args)
            .map_err(ChainError::Reverted)
    }

    async fn receipt(&self, hash: H256) -> Result<Option<Receipt>, ChainError> {
        let mut state = self.0.lock().await;
        let pending = state
            .receipts
            .get_mut(&hash)
            .ok_or_else(|| ChainError::Provider(format!("unknown transaction {hash:?}")))?;
        if pending.polls_left > 0 {
            pending.polls_left -= 1;
            state.events.push(MockEvent::ReceiptPending { hash });
            return Ok(None);
        }
        let receipt = pending.receipt.clone();
        state.events.push(MockEvent::ReceiptObserved { hash });
        Ok(Some(receipt))
    }
}

/// Typed accessors for mock contract arguments.
pub mod args {
    use web3::ethabi::Token;
    use web3::types::{Address, U256};

    pub fn address(args: &[Token], index: usize) -> Result<Address, String> {
        match args.get(index) {
            Some(Token::Address(a)) => Ok(*a),
            other => Err(format!("argument {index}: expected address, found {other:?}")),
        }
    }

    pub fn uint(args: &[Token], index: usize) -> Result<U256, String> {
        match args.get(index) {
            Some(Token::Uint(v)) => Ok(*v),
            other => Err(format!("argument {index}: expected uint, found {other:?}")),
        }
    }

    pub fn bytes32_array(args: &[Token], index: usize) -> Result<Vec<Vec<u8>>, String> {
        match args.get(index) {
            Some(Token::Array(items)) => items
                .iter()
                .map(|t| match t {
                    Token::FixedBytes(b) if b.len() == 32 => Ok(b.clone()),
                    other => Err(format!("expected bytes32, found {other:?}")),
                })
                .collect(),
            other => Err(format!("argument {index}: expected bytes32[], found {other:?}")),
        }
    }
}
