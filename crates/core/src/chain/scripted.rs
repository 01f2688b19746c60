//! In-memory chain used by tests and dry runs.
//!
//! Understands exactly the calls the swap flow makes: quoter reads, ERC-20
//! balance/allowance/approve, WETH deposit and router multicall. Swaps spend
//! the input token from the sender's scripted balance.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;

use crate::chain::abi::{IERC20, IQuoterV2, ISwapRouter02, IWETH9};
use crate::chain::{ChainClient, ChainConnector, ChainError, TransactionCall, TxReceipt};
use crate::domain::token::WETH;

/// How a pool answers the quoter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolScript {
    /// Both quoter forms return this output.
    Quoted(U256),
    /// Single-pool form reverts; the path form returns this output.
    PathOnly(U256),
}

#[derive(Default)]
struct ScriptedState {
    unreachable: bool,
    block_probe_fails: bool,
    gas_price: Option<u128>,
    gas_estimate: Option<u64>,
    pools: HashMap<(Address, Address, u32), PoolScript>,
    balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    strict_allowance_tokens: HashSet<Address>,
    withhold_receipts: bool,
    revert_swaps: bool,
    static_calls: Vec<TransactionCall>,
    sent: Vec<TransactionCall>,
    receipts: HashMap<TxHash, TxReceipt>,
    nonce: u64,
}

pub struct ScriptedChain {
    signer: Option<Address>,
    state: Mutex<ScriptedState>,
}

impl Default for ScriptedChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedChain {
    pub fn new() -> Self {
        Self { signer: None, state: Mutex::new(ScriptedState::default()) }
    }

    pub fn with_signer(mut self, signer: Address) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn unreachable(self) -> Self {
        self.state().unreachable = true;
        self
    }

    pub fn failing_block_probe(self) -> Self {
        self.state().block_probe_fails = true;
        self
    }

    pub fn with_gas_price(self, wei: u128) -> Self {
        self.state().gas_price = Some(wei);
        self
    }

    pub fn with_gas_estimate(self, units: u64) -> Self {
        self.state().gas_estimate = Some(units);
        self
    }

    pub fn with_pool(self, token_in: Address, token_out: Address, fee: u32, script: PoolScript) -> Self {
        self.state().pools.insert((token_in, token_out, fee), script);
        self
    }

    pub fn with_balance(self, token: Address, owner: Address, amount: U256) -> Self {
        self.state().balances.insert((token, owner), amount);
        self
    }

    pub fn with_allowance(self, token: Address, owner: Address, spender: Address, amount: U256) -> Self {
        self.state().allowances.insert((token, owner, spender), amount);
        self
    }

    /// Approvals from one non-zero allowance to another revert for this token.
    pub fn with_strict_allowance(self, token: Address) -> Self {
        self.state().strict_allowance_tokens.insert(token);
        self
    }

    pub fn withholding_receipts(self) -> Self {
        self.state().withhold_receipts = true;
        self
    }

    pub fn reverting_swaps(self) -> Self {
        self.state().revert_swaps = true;
        self
    }

    pub fn sent_transactions(&self) -> Vec<TransactionCall> {
        self.state().sent.clone()
    }

    pub fn static_calls(&self) -> Vec<TransactionCall> {
        self.state().static_calls.clone()
    }

    pub fn balance(&self, token: Address, owner: Address) -> U256 {
        self.state().balances.get(&(token, owner)).copied().unwrap_or_default()
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.state().allowances.get(&(token, owner, spender)).copied().unwrap_or_default()
    }

    fn state(&self) -> MutexGuard<'_, ScriptedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reachable(&self) -> Result<MutexGuard<'_, ScriptedState>, ChainError> {
        let state = self.state();
        if state.unreachable {
            return Err(ChainError::Rpc("connection refused".to_string()));
        }
        Ok(state)
    }
}

fn word(value: U256) -> [u8; 32] {
    value.to_be_bytes::<32>()
}

fn revert() -> ChainError {
    ChainError::Rpc("execution reverted".to_string())
}

fn selector(data: &[u8]) -> Option<[u8; 4]> {
    data.get(..4).and_then(|bytes| bytes.try_into().ok())
}

fn quote_single_return(amount_out: U256) -> Bytes {
    let mut out = Vec::with_capacity(128);
    out.extend_from_slice(&word(amount_out));
    out.extend_from_slice(&[0u8; 96]);
    out.into()
}

fn quote_path_return(amount_out: U256) -> Bytes {
    let mut out = Vec::with_capacity(192);
    out.extend_from_slice(&word(amount_out));
    out.extend_from_slice(&word(U256::from(0x80u64)));
    out.extend_from_slice(&word(U256::from(0xa0u64)));
    out.extend_from_slice(&[0u8; 96]);
    out.into()
}

#[async_trait]
impl ChainClient for ScriptedChain {
    async fn block_number(&self) -> Result<u64, ChainError> {
        let state = self.reachable()?;
        if state.block_probe_fails {
            return Err(ChainError::Rpc("method eth_blockNumber not allowed".to_string()));
        }
        Ok(19_000_000 + state.nonce)
    }

    async fn call(&self, call: &TransactionCall) -> Result<Bytes, ChainError> {
        let mut state = self.reachable()?;
        state.static_calls.push(call.clone());
        let data = call.data.as_ref();

        match selector(data) {
            Some(s) if s == IQuoterV2::quoteExactInputSingleCall::SELECTOR => {
                let decoded = IQuoterV2::quoteExactInputSingleCall::abi_decode(data)
                    .map_err(|error| ChainError::Decode(error.to_string()))?;
                let key = (
                    decoded.params.tokenIn,
                    decoded.params.tokenOut,
                    decoded.params.fee.to::<u32>(),
                );
                match state.pools.get(&key) {
                    Some(PoolScript::Quoted(amount)) => Ok(quote_single_return(*amount)),
                    _ => Err(revert()),
                }
            }
            Some(s) if s == IQuoterV2::quoteExactInputCall::SELECTOR => {
                let decoded = IQuoterV2::quoteExactInputCall::abi_decode(data)
                    .map_err(|error| ChainError::Decode(error.to_string()))?;
                let path = decoded.path.as_ref();
                if path.len() != 43 {
                    return Err(revert());
                }
                let token_in = Address::from_slice(&path[..20]);
                let fee = u32::from_be_bytes([0, path[20], path[21], path[22]]);
                let token_out = Address::from_slice(&path[23..]);
                match state.pools.get(&(token_in, token_out, fee)) {
                    Some(PoolScript::Quoted(amount)) | Some(PoolScript::PathOnly(amount)) => {
                        Ok(quote_path_return(*amount))
                    }
                    None => Err(revert()),
                }
            }
            Some(s) if s == IERC20::balanceOfCall::SELECTOR => {
                let decoded = IERC20::balanceOfCall::abi_decode(data)
                    .map_err(|error| ChainError::Decode(error.to_string()))?;
                let balance =
                    state.balances.get(&(call.to, decoded.account)).copied().unwrap_or_default();
                Ok(word(balance).to_vec().into())
            }
            Some(s) if s == IERC20::allowanceCall::SELECTOR => {
                let decoded = IERC20::allowanceCall::abi_decode(data)
                    .map_err(|error| ChainError::Decode(error.to_string()))?;
                let allowance = state
                    .allowances
                    .get(&(call.to, decoded.owner, decoded.spender))
                    .copied()
                    .unwrap_or_default();
                Ok(word(allowance).to_vec().into())
            }
            _ => Err(revert()),
        }
    }

    async fn estimate_gas(&self, _call: &TransactionCall) -> Result<u64, ChainError> {
        let state = self.reachable()?;
        state.gas_estimate.ok_or_else(|| ChainError::Rpc("gas estimation failed".to_string()))
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        let state = self.reachable()?;
        state.gas_price.ok_or_else(|| ChainError::Rpc("fee data unavailable".to_string()))
    }

    async fn send_transaction(&self, call: &TransactionCall) -> Result<TxHash, ChainError> {
        let from = call.from.or(self.signer).ok_or(ChainError::MissingSigner)?;
        // Broadcasting is a round trip; other tasks may run before it lands.
        tokio::task::yield_now().await;
        let mut state = self.reachable()?;
        let data = call.data.as_ref();
        let mut success = true;

        match selector(data) {
            Some(s) if s == IWETH9::depositCall::SELECTOR && call.to == WETH => {
                let entry = state.balances.entry((WETH, from)).or_default();
                *entry += call.value;
            }
            Some(s) if s == IERC20::approveCall::SELECTOR => {
                let decoded = IERC20::approveCall::abi_decode(data)
                    .map_err(|error| ChainError::Decode(error.to_string()))?;
                let key = (call.to, from, decoded.spender);
                let current = state.allowances.get(&key).copied().unwrap_or_default();
                let strict = state.strict_allowance_tokens.contains(&call.to);
                if strict && !current.is_zero() && !decoded.value.is_zero() {
                    return Err(revert());
                }
                state.allowances.insert(key, decoded.value);
            }
            Some(s) if s == ISwapRouter02::multicallCall::SELECTOR => {
                success = !state.revert_swaps;
                if success {
                    let decoded = ISwapRouter02::multicallCall::abi_decode(data)
                        .map_err(|error| ChainError::Decode(error.to_string()))?;
                    for inner in &decoded.data {
                        let Ok(swap) = ISwapRouter02::exactInputSingleCall::abi_decode(inner) else {
                            continue;
                        };
                        let entry = state.balances.entry((swap.params.tokenIn, from)).or_default();
                        *entry = entry.saturating_sub(swap.params.amountIn);
                    }
                }
            }
            _ => return Err(revert()),
        }

        state.nonce += 1;
        let tx_hash = TxHash::from(word(U256::from(state.nonce)));
        state.sent.push(TransactionCall { from: Some(from), ..call.clone() });
        if !state.withhold_receipts {
            let block_number = Some(19_000_000 + state.nonce);
            state.receipts.insert(tx_hash, TxReceipt { tx_hash, block_number, success });
        }
        Ok(tx_hash)
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>, ChainError> {
        let state = self.reachable()?;
        Ok(state.receipts.get(&tx_hash).copied())
    }

    fn signer_address(&self) -> Option<Address> {
        self.signer
    }
}

/// Maps endpoint URLs to scripted chains; unknown URLs fail to connect.
#[derive(Default)]
pub struct ScriptedConnector {
    endpoints: HashMap<String, Arc<ScriptedChain>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, endpoint: &str, chain: Arc<ScriptedChain>) -> Self {
        self.endpoints.insert(endpoint.to_string(), chain);
        self
    }
}

impl ChainConnector for ScriptedConnector {
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn ChainClient>, ChainError> {
        match self.endpoints.get(endpoint) {
            Some(chain) => Ok(chain.clone() as Arc<dyn ChainClient>),
            None => Err(ChainError::Connect {
                endpoint: endpoint.to_string(),
                reason: "no scripted chain for endpoint".to_string(),
            }),
        }
    }
}
