// In-memory EVM simulator implementing `ChainProvider` at the calldata level.
//
// Contracts: ERC-20 tokens, the fixed-rate swap contract, a Uniswap V2
// factory / pair / router (997/1000 fee, deadline and minimum-output guards).
// Transactions are queued on submission and mined, in order, when a receipt
// is awaited. Reverted transactions roll back state.

#![allow(dead_code)]

use async_trait::async_trait;
use num_traits::Zero;
use parking_lot::Mutex;
use paw_swap::engine::dex::abi::{
    abi_encode_address, abi_encode_string, abi_encode_u64, decode_address, decode_address_array, decode_u64,
    decode_uint256, event_topic, function_selector, SIG_ALLOWANCE, SIG_APPROVE, SIG_BALANCE_OF, SIG_CONVERSION_RATE,
    SIG_DECIMALS, SIG_FIXED_INPUT_TOKEN, SIG_FIXED_OUTPUT_TOKEN, SIG_GET_AMOUNTS_OUT, SIG_GET_PAIR, SIG_GET_RESERVES,
    SIG_ROUTER_FACTORY, SIG_SWAP_EXACT_TOKENS, SIG_SWAP_EXECUTED_EVENT, SIG_SWAP_FIXED, SIG_SYMBOL, SIG_TOKEN0,
    SIG_TOKEN1, SIG_TRANSFER_EVENT,
};
use paw_swap::engine::dex::primitives::{amount_to_word, keccak256, pow10};
use paw_swap::atoms::types::LogEntry;
use paw_swap::{Address, Amount, ChainProvider, SwapError, SwapResult, TxHash, TxReceipt};
use std::collections::HashMap;

pub const CHAIN_ID: u64 = 31_337;

pub fn amount(v: u64) -> Amount {
    Amount::from(v)
}

/// `whole × 10^decimals`
pub fn units(whole: u64, decimals: u8) -> Amount {
    Amount::from(whole) * pow10(decimals as u32)
}

pub fn now() -> u64 {
    chrono::Utc::now().timestamp() as u64
}

// ── Chain state ────────────────────────────────────────────────────────────

#[derive(Clone)]
struct Erc20 {
    symbol: String,
    decimals: u8,
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
}

#[derive(Clone)]
struct FixedRate {
    input: Address,
    output: Address,
    rate: Amount,
}

#[derive(Clone)]
struct Pair {
    token0: Address,
    token1: Address,
    reserve0: Amount,
    reserve1: Amount,
    updated: u32,
}

#[derive(Clone, Default)]
struct Chain {
    tokens: HashMap<Address, Erc20>,
    fixed: HashMap<Address, FixedRate>,
    factories: HashMap<Address, HashMap<(Address, Address), Address>>,
    pairs: HashMap<Address, Pair>,
    routers: HashMap<Address, Address>,
    /// Contracts that revert every call (selfdestructed / paused stand-ins).
    reverting: Vec<Address>,
    /// Routers without `getAmountsOut`.
    no_quote_routers: Vec<Address>,
    /// Contracts answering every call with the same bytes.
    canned: HashMap<Address, Vec<u8>>,
}

/// Ordered record of what reached the simulated chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    Submitted { tx: TxHash, method: &'static str },
    Mined { tx: TxHash, method: &'static str, success: bool },
}

struct PendingTx {
    hash: TxHash,
    from: Address,
    to: Address,
    data: Vec<u8>,
}

struct World {
    chain: Chain,
    next_address: u64,
    next_tx: u64,
    pending: Vec<PendingTx>,
    receipts: HashMap<TxHash, TxReceipt>,
    events: Vec<SimEvent>,
    accounts: Vec<Address>,
    native: HashMap<Address, Amount>,
    failing_calls: u32,
    calls: u64,
}

pub struct Sim {
    world: Mutex<World>,
}

fn pad(addr: &Address) -> [u8; 32] {
    let mut topic = [0u8; 32];
    topic[12..].copy_from_slice(&addr.0);
    topic
}

fn word(v: &Amount) -> Vec<u8> {
    amount_to_word(v).map(|w| w.to_vec()).unwrap_or_else(|_| vec![0xff; 32])
}

fn method_name(selector: &[u8]) -> &'static str {
    for sig in [SIG_APPROVE, SIG_SWAP_FIXED, SIG_SWAP_EXACT_TOKENS] {
        if selector == function_selector(sig) {
            return match sig {
                SIG_APPROVE => "approve",
                SIG_SWAP_FIXED => "swapEURTtoTASK",
                _ => "swapExactTokensForTokens",
            };
        }
    }
    "unknown"
}

fn uniswap_amount_out(amount_in: &Amount, reserve_in: &Amount, reserve_out: &Amount) -> Result<Amount, String> {
    if amount_in.is_zero() {
        return Err("UniswapV2Library: INSUFFICIENT_INPUT_AMOUNT".into());
    }
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err("UniswapV2Library: INSUFFICIENT_LIQUIDITY".into());
    }
    let with_fee = amount_in * 997u32;
    let numerator = &with_fee * reserve_out;
    let denominator = reserve_in * 1000u32 + with_fee;
    Ok(numerator / denominator)
}

impl Chain {
    fn token(&self, token: &Address) -> Result<&Erc20, String> {
        self.tokens.get(token).ok_or_else(|| format!("no token at {}", token))
    }

    fn token_mut(&mut self, token: &Address) -> Result<&mut Erc20, String> {
        self.tokens.get_mut(token).ok_or_else(|| format!("no token at {}", token))
    }

    fn balance(&self, token: &Address, who: &Address) -> Amount {
        self.tokens.get(token).and_then(|t| t.balances.get(who).cloned()).unwrap_or_default()
    }

    fn transfer(&mut self, token: &Address, from: &Address, to: &Address, value: &Amount, logs: &mut Vec<LogEntry>) -> Result<(), String> {
        let t = self.token_mut(token)?;
        let have = t.balances.get(from).cloned().unwrap_or_default();
        if &have < value {
            return Err(format!("ERC20InsufficientBalance({}, {}, {})", from, have, value));
        }
        t.balances.insert(*from, have - value);
        *t.balances.entry(*to).or_default() += value;
        logs.push(LogEntry {
            address: *token,
            topics: vec![event_topic(SIG_TRANSFER_EVENT), pad(from), pad(to)],
            data: word(value),
        });
        Ok(())
    }

    fn transfer_from(
        &mut self,
        token: &Address,
        spender: &Address,
        from: &Address,
        to: &Address,
        value: &Amount,
        logs: &mut Vec<LogEntry>,
    ) -> Result<(), String> {
        let t = self.token_mut(token)?;
        let allowed = t.allowances.get(&(*from, *spender)).cloned().unwrap_or_default();
        if &allowed < value {
            return Err(format!("ERC20InsufficientAllowance({}, {}, {})", spender, allowed, value));
        }
        t.allowances.insert((*from, *spender), allowed - value);
        self.transfer(token, from, to, value, logs)
    }

    fn pair_for(&self, router: &Address, a: &Address, b: &Address) -> Result<Address, String> {
        let factory = self.routers.get(router).ok_or("no router")?;
        let key = if a < b { (*a, *b) } else { (*b, *a) };
        self.factories
            .get(factory)
            .and_then(|f| f.get(&key))
            .copied()
            .ok_or_else(|| "UniswapV2Library: PAIR_NOT_FOUND".to_string())
    }

    fn oriented_reserves(&self, pair: &Address, input: &Address) -> Result<(Amount, Amount), String> {
        let p = self.pairs.get(pair).ok_or("no pair")?;
        if &p.token0 == input {
            Ok((p.reserve0.clone(), p.reserve1.clone()))
        } else {
            Ok((p.reserve1.clone(), p.reserve0.clone()))
        }
    }

    fn amounts_out(&self, router: &Address, amount_in: &Amount, path: &[Address]) -> Result<Vec<Amount>, String> {
        if path.len() < 2 {
            return Err("UniswapV2Library: INVALID_PATH".into());
        }
        let mut amounts = vec![amount_in.clone()];
        for hop in path.windows(2) {
            let pair = self.pair_for(router, &hop[0], &hop[1])?;
            let (r_in, r_out) = self.oriented_reserves(&pair, &hop[0])?;
            let next = uniswap_amount_out(amounts.last().ok_or("empty")?, &r_in, &r_out)?;
            amounts.push(next);
        }
        Ok(amounts)
    }

    /// Read-only dispatch. `Ok(None)` means "no code at this address".
    fn read(&self, to: &Address, data: &[u8]) -> Result<Option<Vec<u8>>, String> {
        if self.reverting.contains(to) {
            return Err("execution reverted".into());
        }
        if data.len() < 4 {
            return Err("execution reverted: no selector".into());
        }
        if let Some(canned) = self.canned.get(to) {
            return Ok(Some(canned.clone()));
        }
        let (sel, args) = data.split_at(4);
        let is = |sig: &str| sel == function_selector(sig);

        if let Some(t) = self.tokens.get(to) {
            return Ok(Some(if is(SIG_SYMBOL) {
                abi_encode_string(&t.symbol)
            } else if is(SIG_DECIMALS) {
                abi_encode_u64(t.decimals as u64)
            } else if is(SIG_BALANCE_OF) {
                let who = decode_address(args, 0)?;
                word(&t.balances.get(&who).cloned().unwrap_or_default())
            } else if is(SIG_ALLOWANCE) {
                let owner = decode_address(args, 0)?;
                let spender = decode_address(args, 1)?;
                word(&t.allowances.get(&(owner, spender)).cloned().unwrap_or_default())
            } else {
                return Err("execution reverted: unknown selector".into());
            }));
        }

        if let Some(f) = self.fixed.get(to) {
            return Ok(Some(if is(SIG_CONVERSION_RATE) {
                word(&f.rate)
            } else if is(SIG_FIXED_INPUT_TOKEN) {
                abi_encode_address(&f.input.0)
            } else if is(SIG_FIXED_OUTPUT_TOKEN) {
                abi_encode_address(&f.output.0)
            } else {
                return Err("execution reverted: unknown selector".into());
            }));
        }

        if let Some(pairs) = self.factories.get(to) {
            if !is(SIG_GET_PAIR) {
                return Err("execution reverted: unknown selector".into());
            }
            let a = decode_address(args, 0)?;
            let b = decode_address(args, 1)?;
            let key = if a < b { (a, b) } else { (b, a) };
            let pair = pairs.get(&key).copied().unwrap_or(Address::ZERO);
            return Ok(Some(abi_encode_address(&pair.0)));
        }

        if let Some(p) = self.pairs.get(to) {
            return Ok(Some(if is(SIG_TOKEN0) {
                abi_encode_address(&p.token0.0)
            } else if is(SIG_TOKEN1) {
                abi_encode_address(&p.token1.0)
            } else if is(SIG_GET_RESERVES) {
                let mut out = word(&p.reserve0);
                out.extend(word(&p.reserve1));
                out.extend(abi_encode_u64(p.updated as u64));
                out
            } else {
                return Err("execution reverted: unknown selector".into());
            }));
        }

        if let Some(factory) = self.routers.get(to) {
            if is(SIG_ROUTER_FACTORY) {
                return Ok(Some(abi_encode_address(&factory.0)));
            }
            if is(SIG_GET_AMOUNTS_OUT) && !self.no_quote_routers.contains(to) {
                let amount_in = decode_uint256(args, 0)?;
                let path = decode_address_array(args, 1)?;
                let amounts = self.amounts_out(to, &amount_in, &path).map_err(|e| format!("execution reverted: {}", e))?;
                let mut out = abi_encode_u64(32);
                out.extend(abi_encode_u64(amounts.len() as u64));
                for a in &amounts {
                    out.extend(word(a));
                }
                return Ok(Some(out));
            }
            return Err("execution reverted: unknown selector".into());
        }

        Ok(None)
    }

    /// Execute a mutating call. `Err` reverts the whole transaction.
    fn execute(&mut self, from: &Address, to: &Address, data: &[u8], logs: &mut Vec<LogEntry>) -> Result<(), String> {
        if data.len() < 4 {
            return Err("no selector".into());
        }
        let (sel, args) = data.split_at(4);
        let is = |sig: &str| sel == function_selector(sig);

        if self.tokens.contains_key(to) && is(SIG_APPROVE) {
            let spender = decode_address(args, 0)?;
            let value = decode_uint256(args, 1)?;
            self.token_mut(to)?.allowances.insert((*from, spender), value);
            return Ok(());
        }

        if let Some(f) = self.fixed.get(to).cloned() {
            if !is(SIG_SWAP_FIXED) {
                return Err("unknown selector".into());
            }
            let amount_in = decode_uint256(args, 0)?;
            if amount_in.is_zero() {
                return Err("Amount must be greater than 0".into());
            }
            let in_dec = self.token(&f.input)?.decimals;
            let out_dec = self.token(&f.output)?.decimals;
            let amount_out = &amount_in * pow10(out_dec as u32) / pow10(in_dec as u32) / &f.rate;
            self.transfer_from(&f.input, to, from, to, &amount_in, logs)?;
            self.transfer(&f.output, to, from, &amount_out, logs)?;
            let mut data = word(&amount_in);
            data.extend(word(&amount_out));
            logs.push(LogEntry {
                address: *to,
                topics: vec![event_topic(SIG_SWAP_EXECUTED_EVENT), pad(from)],
                data,
            });
            return Ok(());
        }

        if self.routers.contains_key(to) {
            if !is(SIG_SWAP_EXACT_TOKENS) {
                return Err("unknown selector".into());
            }
            let amount_in = decode_uint256(args, 0)?;
            let amount_out_min = decode_uint256(args, 1)?;
            let path = decode_address_array(args, 2)?;
            let recipient = decode_address(args, 3)?;
            let deadline = decode_u64(args, 4)?;
            if deadline < now() {
                return Err("UniswapV2Router: EXPIRED".into());
            }
            let amounts = self.amounts_out(to, &amount_in, &path)?;
            let out = amounts.last().cloned().unwrap_or_default();
            if out < amount_out_min {
                return Err("UniswapV2Router: INSUFFICIENT_OUTPUT_AMOUNT".into());
            }
            let pair = self.pair_for(to, &path[0], &path[1])?;
            self.transfer_from(&path[0], to, from, &pair, &amount_in, logs)?;
            self.transfer(&path[1], &pair, &recipient, &out, logs)?;
            let p = self.pairs.get_mut(&pair).ok_or("no pair")?;
            if p.token0 == path[0] {
                p.reserve0 += &amount_in;
                p.reserve1 -= &out;
            } else {
                p.reserve1 += &amount_in;
                p.reserve0 -= &out;
            }
            p.updated = now() as u32;
            return Ok(());
        }

        Err(format!("no contract at {}", to))
    }
}

// ── Simulator ──────────────────────────────────────────────────────────────

impl Sim {
    pub fn new() -> Self {
        Sim {
            world: Mutex::new(World {
                chain: Chain::default(),
                next_address: 1,
                next_tx: 1,
                pending: Vec::new(),
                receipts: HashMap::new(),
                events: Vec::new(),
                accounts: Vec::new(),
                native: HashMap::new(),
                failing_calls: 0,
                calls: 0,
            }),
        }
    }

    pub fn new_address(&self) -> Address {
        let mut w = self.world.lock();
        let n = w.next_address;
        w.next_address += 1;
        let mut bytes = [0u8; 20];
        bytes[0] = 0xaa;
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Address(bytes)
    }

    /// A funded externally-owned account exposed by the wallet.
    pub fn new_account(&self) -> Address {
        let account = self.new_address();
        let mut w = self.world.lock();
        w.accounts.push(account);
        w.native.insert(account, units(1, 18));
        account
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.world.lock().accounts = accounts;
    }

    pub fn deploy_token(&self, symbol: &str, decimals: u8) -> Address {
        let token = self.new_address();
        self.world.lock().chain.tokens.insert(
            token,
            Erc20 { symbol: symbol.into(), decimals, balances: HashMap::new(), allowances: HashMap::new() },
        );
        token
    }

    pub fn mint(&self, token: &Address, to: &Address, value: Amount) {
        let mut w = self.world.lock();
        if let Some(t) = w.chain.tokens.get_mut(token) {
            *t.balances.entry(*to).or_default() += value;
        }
    }

    pub fn set_allowance(&self, token: &Address, owner: &Address, spender: &Address, value: Amount) {
        let mut w = self.world.lock();
        if let Some(t) = w.chain.tokens.get_mut(token) {
            t.allowances.insert((*owner, *spender), value);
        }
    }

    pub fn balance(&self, token: &Address, who: &Address) -> Amount {
        self.world.lock().chain.balance(token, who)
    }

    pub fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> Amount {
        let w = self.world.lock();
        w.chain
            .tokens
            .get(token)
            .and_then(|t| t.allowances.get(&(*owner, *spender)).cloned())
            .unwrap_or_default()
    }

    /// Fixed-rate contract holding `liquidity` of the output token.
    pub fn deploy_fixed_rate(&self, input: Address, output: Address, rate: u64, liquidity: Amount) -> Address {
        let contract = self.new_address();
        self.world.lock().chain.fixed.insert(contract, FixedRate { input, output, rate: Amount::from(rate) });
        self.mint(&output, &contract, liquidity);
        contract
    }

    pub fn set_conversion_rate(&self, contract: &Address, rate: u64) {
        if let Some(f) = self.world.lock().chain.fixed.get_mut(contract) {
            f.rate = Amount::from(rate);
        }
    }

    /// Returns `(factory, router)`.
    pub fn deploy_uniswap(&self) -> (Address, Address) {
        let factory = self.new_address();
        let router = self.new_address();
        let mut w = self.world.lock();
        w.chain.factories.insert(factory, HashMap::new());
        w.chain.routers.insert(router, factory);
        (factory, router)
    }

    /// Create a pair seeded with `reserve_a` of `a` and `reserve_b` of `b`.
    pub fn create_pair(&self, factory: &Address, a: Address, b: Address, reserve_a: Amount, reserve_b: Amount) -> Address {
        let pair = self.new_address();
        self.mint(&a, &pair, reserve_a.clone());
        self.mint(&b, &pair, reserve_b.clone());
        let (token0, token1, reserve0, reserve1) =
            if a < b { (a, b, reserve_a, reserve_b) } else { (b, a, reserve_b, reserve_a) };
        let mut w = self.world.lock();
        if let Some(f) = w.chain.factories.get_mut(factory) {
            f.insert((token0, token1), pair);
        }
        w.chain.pairs.insert(pair, Pair { token0, token1, reserve0, reserve1, updated: now() as u32 });
        pair
    }

    pub fn reserves(&self, pair: &Address) -> (Amount, Amount) {
        let w = self.world.lock();
        w.chain.pairs.get(pair).map(|p| (p.reserve0.clone(), p.reserve1.clone())).unwrap_or_default()
    }

    /// A contract that answers every call with `response`.
    pub fn deploy_canned(&self, response: Vec<u8>) -> Address {
        let contract = self.new_address();
        self.world.lock().chain.canned.insert(contract, response);
        contract
    }

    pub fn make_reverting(&self, contract: &Address) {
        self.world.lock().chain.reverting.push(*contract);
    }

    pub fn disable_router_quotes(&self, router: &Address) {
        self.world.lock().chain.no_quote_routers.push(*router);
    }

    /// The next `n` reads fail as transport errors.
    pub fn fail_next_calls(&self, n: u32) {
        self.world.lock().failing_calls = n;
    }

    pub fn call_count(&self) -> u64 {
        self.world.lock().calls
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.world.lock().events.clone()
    }

    /// Methods submitted, in submission order.
    pub fn submitted(&self) -> Vec<&'static str> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SimEvent::Submitted { method, .. } => Some(method),
                _ => None,
            })
            .collect()
    }

    fn mine_until(w: &mut World, hash: &TxHash) {
        while !w.receipts.contains_key(hash) && !w.pending.is_empty() {
            let tx = w.pending.remove(0);
            let method = method_name(tx.data.get(..4).unwrap_or(&[]));
            let snapshot = w.chain.clone();
            let mut logs = Vec::new();
            let result = w.chain.execute(&tx.from, &tx.to, &tx.data, &mut logs);
            let success = result.is_ok();
            if !success {
                w.chain = snapshot;
                logs.clear();
            }
            w.events.push(SimEvent::Mined { tx: tx.hash, method, success });
            let receipt = TxReceipt {
                tx_hash: tx.hash,
                success,
                block_number: Some(w.next_tx),
                revert_reason: result.err(),
                logs,
            };
            w.receipts.insert(tx.hash, receipt);
        }
    }
}

#[async_trait]
impl ChainProvider for Sim {
    async fn call(&self, to: &Address, data: &[u8]) -> SwapResult<Vec<u8>> {
        let mut w = self.world.lock();
        w.calls += 1;
        if w.failing_calls > 0 {
            w.failing_calls -= 1;
            return Err(SwapError::call("sim", "connection reset by peer"));
        }
        match w.chain.read(to, data) {
            Ok(Some(out)) => Ok(out),
            Ok(None) => Ok(Vec::new()),
            Err(reason) => Err(SwapError::revert(None, reason)),
        }
    }

    async fn native_balance(&self, address: &Address) -> SwapResult<Amount> {
        Ok(self.world.lock().native.get(address).cloned().unwrap_or_default())
    }

    async fn send_transaction(&self, from: &Address, to: &Address, data: &[u8]) -> SwapResult<TxHash> {
        let mut w = self.world.lock();
        let n = w.next_tx;
        w.next_tx += 1;
        let hash = TxHash(keccak256(&n.to_be_bytes()));
        let method = method_name(data.get(..4).unwrap_or(&[]));
        w.events.push(SimEvent::Submitted { tx: hash, method });
        w.pending.push(PendingTx { hash, from: *from, to: *to, data: data.to_vec() });
        Ok(hash)
    }

    async fn wait_for_receipt(&self, tx: &TxHash) -> SwapResult<TxReceipt> {
        let mut w = self.world.lock();
        Self::mine_until(&mut w, tx);
        w.receipts.get(tx).cloned().ok_or_else(|| SwapError::call("sim", format!("unknown transaction {}", tx)))
    }

    async fn accounts(&self) -> SwapResult<Vec<Address>> {
        let mut w = self.world.lock();
        if w.failing_calls > 0 {
            w.failing_calls -= 1;
            return Err(SwapError::call("sim", "connection reset by peer"));
        }
        Ok(w.accounts.clone())
    }

    async fn chain_id(&self) -> SwapResult<u64> {
        Ok(CHAIN_ID)
    }
}
