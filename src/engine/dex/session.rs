// Paw Swap Engine — DEX Swap Session
// The per-request orchestrator: validate → balance → quote → allowance →
// execute → refresh. Engines plug in through `SwapEngine`; the session owns
// the mutable view state (account, balances, phase, last quote).

use super::accounts::AccountEvent;
use super::allowance::{AllowanceAction, AllowanceCoordinator};
use super::tokens::TokenClient;
use super::tx::PendingTx;
use crate::atoms::constants::{DEFAULT_DEADLINE_SECS, DEFAULT_SLIPPAGE_BPS, MAX_SLIPPAGE_BPS};
use crate::atoms::error::{ErrorKind, SwapError, SwapResult};
use crate::atoms::types::{
    deadline_from_now, Account, Address, Amount, SwapDirection, SwapOutcome, SwapQuote, SwapRequest, TokenBalance,
    TokenDescriptor, TxHash, TxReceipt,
};
use async_trait::async_trait;
use log::{info, warn};
use num_traits::Zero;
use std::sync::Arc;

// ── Phases ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapPhase {
    Idle,
    Validating,
    CheckingBalance,
    Quoting,
    AwaitingApproval,
    Swapping,
    Refreshing,
    Settled,
    Failed(ErrorKind),
}

impl SwapPhase {
    /// Legal forward moves. Any in-flight phase may fail; a finished swap
    /// (settled or failed) may only start over from `Validating` or go idle.
    pub fn allows(self, next: SwapPhase) -> bool {
        use SwapPhase::*;
        match (self, next) {
            (Idle | Settled | Failed(_), Validating) => true,
            (Settled | Failed(_), Idle) => true,
            (Validating, CheckingBalance)
            | (CheckingBalance, Quoting)
            | (Quoting, AwaitingApproval)
            | (Quoting, Swapping)
            | (AwaitingApproval, Swapping)
            | (Swapping, Refreshing)
            | (Refreshing, Settled) => true,
            (Validating | CheckingBalance | Quoting | AwaitingApproval | Swapping | Refreshing, Failed(_)) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SwapPhase::Settled | SwapPhase::Failed(_))
    }

    pub fn is_busy(self) -> bool {
        !self.is_terminal() && self != SwapPhase::Idle
    }
}

// ── Engines ────────────────────────────────────────────────────────────────

/// A submitted swap together with the quote it was priced against.
pub struct Submission {
    pub quote: SwapQuote,
    pub pending: PendingTx,
}

/// Final state of a confirmed swap.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub tx_hash: TxHash,
    pub amount_in: Amount,
    pub amount_out: Amount,
    pub quote: SwapQuote,
    pub approval: AllowanceAction,
    /// Post-swap balances of every token in the path, re-read from chain.
    pub balances: Vec<TokenBalance>,
}

/// A pricing venue the session can drive. Implementors supply pricing and
/// submission; the provided `execute` runs the shared pipeline.
#[async_trait]
pub trait SwapEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn tokens(&self) -> &Arc<TokenClient>;

    fn allowances(&self) -> &AllowanceCoordinator;

    /// Contract that pulls the input token (needs the allowance).
    fn spender(&self) -> Address;

    fn max_slippage_bps(&self) -> u32 {
        MAX_SLIPPAGE_BPS
    }

    /// Verified descriptors for a swap in `direction`.
    async fn resolve_path(&self, direction: SwapDirection) -> SwapResult<Vec<TokenDescriptor>>;

    /// Venue-specific request checks (path shape, supported tokens).
    fn check_request(&self, request: &SwapRequest) -> SwapResult<()>;

    /// Fresh quote; an unpriceable request is an error here.
    async fn quote(&self, request: &SwapRequest) -> SwapResult<SwapQuote>;

    /// Submit the swap transaction. `quoted` is the quote the caller saw;
    /// engines whose price can move re-derive it before submitting.
    async fn submit(&self, request: &SwapRequest, quoted: &SwapQuote) -> SwapResult<Submission>;

    /// Amount received according to the receipt's logs, if recognisable.
    fn settled_amount(&self, request: &SwapRequest, receipt: &TxReceipt) -> Option<Amount>;

    async fn execute(&self, request: &SwapRequest) -> SwapResult<Settlement> {
        self.execute_observed(request, &mut |_: SwapPhase| {}).await
    }

    /// The full pipeline, reporting each phase as it is entered. Later steps
    /// are skipped on the first failure; a confirmed approval stays in place.
    async fn execute_observed(
        &self,
        request: &SwapRequest,
        observer: &mut (dyn FnMut(SwapPhase) + Send),
    ) -> SwapResult<Settlement> {
        observer(SwapPhase::Validating);
        request.validate(self.max_slippage_bps())?;
        self.check_request(request)?;
        let input = request.input_token().address;
        let output = request.output_token().address;

        observer(SwapPhase::CheckingBalance);
        let available = self.tokens().balance_of(&input, &request.account).await?;
        if available < request.input_amount {
            return Err(SwapError::InsufficientBalance {
                symbol: request.input_token().symbol.clone(),
                required: request.input_amount.clone(),
                available,
            });
        }
        let output_before = self.tokens().balance_of(&output, &request.account).await?;

        observer(SwapPhase::Quoting);
        let quote = self.quote(request).await?;

        observer(SwapPhase::AwaitingApproval);
        let approval = self
            .allowances()
            .ensure_allowance(&input, &request.account, &self.spender(), &request.input_amount)
            .await?;

        observer(SwapPhase::Swapping);
        let submission = self.submit(request, &quote).await?;
        let receipt = submission.pending.confirm().await?;

        observer(SwapPhase::Refreshing);
        let mut balances = Vec::with_capacity(request.path.len());
        for token in &request.path {
            balances.push(self.tokens().snapshot(&token.address, &request.account).await?);
        }

        let amount_out = match self.settled_amount(request, &receipt) {
            Some(amount) => amount,
            None => {
                let after = balances
                    .iter()
                    .find(|b| b.token.address == output)
                    .map(|b| b.balance.clone())
                    .unwrap_or_default();
                warn!("[{}] No settlement event in receipt, using balance delta", self.name());
                if after >= output_before {
                    after - output_before
                } else {
                    Amount::default()
                }
            }
        };

        info!(
            "[{}] Swap settled: {} {} → {} {} ({})",
            self.name(),
            request.input_amount,
            request.input_token().symbol,
            amount_out,
            request.output_token().symbol,
            receipt.tx_hash
        );
        observer(SwapPhase::Settled);

        Ok(Settlement {
            tx_hash: receipt.tx_hash,
            amount_in: request.input_amount.clone(),
            amount_out,
            quote: submission.quote,
            approval,
            balances,
        })
    }
}

// ── Session ────────────────────────────────────────────────────────────────

/// Trade defaults applied to requests the session builds.
#[derive(Debug, Clone, Copy)]
pub struct TradeSettings {
    pub slippage_bps: u32,
    pub deadline_secs: u64,
}

impl Default for TradeSettings {
    fn default() -> Self {
        TradeSettings { slippage_bps: DEFAULT_SLIPPAGE_BPS, deadline_secs: DEFAULT_DEADLINE_SECS }
    }
}

/// Explicit session state for one engine and one account.
pub struct SwapSession {
    engine: Arc<dyn SwapEngine>,
    settings: TradeSettings,
    account: Option<Account>,
    balances: Vec<TokenBalance>,
    phase: SwapPhase,
    history: Vec<SwapPhase>,
    last_quote: Option<SwapQuote>,
    last_settlement: Option<Settlement>,
}

impl SwapSession {
    pub fn new(engine: Arc<dyn SwapEngine>, settings: TradeSettings) -> Self {
        SwapSession {
            engine,
            settings,
            account: None,
            balances: Vec::new(),
            phase: SwapPhase::Idle,
            history: Vec::new(),
            last_quote: None,
            last_settlement: None,
        }
    }

    pub fn with_account(mut self, account: Account) -> Self {
        self.account = Some(account);
        self
    }

    pub fn engine(&self) -> &Arc<dyn SwapEngine> {
        &self.engine
    }

    pub fn account(&self) -> Option<Account> {
        self.account
    }

    pub fn phase(&self) -> SwapPhase {
        self.phase
    }

    /// Phases entered by the most recent swap, in order.
    pub fn history(&self) -> &[SwapPhase] {
        &self.history
    }

    pub fn balances(&self) -> &[TokenBalance] {
        &self.balances
    }

    pub fn last_quote(&self) -> Option<&SwapQuote> {
        self.last_quote.as_ref()
    }

    pub fn last_settlement(&self) -> Option<&Settlement> {
        self.last_settlement.as_ref()
    }

    /// React to a wallet account change. Anything derived from the previous
    /// account is dropped; metadata caches are account-independent and kept.
    pub fn apply_account_event(&mut self, event: &AccountEvent) {
        let next = event.account();
        if next == self.account {
            return;
        }
        info!("[session] Account changed: {:?} → {:?}", self.account, next);
        self.account = next;
        self.balances.clear();
        self.last_quote = None;
        self.last_settlement = None;
        self.phase = SwapPhase::Idle;
        self.history.clear();
    }

    fn require_account(&self) -> SwapResult<Account> {
        self.account.ok_or_else(|| SwapError::Config("no wallet account connected".into()))
    }

    /// Build a request with the session's trade settings. A zero amount is
    /// rejected before token metadata is resolved.
    pub async fn request(&self, direction: SwapDirection, input_amount: Amount) -> SwapResult<SwapRequest> {
        if input_amount.is_zero() {
            return Err(SwapError::InvalidAmount("amount must be greater than 0".into()));
        }
        let account = self.require_account()?;
        let path = self.engine.resolve_path(direction).await?;
        Ok(SwapRequest::new(account, path, input_amount)
            .with_slippage_bps(self.settings.slippage_bps)
            .with_deadline(deadline_from_now(self.settings.deadline_secs)))
    }

    /// Re-read balances of both tokens the engine trades in `direction`.
    pub async fn refresh_balances(&mut self, direction: SwapDirection) -> SwapResult<&[TokenBalance]> {
        let account = self.require_account()?;
        let path = self.engine.resolve_path(direction).await?;
        let mut balances = Vec::with_capacity(path.len());
        for token in &path {
            balances.push(self.engine.tokens().snapshot(&token.address, &account).await?);
        }
        self.balances = balances;
        Ok(&self.balances)
    }

    /// Quote without submitting. Replaces the session's last quote.
    pub async fn preview(&mut self, direction: SwapDirection, input_amount: Amount) -> SwapResult<SwapQuote> {
        self.last_quote = None;
        let request = self.request(direction, input_amount).await?;
        request.validate(self.engine.max_slippage_bps())?;
        self.engine.check_request(&request)?;
        let quote = self.engine.quote(&request).await?;
        self.last_quote = Some(quote.clone());
        Ok(quote)
    }

    /// Run a full swap. Never errors: every failure comes back as
    /// `SwapOutcome::Failure` with the step's reason.
    pub async fn swap(&mut self, direction: SwapDirection, input_amount: Amount) -> SwapOutcome {
        match self.request(direction, input_amount).await {
            Ok(request) => self.submit(request).await,
            Err(reason) => {
                self.history.clear();
                self.enter(SwapPhase::Validating);
                self.enter(SwapPhase::Failed(reason.kind()));
                SwapOutcome::Failure { reason }
            }
        }
    }

    /// Run a full swap for a caller-built request.
    pub async fn submit(&mut self, request: SwapRequest) -> SwapOutcome {
        self.history.clear();

        let engine = self.engine.clone();
        let mut entered: Vec<SwapPhase> = Vec::new();
        let result = engine.execute_observed(&request, &mut |phase: SwapPhase| entered.push(phase)).await;
        for phase in entered {
            self.enter(phase);
        }

        match result {
            Ok(settlement) => {
                self.balances = settlement.balances.clone();
                self.last_quote = Some(settlement.quote.clone());
                let outcome = SwapOutcome::Success { amount_out: settlement.amount_out.clone(), tx_hash: settlement.tx_hash };
                self.last_settlement = Some(settlement);
                outcome
            }
            Err(reason) => {
                warn!("[session] Swap failed ({}): {}", reason.kind(), reason);
                self.enter(SwapPhase::Failed(reason.kind()));
                SwapOutcome::Failure { reason }
            }
        }
    }

    fn enter(&mut self, next: SwapPhase) {
        if !self.phase.allows(next) {
            warn!("[session] Unexpected phase transition {:?} → {:?}", self.phase, next);
        }
        self.phase = next;
        self.history.push(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_legal() {
        let path = [
            SwapPhase::Idle,
            SwapPhase::Validating,
            SwapPhase::CheckingBalance,
            SwapPhase::Quoting,
            SwapPhase::AwaitingApproval,
            SwapPhase::Swapping,
            SwapPhase::Refreshing,
            SwapPhase::Settled,
            SwapPhase::Validating,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].allows(pair[1]), "{:?} → {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn approval_is_optional() {
        assert!(SwapPhase::Quoting.allows(SwapPhase::Swapping));
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        assert!(!SwapPhase::Idle.allows(SwapPhase::Swapping));
        assert!(!SwapPhase::Settled.allows(SwapPhase::Failed(ErrorKind::ContractRevert)));
        assert!(!SwapPhase::Swapping.allows(SwapPhase::Quoting));
        assert!(!SwapPhase::Idle.allows(SwapPhase::Failed(ErrorKind::InvalidAmount)));
    }

    #[test]
    fn any_in_flight_phase_can_fail() {
        for phase in [SwapPhase::Validating, SwapPhase::Quoting, SwapPhase::Swapping, SwapPhase::Refreshing] {
            assert!(phase.allows(SwapPhase::Failed(ErrorKind::ContractCallError)));
            assert!(phase.is_busy());
        }
        assert!(!SwapPhase::Failed(ErrorKind::PairNotFound).is_busy());
    }
}
