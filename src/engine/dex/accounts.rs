// Paw Swap Engine — DEX Account Subscription
// Polls the wallet for its primary account and turns changes into a stream
// of account-identity events. Dropping the subscription stops the poller.

use crate::atoms::traits::SharedProvider;
use crate::atoms::types::Account;
use futures::Stream;
use log::{debug, info, warn};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountEvent {
    Connected(Account),
    Changed { previous: Account, current: Account },
    Disconnected { previous: Account },
}

impl AccountEvent {
    /// The account in effect after this event.
    pub fn account(&self) -> Option<Account> {
        match self {
            AccountEvent::Connected(account) => Some(*account),
            AccountEvent::Changed { current, .. } => Some(*current),
            AccountEvent::Disconnected { .. } => None,
        }
    }
}

/// Pure diff between two observations of the primary account.
pub fn account_transition(previous: Option<Account>, current: Option<Account>) -> Option<AccountEvent> {
    match (previous, current) {
        (None, Some(current)) => Some(AccountEvent::Connected(current)),
        (Some(previous), Some(current)) if previous != current => Some(AccountEvent::Changed { previous, current }),
        (Some(previous), None) => Some(AccountEvent::Disconnected { previous }),
        _ => None,
    }
}

pub struct AccountSubscription {
    events: ReceiverStream<AccountEvent>,
    task: JoinHandle<()>,
}

impl Stream for AccountSubscription {
    type Item = AccountEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl Drop for AccountSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start watching the wallet's primary account. The first successful poll
/// emits `Connected` when an account is exposed. Poll failures are logged and
/// never reported as a disconnect.
pub fn watch_accounts(provider: SharedProvider, interval: Duration) -> AccountSubscription {
    let (tx, rx) = mpsc::channel(16);
    let task = tokio::spawn(async move {
        let mut current: Option<Account> = None;
        loop {
            match provider.accounts().await {
                Ok(accounts) => {
                    let next = accounts.first().copied();
                    if let Some(event) = account_transition(current, next) {
                        info!("[session] Wallet account event: {:?}", event);
                        if tx.send(event).await.is_err() {
                            debug!("[session] Account subscriber gone, stopping");
                            return;
                        }
                    }
                    current = next;
                }
                Err(e) => warn!("[session] Account poll failed: {}", e),
            }
            tokio::time::sleep(interval).await;
        }
    });
    AccountSubscription { events: ReceiverStream::new(rx), task }
}
