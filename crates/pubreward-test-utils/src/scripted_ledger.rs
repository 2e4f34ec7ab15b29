// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted payment-channel ledger.
//!
//! Records every call and lets tests script per-counterpart failures,
//! timeouts, and confirmation delays for newly opened channels.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use pubreward_core::types::{AdapterType, Channel, HealthStatus, TokenAmount};
use pubreward_core::{LedgerClient, PluginAdapter, PubrewardError};

/// One recorded ledger call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    GetChannel {
        counterpart: String,
    },
    OpenChannel {
        counterpart: String,
        amount: TokenAmount,
        settle_timeout: u64,
    },
    Deposit {
        counterpart: String,
        amount: TokenAmount,
    },
    Transfer {
        target: String,
        amount: TokenAmount,
        direct: bool,
    },
}

#[derive(Default)]
struct State {
    channels: HashMap<String, Channel>,
    /// Opened but not yet visible: remaining `get_channel` polls.
    pending: HashMap<String, (u32, Channel)>,
    calls: Vec<LedgerCall>,
    failing: HashSet<String>,
    timing_out: HashSet<String>,
    /// `None` means opened channels never become visible.
    confirm_after: Option<u32>,
    fail_transfers: bool,
}

pub struct ScriptedLedger {
    self_address: String,
    token: String,
    state: Mutex<State>,
}

fn key(address: &str) -> String {
    address.to_ascii_lowercase()
}

impl ScriptedLedger {
    pub fn new(self_address: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            self_address: self_address.into(),
            token: token.into(),
            state: Mutex::new(State {
                confirm_after: Some(0),
                ..Default::default()
            }),
        }
    }

    /// Seeds an existing channel.
    pub async fn with_channel(&self, counterpart: &str, balance: TokenAmount) {
        let channel = self.channel(counterpart, balance);
        self.state.lock().await.channels.insert(key(counterpart), channel);
    }

    /// Every call touching `counterpart` fails with a ledger error.
    pub async fn fail_for(&self, counterpart: &str) {
        self.state.lock().await.failing.insert(key(counterpart));
    }

    /// Every call touching `counterpart` times out.
    pub async fn time_out_for(&self, counterpart: &str) {
        self.state.lock().await.timing_out.insert(key(counterpart));
    }

    /// Newly opened channels appear after `polls` queries, or never.
    pub async fn confirm_after(&self, polls: Option<u32>) {
        self.state.lock().await.confirm_after = polls;
    }

    pub async fn fail_transfers(&self) {
        self.state.lock().await.fail_transfers = true;
    }

    /// Undoes [`fail_transfers`](Self::fail_transfers).
    pub async fn restore_transfers(&self) {
        self.state.lock().await.fail_transfers = false;
    }

    pub async fn calls(&self) -> Vec<LedgerCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn balance_of(&self, counterpart: &str) -> Option<TokenAmount> {
        self.state
            .lock()
            .await
            .channels
            .get(&key(counterpart))
            .map(|c| c.balance)
    }

    /// Calls other than `GetChannel`, which are the ones with side effects.
    pub async fn writes(&self) -> Vec<LedgerCall> {
        self.calls()
            .await
            .into_iter()
            .filter(|c| !matches!(c, LedgerCall::GetChannel { .. }))
            .collect()
    }

    fn channel(&self, counterpart: &str, balance: TokenAmount) -> Channel {
        Channel {
            channel_identifier: format!("0xchan-{}", key(counterpart)),
            partner_address: counterpart.to_string(),
            balance,
            token_address: self.token.clone(),
            settle_timeout: 100,
            state: 1,
        }
    }
}

fn check(state: &State, counterpart: &str) -> Result<(), PubrewardError> {
    let k = key(counterpart);
    if state.timing_out.contains(&k) {
        return Err(PubrewardError::Timeout {
            duration: Duration::from_secs(30),
        });
    }
    if state.failing.contains(&k) {
        return Err(PubrewardError::Ledger {
            message: format!("scripted failure for {counterpart}"),
            source: None,
        });
    }
    Ok(())
}

#[async_trait]
impl PluginAdapter for ScriptedLedger {
    fn name(&self) -> &str {
        "scripted-ledger"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Ledger
    }

    async fn health_check(&self) -> Result<HealthStatus, PubrewardError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PubrewardError> {
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for ScriptedLedger {
    fn self_address(&self) -> &str {
        &self.self_address
    }

    async fn get_channel(
        &self,
        counterpart: &str,
        _token: &str,
    ) -> Result<Option<Channel>, PubrewardError> {
        let mut state = self.state.lock().await;
        state.calls.push(LedgerCall::GetChannel {
            counterpart: counterpart.to_string(),
        });
        check(&state, counterpart)?;

        let k = key(counterpart);
        if let Some((remaining, channel)) = state.pending.remove(&k) {
            if remaining == 0 {
                state.channels.insert(k.clone(), channel);
            } else {
                state.pending.insert(k.clone(), (remaining - 1, channel));
            }
        }
        Ok(state.channels.get(&k).cloned())
    }

    async fn open_channel(
        &self,
        counterpart: &str,
        _token: &str,
        amount: TokenAmount,
        settle_timeout: u64,
    ) -> Result<(), PubrewardError> {
        let mut state = self.state.lock().await;
        state.calls.push(LedgerCall::OpenChannel {
            counterpart: counterpart.to_string(),
            amount,
            settle_timeout,
        });
        check(&state, counterpart)?;

        let channel = self.channel(counterpart, amount);
        match state.confirm_after {
            Some(0) => {
                state.channels.insert(key(counterpart), channel);
            }
            Some(polls) => {
                state.pending.insert(key(counterpart), (polls, channel));
            }
            None => {
                state.pending.insert(key(counterpart), (u32::MAX, channel));
            }
        }
        Ok(())
    }

    async fn deposit(
        &self,
        counterpart: &str,
        _token: &str,
        amount: TokenAmount,
    ) -> Result<(), PubrewardError> {
        let mut state = self.state.lock().await;
        state.calls.push(LedgerCall::Deposit {
            counterpart: counterpart.to_string(),
            amount,
        });
        check(&state, counterpart)?;

        match state.channels.get_mut(&key(counterpart)) {
            Some(ch) => {
                ch.balance += amount;
                Ok(())
            }
            None => Err(PubrewardError::Ledger {
                message: format!("no channel to {counterpart}"),
                source: None,
            }),
        }
    }

    async fn transfer(
        &self,
        _token: &str,
        amount: TokenAmount,
        target: &str,
        direct: bool,
        _sync: bool,
    ) -> Result<(), PubrewardError> {
        let mut state = self.state.lock().await;
        state.calls.push(LedgerCall::Transfer {
            target: target.to_string(),
            amount,
            direct,
        });
        check(&state, target)?;
        if state.fail_transfers {
            return Err(PubrewardError::Ledger {
                message: "scripted transfer failure".to_string(),
                source: None,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "0x00000000000000000000000000000000000000aa";

    #[tokio::test]
    async fn opened_channel_appears_after_scripted_polls() {
        let ledger = ScriptedLedger::new("0xself", "0xtoken");
        ledger.confirm_after(Some(2)).await;
        ledger.open_channel(A, "0xtoken", 5, 100).await.unwrap();

        assert!(ledger.get_channel(A, "0xtoken").await.unwrap().is_none());
        assert!(ledger.get_channel(A, "0xtoken").await.unwrap().is_none());
        let ch = ledger.get_channel(A, "0xtoken").await.unwrap().unwrap();
        assert_eq!(ch.balance, 5);
    }

    #[tokio::test]
    async fn timeouts_are_scripted_per_counterpart() {
        let ledger = ScriptedLedger::new("0xself", "0xtoken");
        ledger.time_out_for(A).await;
        assert!(matches!(
            ledger.get_channel(A, "0xtoken").await,
            Err(PubrewardError::Timeout { .. })
        ));
        assert_eq!(ledger.calls().await.len(), 1);
        assert!(ledger.writes().await.is_empty());
    }
}
