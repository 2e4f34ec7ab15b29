// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel reconciler.
//!
//! Converges the ledger towards "every registered counterpart has a channel
//! funded to at least the configured floor". Channel state is never cached:
//! every decision starts from a fresh ledger query.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use pubreward_config::model::LedgerConfig;
use pubreward_core::types::{Channel, TokenAmount, validate_ledger_address};
use pubreward_core::{LedgerClient, PubrewardError, StorageAdapter};

/// What `ensure_channel` found or did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// A channel already existed; nothing was written.
    Existing(Channel),
    /// A channel already existed and a bonus left unpaid by an earlier
    /// attempt was sent.
    BonusPaid(Channel),
    /// A channel was opened, confirmed, and the bonus sent.
    Opened(Channel),
}

/// What one counterpart needed during a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    Healthy,
    Opened,
    ToppedUp(TokenAmount),
    /// The channel was at the floor; an outstanding bonus was paid.
    BonusPaid,
}

/// Summary of one `reconcile_all` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub checked: usize,
    pub healthy: usize,
    pub opened: usize,
    pub topped_up: usize,
    pub bonus_paid: usize,
    /// `(counterpart, error)` for every skipped counterpart.
    pub failed: Vec<(String, String)>,
    /// Shutdown interrupted the sweep before every counterpart was visited.
    pub cancelled: bool,
}

pub struct ChannelReconciler {
    ledger: Arc<dyn LedgerClient>,
    store: Arc<dyn StorageAdapter>,
    config: LedgerConfig,
}

impl ChannelReconciler {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        store: Arc<dyn StorageAdapter>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            ledger,
            store,
            config,
        }
    }

    pub fn self_address(&self) -> &str {
        self.ledger.self_address()
    }

    fn token(&self) -> &str {
        &self.config.token_address
    }

    /// Makes sure a channel to `counterpart` exists.
    ///
    /// When absent, records the registration bonus as owed, opens a channel
    /// funded with the floor plus the bonus, waits for the ledger to report
    /// it, then transfers the bonus. Gives up with
    /// [`PubrewardError::ChannelTimeout`] after `max_poll_attempts`; a later
    /// sweep starts over from the query. A bonus still owed when the channel
    /// is found is paid then, so each counterpart receives it once.
    pub async fn ensure_channel(
        &self,
        counterpart: &str,
        cancel: &CancellationToken,
    ) -> Result<EnsureOutcome, PubrewardError> {
        validate_ledger_address(counterpart)?;

        if let Some(channel) = self.ledger.get_channel(counterpart, self.token()).await? {
            debug!(counterpart, balance = %channel.balance, "channel already exists");
            return Ok(if self.pay_owed_bonus(counterpart).await? {
                EnsureOutcome::BonusPaid(channel)
            } else {
                EnsureOutcome::Existing(channel)
            });
        }

        let bonus = self.config.registration_bonus();
        if bonus > 0 {
            self.store.record_bonus_owed(counterpart, bonus).await?;
        }
        let funding = self.config.min_balance() + bonus;
        self.ledger
            .open_channel(counterpart, self.token(), funding, self.config.settle_timeout)
            .await?;
        info!(counterpart, funding = %funding, "channel open requested");

        let channel = self.await_channel(counterpart, cancel).await?;
        self.pay_owed_bonus(counterpart).await?;
        Ok(EnsureOutcome::Opened(channel))
    }

    /// Sends the bonus owed to `counterpart`, if any. Returns `true` if one was sent.
    async fn pay_owed_bonus(&self, counterpart: &str) -> Result<bool, PubrewardError> {
        let Some(bonus) = self.store.bonus_owed(counterpart).await? else {
            return Ok(false);
        };
        self.ledger
            .transfer(self.token(), bonus, counterpart, true, false)
            .await?;
        if let Err(e) = self.store.mark_bonus_paid(counterpart).await {
            warn!(counterpart, bonus = %bonus, error = %e, "bonus sent but not marked paid");
            return Err(e);
        }
        info!(counterpart, bonus = %bonus, "registration bonus sent");
        Ok(true)
    }

    async fn await_channel(
        &self,
        counterpart: &str,
        cancel: &CancellationToken,
    ) -> Result<Channel, PubrewardError> {
        let attempts = self.config.max_poll_attempts;
        for attempt in 1..=attempts {
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(PubrewardError::Cancelled(format!(
                        "waiting for channel to {counterpart}"
                    )));
                }
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
            }

            match self.ledger.get_channel(counterpart, self.token()).await {
                Ok(Some(channel)) => {
                    debug!(counterpart, attempt, "channel confirmed");
                    return Ok(channel);
                }
                Ok(None) => {}
                Err(e) => debug!(counterpart, attempt, error = %e, "confirmation poll failed"),
            }
        }
        Err(PubrewardError::ChannelTimeout {
            counterpart: counterpart.to_string(),
            attempts,
        })
    }

    /// Brings one counterpart up to the floor and pays any bonus it is still owed.
    pub async fn reconcile_one(
        &self,
        counterpart: &str,
        cancel: &CancellationToken,
    ) -> Result<ReconcileAction, PubrewardError> {
        validate_ledger_address(counterpart)?;

        let Some(channel) = self.ledger.get_channel(counterpart, self.token()).await? else {
            self.ensure_channel(counterpart, cancel).await?;
            return Ok(ReconcileAction::Opened);
        };

        let bonus_paid = self.pay_owed_bonus(counterpart).await?;
        let floor = self.config.min_balance();
        if channel.balance >= floor {
            return Ok(if bonus_paid {
                ReconcileAction::BonusPaid
            } else {
                ReconcileAction::Healthy
            });
        }

        let shortfall = floor - channel.balance;
        self.ledger
            .deposit(counterpart, self.token(), shortfall)
            .await?;
        info!(counterpart, shortfall = %shortfall, "channel topped up");
        Ok(ReconcileAction::ToppedUp(shortfall))
    }

    /// Sweeps every profile with a registered address.
    ///
    /// Counterparts are independent: a failure is logged, recorded in the
    /// report, and the sweep moves on. Shutdown is honored between
    /// counterparts and while waiting for confirmations.
    pub async fn reconcile_all(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ReconcileReport, PubrewardError> {
        let profiles = self.store.list_registered_profiles().await?;
        let mut report = ReconcileReport::default();

        for (i, profile) in profiles.iter().enumerate() {
            let Some(address) = profile.ledger_address.as_deref() else {
                continue;
            };

            if i > 0 {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.config.sweep_delay()) => {}
                }
            }
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            report.checked += 1;
            match self.reconcile_one(address, cancel).await {
                Ok(ReconcileAction::Healthy) => report.healthy += 1,
                Ok(ReconcileAction::Opened) => report.opened += 1,
                Ok(ReconcileAction::ToppedUp(_)) => report.topped_up += 1,
                Ok(ReconcileAction::BonusPaid) => report.bonus_paid += 1,
                Err(PubrewardError::Cancelled(_)) => {
                    report.cancelled = true;
                    break;
                }
                Err(e) => {
                    warn!(
                        client_id = %profile.client_id,
                        counterpart = address,
                        error = %e,
                        "skipping counterpart"
                    );
                    metrics::counter!("pubreward_reconcile_failures_total").increment(1);
                    report.failed.push((address.to_string(), e.to_string()));
                }
            }
        }

        metrics::counter!("pubreward_sweeps_total").increment(1);
        info!(
            checked = report.checked,
            healthy = report.healthy,
            opened = report.opened,
            topped_up = report.topped_up,
            bonus_paid = report.bonus_paid,
            failed = report.failed.len(),
            cancelled = report.cancelled,
            "reconciliation sweep finished"
        );
        Ok(report)
    }

    /// Pays `amount` directly to `address`.
    pub async fn reward(&self, address: &str, amount: TokenAmount) -> Result<(), PubrewardError> {
        validate_ledger_address(address)?;
        self.ledger
            .transfer(self.token(), amount, address, true, false)
            .await?;
        info!(target = address, amount = %amount, "reward sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubreward_core::types::FINNEY;
    use pubreward_test_utils::fixtures::temp_storage;
    use pubreward_test_utils::{LedgerCall, ScriptedLedger};
    use tracing_test::traced_test;

    const TOKEN: &str = "0x6601F810eaF2fa749EEa10533Fd4CC23B8C791dc";
    const A: &str = "0x00000000000000000000000000000000000000a1";

    const B: &str = "0x00000000000000000000000000000000000000b2";
    const C: &str = "0x00000000000000000000000000000000000000c3";

    fn config() -> LedgerConfig {
        LedgerConfig {
            enabled: true,
            token_address: TOKEN.into(),
            poll_interval_ms: 10,
            max_poll_attempts: 3,
            sweep_delay_ms: 1,
            ..Default::default()
        }
    }

    async fn setup() -> (tempfile::TempDir, Arc<ScriptedLedger>, ChannelReconciler) {
        let (dir, store) = temp_storage().await;
        let ledger = Arc::new(ScriptedLedger::new("0xself", TOKEN));
        let reconciler = ChannelReconciler::new(ledger.clone(), Arc::new(store), config());
        (dir, ledger, reconciler)
    }

    #[tokio::test]
    #[traced_test]
    async fn sweep_skips_timed_out_counterpart_and_continues() {
        let (_dir, store) = temp_storage().await;
        for (id, addr) in [("@a", A), ("@b", B), ("@c", C)] {
            store.register_ledger_address(id, None, addr).await.unwrap();
        }
        let ledger = Arc::new(ScriptedLedger::new("0xself", TOKEN));
        ledger.with_channel(A, 10 * FINNEY).await;
        ledger.with_channel(B, 10 * FINNEY).await;
        ledger.with_channel(C, 10 * FINNEY).await;
        ledger.time_out_for(B).await;

        let reconciler = ChannelReconciler::new(ledger.clone(), Arc::new(store), config());
        let report = reconciler
            .reconcile_all(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.checked, 3);
        assert_eq!(report.topped_up, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, B);
        assert_eq!(ledger.balance_of(A).await, Some(100 * FINNEY));
        assert_eq!(ledger.balance_of(B).await, Some(10 * FINNEY));
        assert_eq!(ledger.balance_of(C).await, Some(100 * FINNEY));
        assert!(logs_contain("skipping counterpart"));
    }

    #[tokio::test]
    async fn sweep_stops_when_cancelled() {
        let (_dir, store) = temp_storage().await;
        store.register_ledger_address("@a", None, A).await.unwrap();
        let ledger = Arc::new(ScriptedLedger::new("0xself", TOKEN));
        let reconciler = ChannelReconciler::new(ledger.clone(), Arc::new(store), config());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = reconciler.reconcile_all(&cancel).await.unwrap();
        assert!(report.cancelled);
        assert_eq!(report.checked, 0);
        assert!(ledger.calls().await.is_empty());
    }

    #[tokio::test]
    async fn ensure_channel_opens_waits_and_pays_bonus() {
        let (_dir, ledger, reconciler) = setup().await;
        ledger.confirm_after(Some(1)).await;

        let outcome = reconciler
            .ensure_channel(A, &CancellationToken::new())
            .await
            .unwrap();
        assert!(matches!(outcome, EnsureOutcome::Opened(_)));
        assert_eq!(
            ledger.writes().await,
            vec![
                LedgerCall::OpenChannel {
                    counterpart: A.into(),
                    amount: 110 * FINNEY,
                    settle_timeout: 100
                },
                LedgerCall::Transfer {
                    target: A.into(),
                    amount: 10 * FINNEY,
                    direct: true
                },
            ]
        );
    }

    #[tokio::test]
    async fn ensure_channel_twice_writes_once() {
        let (_dir, ledger, reconciler) = setup().await;
        let cancel = CancellationToken::new();
        reconciler.ensure_channel(A, &cancel).await.unwrap();
        let second = reconciler.ensure_channel(A, &cancel).await.unwrap();

        assert!(matches!(second, EnsureOutcome::Existing(_)));
        let opens = ledger
            .writes()
            .await
            .into_iter()
            .filter(|c| matches!(c, LedgerCall::OpenChannel { .. }))
            .count();
        assert_eq!(opens, 1);
    }

    fn bonus_transfers(calls: &[LedgerCall]) -> usize {
        calls
            .iter()
            .filter(|c| matches!(c, LedgerCall::Transfer { amount, .. } if *amount == 10 * FINNEY))
            .count()
    }

    #[tokio::test]
    async fn failed_bonus_is_paid_on_retry_exactly_once() {
        let (_dir, ledger, reconciler) = setup().await;
        let cancel = CancellationToken::new();
        ledger.fail_transfers().await;

        let err = reconciler.ensure_channel(A, &cancel).await.unwrap_err();
        assert!(matches!(err, PubrewardError::Ledger { .. }));
        assert_eq!(ledger.balance_of(A).await, Some(110 * FINNEY));

        ledger.restore_transfers().await;
        let retried = reconciler.ensure_channel(A, &cancel).await.unwrap();
        assert!(matches!(retried, EnsureOutcome::BonusPaid(_)));

        let settled = reconciler.ensure_channel(A, &cancel).await.unwrap();
        assert!(matches!(settled, EnsureOutcome::Existing(_)));

        let writes = ledger.writes().await;
        let opens = writes
            .iter()
            .filter(|c| matches!(c, LedgerCall::OpenChannel { .. }))
            .count();
        assert_eq!(opens, 1);
        // One failed attempt, one successful one.
        assert_eq!(bonus_transfers(&writes), 2);
    }

    #[tokio::test]
    async fn sweep_pays_bonus_owed_after_confirmation_timeout() {
        let (_dir, store) = temp_storage().await;
        store.register_ledger_address("@a", None, A).await.unwrap();
        let ledger = Arc::new(ScriptedLedger::new("0xself", TOKEN));
        ledger.confirm_after(None).await;
        let reconciler = ChannelReconciler::new(ledger.clone(), Arc::new(store), config());
        let cancel = CancellationToken::new();

        let err = reconciler.ensure_channel(A, &cancel).await.unwrap_err();
        assert!(matches!(err, PubrewardError::ChannelTimeout { .. }));

        // The channel confirms later, outside the polling window.
        ledger.with_channel(A, 110 * FINNEY).await;
        let report = reconciler.reconcile_all(&cancel).await.unwrap();
        assert_eq!(report.bonus_paid, 1);
        assert!(report.failed.is_empty());

        let again = reconciler.reconcile_all(&cancel).await.unwrap();
        assert_eq!(again.healthy, 1);
        assert_eq!(again.bonus_paid, 0);
        assert_eq!(bonus_transfers(&ledger.writes().await), 1);
    }

    #[tokio::test]
    async fn unconfirmed_channel_times_out_without_bonus() {
        let (_dir, ledger, reconciler) = setup().await;
        ledger.confirm_after(None).await;

        let err = reconciler
            .ensure_channel(A, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PubrewardError::ChannelTimeout { attempts: 3, .. }
        ));
        assert!(!ledger
            .writes()
            .await
            .iter()
            .any(|c| matches!(c, LedgerCall::Transfer { .. })));
    }

    #[tokio::test]
    async fn cancellation_interrupts_confirmation_wait() {
        let (_dir, ledger, reconciler) = setup().await;
        ledger.confirm_after(None).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = reconciler.ensure_channel(A, &cancel).await.unwrap_err();
        assert!(matches!(err, PubrewardError::Cancelled(_)));
    }

    #[tokio::test]
    async fn bad_address_never_reaches_ledger() {
        let (_dir, ledger, reconciler) = setup().await;
        let err = reconciler
            .ensure_channel("not-an-address", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PubrewardError::InvalidInput(_)));
        assert!(ledger.calls().await.is_empty());
    }

    #[tokio::test]
    async fn reconcile_one_deposits_shortfall() {
        let (_dir, ledger, reconciler) = setup().await;
        ledger.with_channel(A, 40 * FINNEY).await;

        let action = reconciler
            .reconcile_one(A, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(action, ReconcileAction::ToppedUp(60 * FINNEY));
        assert_eq!(ledger.balance_of(A).await, Some(100 * FINNEY));

        let again = reconciler
            .reconcile_one(A, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(again, ReconcileAction::Healthy);
    }

    #[tokio::test]
    async fn reward_is_a_direct_transfer() {
        let (_dir, ledger, reconciler) = setup().await;
        reconciler.reward(A, 5 * FINNEY).await.unwrap();
        assert_eq!(
            ledger.calls().await,
            vec![LedgerCall::Transfer {
                target: A.into(),
                amount: 5 * FINNEY,
                direct: true
            }]
        );
    }
}
