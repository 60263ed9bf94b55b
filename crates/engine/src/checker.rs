use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use common::{Alarm, Error, Notifier, Platform, PriceSource, Result};
use store::AlarmStore;

use crate::bridge::deliver;
use crate::evaluator::is_triggered;
use crate::message::trigger_message;

/// Counters for one pass over the active alarms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Alarms whose price was fetched and evaluated.
    pub checked: usize,
    pub triggered: usize,
    /// Alarms skipped because no price was available.
    pub unavailable: usize,
    /// Alarms whose processing hit a storage error.
    pub failed: usize,
}

/// Runs a single tick: evaluates every active alarm against a live price,
/// notifies and deactivates the ones that fire, and records price history.
///
/// Holds no alarm state between ticks; the active set is re-read from the
/// store on every call.
pub struct AlarmChecker {
    store: AlarmStore,
    prices: Arc<dyn PriceSource>,
    notifiers: HashMap<Platform, Arc<dyn Notifier>>,
}

impl AlarmChecker {
    pub fn new(store: AlarmStore, prices: Arc<dyn PriceSource>) -> Self {
        Self {
            store,
            prices,
            notifiers: HashMap::new(),
        }
    }

    /// Register the notifier used for alarms owned by `platform`.
    pub fn with_notifier(mut self, platform: Platform, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.insert(platform, notifier);
        self
    }

    /// Check every active alarm once. Never fails: per-alarm errors are
    /// logged and counted, and a store failure ends the tick early.
    pub async fn check_alarms(&self) -> TickReport {
        let tick_at = Utc::now();
        let mut report = TickReport::default();

        let alarms = match self.store.list_active_alarms().await {
            Ok(alarms) => alarms,
            Err(e) => {
                error!(error = %e, "Failed to load active alarms, skipping tick");
                return report;
            }
        };

        if alarms.is_empty() {
            info!("No active alarms");
            return report;
        }

        info!(count = alarms.len(), "Checking alarms");

        for alarm in &alarms {
            if let Err(e) = self.check_alarm(alarm, tick_at, &mut report).await {
                report.failed += 1;
                error!(alarm_id = alarm.id, symbol = %alarm.symbol, error = %e, "Alarm check failed");
            }
        }

        info!(
            checked = report.checked,
            triggered = report.triggered,
            unavailable = report.unavailable,
            failed = report.failed,
            "Alarm check complete"
        );
        report
    }

    /// Counters are bumped as each step completes, so an alarm that fired
    /// before a storage error is reported as both triggered and failed.
    async fn check_alarm(
        &self,
        alarm: &Alarm,
        tick_at: DateTime<Utc>,
        report: &mut TickReport,
    ) -> Result<()> {
        let Some(price) = self.prices.get_price(&alarm.symbol).await else {
            let e = Error::PriceUnavailable(alarm.symbol.clone());
            warn!(alarm_id = alarm.id, error = %e, "Skipping alarm this tick");
            report.unavailable += 1;
            return Ok(());
        };
        report.checked += 1;

        if is_triggered(alarm.condition, alarm.target_price, price) {
            self.notify(alarm, price, tick_at).await;
            self.store.deactivate_alarm(alarm.id).await?;
            report.triggered += 1;
            info!(
                alarm_id = alarm.id,
                owner = alarm.owner,
                symbol = %alarm.symbol,
                target = alarm.target_price,
                price,
                "Alarm triggered and deactivated"
            );
        }

        self.store.record_price_sample(&alarm.symbol, price).await?;
        Ok(())
    }

    /// One delivery attempt. The outcome is logged and otherwise ignored so
    /// that deactivation always follows.
    async fn notify(&self, alarm: &Alarm, price: f64, tick_at: DateTime<Utc>) {
        let Some(notifier) = self.notifiers.get(&alarm.platform) else {
            warn!(alarm_id = alarm.id, platform = %alarm.platform, "No notifier registered for platform");
            return;
        };

        let text = trigger_message(alarm, price, tick_at);
        match deliver(notifier.clone(), alarm.owner, text).await {
            Ok(()) => info!(alarm_id = alarm.id, owner = alarm.owner, "Notification sent"),
            Err(e) => warn!(alarm_id = alarm.id, owner = alarm.owner, error = %e, "Notification failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingNotifier, StaticPrices};
    use common::Condition;

    async fn setup(
        prices: StaticPrices,
        notifier: RecordingNotifier,
    ) -> (AlarmChecker, AlarmStore, Arc<StaticPrices>, Arc<RecordingNotifier>) {
        let store = AlarmStore::in_memory().await.unwrap();
        let prices = Arc::new(prices);
        let notifier = Arc::new(notifier);
        let checker = AlarmChecker::new(store.clone(), prices.clone())
            .with_notifier(Platform::Telegram, notifier.clone());
        (checker, store, prices, notifier)
    }

    #[tokio::test]
    async fn above_alarm_fires_at_target_and_notifies_owner() {
        let (checker, store, _prices, notifier) =
            setup(StaticPrices::with(&[("BTCUSDT", 50_000.0)]), RecordingNotifier::default()).await;
        let id = store
            .create_alarm(42, "BTCUSDT", 50_000.0, Condition::Above, Platform::Telegram)
            .await
            .unwrap();

        let report = checker.check_alarms().await;

        assert_eq!(report.triggered, 1);
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 42);
        assert!(sent[0].1.contains("BTCUSDT"));
        assert!(!store.get_alarm(id).await.unwrap().unwrap().active);
        assert!(store.list_active_alarms_for_owner(42).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn below_alarm_above_target_stays_active_and_records_sample() {
        let (checker, store, _prices, notifier) =
            setup(StaticPrices::with(&[("ETHUSDT", 2_500.0)]), RecordingNotifier::default()).await;
        let id = store
            .create_alarm(7, "ETHUSDT", 2_000.0, Condition::Below, Platform::Telegram)
            .await
            .unwrap();

        let report = checker.check_alarms().await;

        assert_eq!(report, TickReport { checked: 1, ..TickReport::default() });
        assert!(notifier.sent().is_empty());
        assert!(store.get_alarm(id).await.unwrap().unwrap().active);
        let samples = store.recent_price_samples("ETHUSDT", 10).await.unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].price, 2_500.0);
    }

    #[tokio::test]
    async fn unavailable_price_skips_alarm_without_sample() {
        let (checker, store, _prices, notifier) =
            setup(StaticPrices::default(), RecordingNotifier::default()).await;
        let id = store
            .create_alarm(3, "XRPUSDT", 0.5, Condition::Above, Platform::Telegram)
            .await
            .unwrap();

        let report = checker.check_alarms().await;

        assert_eq!(report.unavailable, 1);
        assert_eq!(report.checked, 0);
        assert!(notifier.sent().is_empty());
        assert!(store.get_alarm(id).await.unwrap().unwrap().active);
        assert!(store.recent_price_samples("XRPUSDT", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_symbol_does_not_block_other_alarms() {
        let (checker, store, _prices, notifier) =
            setup(StaticPrices::with(&[("BTCUSDT", 70_000.0)]), RecordingNotifier::default()).await;
        let a = store
            .create_alarm(1, "DOGEUSDT", 1.0, Condition::Above, Platform::Telegram)
            .await
            .unwrap();
        let b = store
            .create_alarm(2, "BTCUSDT", 65_000.0, Condition::Above, Platform::Telegram)
            .await
            .unwrap();

        let report = checker.check_alarms().await;

        assert_eq!(report.unavailable, 1);
        assert_eq!(report.triggered, 1);
        assert!(store.get_alarm(a).await.unwrap().unwrap().active);
        assert!(!store.get_alarm(b).await.unwrap().unwrap().active);
        assert!(store.recent_price_samples("DOGEUSDT", 10).await.unwrap().is_empty());
        assert_eq!(store.recent_price_samples("BTCUSDT", 10).await.unwrap().len(), 1);
        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(notifier.sent()[0].0, 2);
    }

    #[tokio::test]
    async fn triggered_alarm_fires_only_once() {
        let (checker, store, _prices, notifier) =
            setup(StaticPrices::with(&[("BTCUSDT", 80_000.0)]), RecordingNotifier::default()).await;
        store
            .create_alarm(42, "BTCUSDT", 50_000.0, Condition::Above, Platform::Telegram)
            .await
            .unwrap();

        checker.check_alarms().await;
        let second = checker.check_alarms().await;

        assert_eq!(second, TickReport::default());
        assert_eq!(notifier.sent().len(), 1);
        assert!(store.list_active_alarms().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn notification_failure_still_deactivates() {
        let (checker, store, _prices, notifier) =
            setup(StaticPrices::with(&[("ETHUSDT", 1_500.0)]), RecordingNotifier::failing()).await;
        let id = store
            .create_alarm(7, "ETHUSDT", 2_000.0, Condition::Below, Platform::Telegram)
            .await
            .unwrap();

        let report = checker.check_alarms().await;

        assert_eq!(report.triggered, 1);
        assert_eq!(notifier.sent().len(), 1, "exactly one attempt");
        assert!(!store.get_alarm(id).await.unwrap().unwrap().active);
        assert_eq!(store.recent_price_samples("ETHUSDT", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_notifier_still_deactivates() {
        let store = AlarmStore::in_memory().await.unwrap();
        let checker = AlarmChecker::new(
            store.clone(),
            Arc::new(StaticPrices::with(&[("BTCUSDT", 10.0)])),
        );
        let id = store
            .create_alarm(1, "BTCUSDT", 20.0, Condition::Below, Platform::Telegram)
            .await
            .unwrap();

        let report = checker.check_alarms().await;

        assert_eq!(report.triggered, 1);
        assert!(!store.get_alarm(id).await.unwrap().unwrap().active);
    }

    #[tokio::test]
    async fn deletion_between_ticks_is_seen_on_next_tick() {
        let (checker, store, prices, notifier) =
            setup(StaticPrices::with(&[("BTCUSDT", 40_000.0)]), RecordingNotifier::default()).await;
        let id = store
            .create_alarm(42, "BTCUSDT", 50_000.0, Condition::Above, Platform::Telegram)
            .await
            .unwrap();

        checker.check_alarms().await;
        assert!(store.delete_alarm_if_owned(id, 42).await.unwrap());
        prices.set("BTCUSDT", 60_000.0);
        let report = checker.check_alarms().await;

        assert_eq!(report, TickReport::default());
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn storage_error_on_one_alarm_does_not_stop_the_tick() {
        // A zero quote is never a valid sample, so recording it fails.
        let (checker, store, _prices, notifier) = setup(
            StaticPrices::with(&[("ZEROUSDT", 0.0), ("BTCUSDT", 70_000.0)]),
            RecordingNotifier::default(),
        )
        .await;
        let broken = store
            .create_alarm(1, "ZEROUSDT", 5.0, Condition::Above, Platform::Telegram)
            .await
            .unwrap();
        let healthy = store
            .create_alarm(2, "BTCUSDT", 65_000.0, Condition::Above, Platform::Telegram)
            .await
            .unwrap();

        let report = checker.check_alarms().await;

        assert_eq!(
            report,
            TickReport {
                checked: 2,
                triggered: 1,
                unavailable: 0,
                failed: 1,
            }
        );
        assert!(store.get_alarm(broken).await.unwrap().unwrap().active);
        assert!(!store.get_alarm(healthy).await.unwrap().unwrap().active);
        assert_eq!(store.recent_price_samples("BTCUSDT", 10).await.unwrap().len(), 1);
        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(notifier.sent()[0].0, 2);
    }

    #[tokio::test]
    async fn trigger_is_counted_even_if_sample_write_fails() {
        let (checker, store, _prices, notifier) =
            setup(StaticPrices::with(&[("ZEROUSDT", 0.0)]), RecordingNotifier::default()).await;
        let id = store
            .create_alarm(9, "ZEROUSDT", 1.0, Condition::Below, Platform::Telegram)
            .await
            .unwrap();

        let report = checker.check_alarms().await;

        assert_eq!(
            report,
            TickReport {
                checked: 1,
                triggered: 1,
                unavailable: 0,
                failed: 1,
            }
        );
        assert_eq!(notifier.sent().len(), 1);
        assert!(!store.get_alarm(id).await.unwrap().unwrap().active);
        assert!(store.recent_price_samples("ZEROUSDT", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_store_is_a_no_op_tick() {
        let (checker, _store, prices, _notifier) =
            setup(StaticPrices::default(), RecordingNotifier::default()).await;

        assert_eq!(checker.check_alarms().await, TickReport::default());
        assert_eq!(prices.calls(), 0);
    }
}
