//! Scripted collaborators for exercising the checker and scheduler.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use common::{Error, Notifier, PriceSource, Result};

/// Price source answering from a fixed table. Symbols missing from the
/// table are unavailable.
#[derive(Default)]
pub struct StaticPrices {
    prices: Mutex<HashMap<String, f64>>,
    calls: AtomicUsize,
}

impl StaticPrices {
    pub fn with(pairs: &[(&str, f64)]) -> Self {
        let source = Self::default();
        for (symbol, price) in pairs {
            source.set(symbol, *price);
        }
        source
    }

    pub fn set(&self, symbol: &str, price: f64) {
        self.prices.lock().unwrap().insert(symbol.to_string(), price);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for StaticPrices {
    async fn get_price(&self, symbol: &str) -> Option<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prices.lock().unwrap().get(symbol).copied()
    }
}

/// Notifier that remembers every attempt and can be told to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(i64, String)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: i64, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push((recipient, text.to_string()));
        if self.fail {
            return Err(Error::Notification("Forbidden: bot was blocked by the user".into()));
        }
        Ok(())
    }
}
