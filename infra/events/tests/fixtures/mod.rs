#![allow(dead_code, unreachable_pub)]

use eventful::{Flow, Handler};
use std::sync::{Arc, Mutex, Once};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderPlaced {
    pub id: u64,
    pub total: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderCancelled(pub u64);

/// Shared log of which handlers ran, in invocation order.
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.calls.lock().unwrap().push(entry.into());
    }

    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// A handler for `T` that records `name` and returns `flow`.
    #[must_use]
    pub fn handler<T: Send + Sync + 'static>(&self, name: &'static str, flow: Flow) -> Handler<T> {
        let recorder = self.clone();
        Handler::new(move |_: &T| {
            recorder.record(name);
            flow
        })
    }
}

static TRACING: Once = Once::new();

/// Installs a test-friendly subscriber once per test binary. Honors `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
