use std::sync::Arc;

use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::models::now_millis;

use super::{Staleness, StalenessState};

const ENABLE_LOGS: bool = true;

use crate::log_debug;

struct Ticker {
    report_timestamp_ms: i64,
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

/// Publishes how old the displayed report is, waking exactly when the shown
/// quantity changes. Purely presentational.
#[derive(Clone)]
pub struct StalenessClock {
    tx: Arc<watch::Sender<Option<Staleness>>>,
    ticker: Arc<Mutex<Option<Ticker>>>,
    /// Parent of every ticker's token; cancelled once by `shutdown`.
    shutdown: CancellationToken,
}

impl Default for StalenessClock {
    fn default() -> Self {
        Self::new()
    }
}

impl StalenessClock {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            ticker: Arc::new(Mutex::new(None)),
            shutdown: CancellationToken::new(),
        }
    }

    /// `None` while no report timestamp is being tracked.
    pub fn subscribe(&self) -> watch::Receiver<Option<Staleness>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Option<Staleness> {
        *self.tx.borrow()
    }

    pub async fn start(&self, report_timestamp_ms: i64) {
        self.start_at(report_timestamp_ms, now_millis()).await;
    }

    /// Like `start`, with the wall-clock reading supplied by the caller.
    pub async fn start_at(&self, report_timestamp_ms: i64, now_ms: i64) {
        if self.shutdown.is_cancelled() {
            return;
        }

        let mut ticker_guard = self.ticker.lock().await;
        if let Some(previous) = ticker_guard.take() {
            previous.cancel_token.cancel();
            previous.handle.abort();
        }

        let state = StalenessState::new(report_timestamp_ms, now_ms, Instant::now());
        self.tx.send_replace(Some(state.current()));

        let cancel_token = self.shutdown.child_token();
        let token = cancel_token.clone();
        let tx = self.tx.clone();

        let handle = tokio::spawn(async move {
            while !token.is_cancelled() {
                let staleness = state.current();
                tx.send_replace(Some(staleness));
                log_debug!(
                    "report from {} is {} old; next update in {:?}",
                    state.report_timestamp_ms,
                    staleness.display(),
                    staleness.next_update_in
                );

                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = time::sleep(staleness.next_update_in) => {}
                }
            }
        });

        *ticker_guard = Some(Ticker {
            report_timestamp_ms,
            handle,
            cancel_token,
        });
    }

    /// Follows `report_timestamp_ms`, or stops when there is none. Tracking the
    /// timestamp that is already running is a no-op.
    pub async fn track(&self, report_timestamp_ms: Option<i64>) {
        match report_timestamp_ms {
            Some(timestamp) if self.tracked_timestamp().await == Some(timestamp) => {}
            Some(timestamp) => self.start(timestamp).await,
            None => self.stop().await,
        }
    }

    pub async fn tracked_timestamp(&self) -> Option<i64> {
        self.ticker
            .lock()
            .await
            .as_ref()
            .filter(|ticker| !ticker.handle.is_finished())
            .map(|ticker| ticker.report_timestamp_ms)
    }

    pub async fn stop(&self) {
        if let Some(ticker) = self.ticker.lock().await.take() {
            ticker.cancel_token.cancel();
            let _ = ticker.handle.await;
        }
        self.tx.send_replace(None);
    }

    /// Stops the clock for good: the running ticker exits and later starts
    /// are ignored. Synchronous so owners can call it from `Drop`.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.tx.send_replace(None);
    }

    pub async fn is_running(&self) -> bool {
        self.tracked_timestamp().await.is_some()
    }
}
