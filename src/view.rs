//! Consumer-side binding for one selected target: follows the resolver's
//! state for that target and keeps the staleness clock in step with it.

use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::models::Target;
use crate::resolver::{ReportState, SourceResolver};
use crate::staleness::{Staleness, StalenessClock};

const ENABLE_LOGS: bool = true;

use crate::log_info;

struct Follower {
    target: Target,
    state_rx: watch::Receiver<ReportState>,
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

pub struct AnalysisView {
    resolver: SourceResolver,
    clock: StalenessClock,
    follower: Option<Follower>,
}

/// "Showing cached report from 3 minutes ago." for non-live reports.
pub fn staleness_text(state: &ReportState, staleness: Option<&Staleness>) -> Option<String> {
    let prefix = state.provenance()?.description()?;
    let staleness = staleness?;
    Some(format!("{prefix} {} ago.", staleness.display()))
}

impl AnalysisView {
    pub fn new(resolver: SourceResolver) -> Self {
        Self {
            resolver,
            clock: StalenessClock::new(),
            follower: None,
        }
    }

    pub fn target(&self) -> Option<&Target> {
        self.follower.as_ref().map(|follower| &follower.target)
    }

    pub fn state(&self) -> Option<ReportState> {
        self.follower
            .as_ref()
            .map(|follower| follower.state_rx.borrow().clone())
    }

    pub fn staleness(&self) -> watch::Receiver<Option<Staleness>> {
        self.clock.subscribe()
    }

    pub fn staleness_text(&self) -> Option<String> {
        let state = self.state()?;
        staleness_text(&state, self.clock.current().as_ref())
    }

    /// Switches to `target` and resolves its report. Anything still in flight
    /// for the previous target no longer reaches this view.
    pub async fn select_target(&mut self, target: Target) -> ReportState {
        self.close().await;
        log_info!("Selected target {}", target.display_name());

        let state_rx = self.resolver.subscribe(&target).await;
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(follow_state(
            state_rx.clone(),
            self.clock.clone(),
            cancel_token.clone(),
        ));

        self.follower = Some(Follower {
            target: target.clone(),
            state_rx,
            handle,
            cancel_token,
        });

        let state = self.resolver.resolve(&target).await;
        self.clock.track(state.staleness_timestamp()).await;
        state
    }

    pub async fn refresh(&mut self) -> Option<ReportState> {
        let target = self.target()?.clone();
        let state = self.resolver.resolve(&target).await;
        self.clock.track(state.staleness_timestamp()).await;
        Some(state)
    }

    /// Stops following the current target and its staleness clock.
    pub async fn close(&mut self) {
        if let Some(follower) = self.follower.take() {
            follower.cancel_token.cancel();
            let _ = follower.handle.await;
        }
        self.clock.stop().await;
    }
}

impl Drop for AnalysisView {
    /// A view dropped without `close` still stops following and ticking.
    fn drop(&mut self) {
        if let Some(follower) = self.follower.take() {
            follower.cancel_token.cancel();
        }
        self.clock.shutdown();
    }
}

async fn follow_state(
    mut state_rx: watch::Receiver<ReportState>,
    clock: StalenessClock,
    cancel_token: CancellationToken,
) {
    loop {
        let timestamp = state_rx.borrow_and_update().staleness_timestamp();
        clock.track(timestamp).await;

        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = cancel_token.cancelled() => break,
        }
    }
}
