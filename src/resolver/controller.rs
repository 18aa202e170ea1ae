use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use tokio::sync::{broadcast, watch, Mutex};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::analysis::{CategorizedReport, FilterDelta, FilterSet};
use crate::context::PipelineContext;
use crate::errors::{ApiError, ErrorKind, RecoveryAction};
use crate::models::{ActiveRecording, ArchivedRecording, Target};
use crate::remote::{AuthFailure, AuthFailureOrigin, RecordingApi, ReportSource};

use super::state::{reduce, ReportState, ResolverEvent};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

struct TargetSlot {
    generation: u64,
    state: watch::Sender<ReportState>,
}

impl TargetSlot {
    fn new() -> Self {
        let (state, _) = watch::channel(ReportState::Loading);
        Self {
            generation: 0,
            state,
        }
    }
}

struct ResolverInner {
    api: Arc<dyn RecordingApi>,
    context: PipelineContext,
    targets: Mutex<HashMap<String, TargetSlot>>,
    cleanup: TaskTracker,
    shutdown: CancellationToken,
}

impl Drop for ResolverInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Resolves the best available analysis report for a target by walking the
/// source chain: active recording, cached report, freshest archived recording.
///
/// Every resolution is tagged with a per-target generation. A newer trigger
/// for the same target (or an auth failure) bumps the generation, and the
/// older attempt's outcome is dropped instead of being applied.
#[derive(Clone)]
pub struct SourceResolver {
    inner: Arc<ResolverInner>,
}

/// Freshest recording by `archived_time`; on ties the one listed last wins.
pub fn freshest_archived(recordings: &[ArchivedRecording]) -> Option<&ArchivedRecording> {
    recordings.iter().max_by_key(|recording| recording.archived_time)
}

impl SourceResolver {
    /// Must be called from within a tokio runtime: the auth-failure listener is
    /// spawned immediately.
    pub fn start(api: Arc<dyn RecordingApi>, context: PipelineContext) -> Self {
        let auth_rx = context.auth.subscribe();
        let inner = Arc::new(ResolverInner {
            api,
            context,
            targets: Mutex::new(HashMap::new()),
            cleanup: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        });

        tokio::spawn(auth_failure_listener(
            Arc::downgrade(&inner),
            auth_rx,
            inner.shutdown.clone(),
        ));

        Self { inner }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.inner.context
    }

    pub async fn subscribe(&self, target: &Target) -> watch::Receiver<ReportState> {
        let mut targets = self.inner.targets.lock().await;
        targets
            .entry(target.connect_url.clone())
            .or_insert_with(TargetSlot::new)
            .state
            .subscribe()
    }

    pub async fn current(&self, target: &Target) -> Option<ReportState> {
        let targets = self.inner.targets.lock().await;
        targets
            .get(&target.connect_url)
            .map(|slot| slot.state.borrow().clone())
    }

    /// Runs the source chain and returns the state visible once this attempt
    /// has finished. If a newer attempt superseded this one, that is the newer
    /// attempt's state.
    pub async fn resolve(&self, target: &Target) -> ReportState {
        let generation = self.begin(target).await;
        log_info!("Resolving analysis report for {}", target.display_name());
        let event = self.resolve_chain(target).await;
        self.commit(target, generation, event).await
    }

    /// Starts the reserved analysis recording (an existing one is fine) and
    /// reports on it directly.
    pub async fn start_profiling(&self, target: &Target) -> ReportState {
        let generation = self.begin(target).await;
        log_info!("Starting analysis recording on {}", target.display_name());
        let event = self.profiling_chain(target).await;
        self.commit(target, generation, event).await
    }

    /// Drops the cached report and asks for a fresh one from a new recording.
    pub async fn clear_cache(&self, target: &Target) -> ReportState {
        if let Err(err) = self.inner.context.cache.delete(&target.connect_url).await {
            log_warn!("{err:#}");
        }
        self.start_profiling(target).await
    }

    /// Drops the cached report and leaves the target with nothing to show.
    pub async fn clear_analysis(&self, target: &Target) -> ReportState {
        if let Err(err) = self.inner.context.cache.delete(&target.connect_url).await {
            log_warn!("{err:#}");
        }
        let generation = self.begin(target).await;
        self.commit(target, generation, ResolverEvent::AnalysisCleared)
            .await
    }

    pub async fn recover(&self, target: &Target, action: RecoveryAction) -> ReportState {
        match action {
            RecoveryAction::StartProfiling => self.start_profiling(target).await,
            RecoveryAction::Resolve => self.resolve(target).await,
        }
    }

    pub async fn update_filters(
        &self,
        target: &Target,
        delta: FilterDelta,
    ) -> anyhow::Result<FilterSet> {
        self.inner
            .context
            .filters
            .update_target_filters(&target.connect_url, delta)
            .await
    }

    pub async fn clear_filters(&self, target: &Target) -> anyhow::Result<()> {
        self.inner
            .context
            .filters
            .clear_target_filters(&target.connect_url)
            .await
    }

    /// The current report with the target's and the global filters applied.
    pub async fn filtered_report(
        &self,
        target: &Target,
    ) -> anyhow::Result<Option<CategorizedReport>> {
        let Some(state) = self.current(target).await else {
            return Ok(None);
        };
        let Some(report) = state.report() else {
            return Ok(None);
        };
        let filtered = self
            .inner
            .context
            .filters
            .apply(&target.connect_url, report)
            .await?;
        Ok(Some(filtered))
    }

    /// Waits for background recording cleanups started so far.
    pub async fn wait_for_cleanup(&self) {
        self.inner.cleanup.close();
        self.inner.cleanup.wait().await;
        self.inner.cleanup.reopen();
    }

    async fn begin(&self, target: &Target) -> u64 {
        let mut targets = self.inner.targets.lock().await;
        let slot = targets
            .entry(target.connect_url.clone())
            .or_insert_with(TargetSlot::new);
        slot.generation += 1;
        let next = reduce(&slot.state.borrow(), ResolverEvent::Started);
        slot.state.send_replace(next);
        slot.generation
    }

    async fn commit(&self, target: &Target, generation: u64, event: ResolverEvent) -> ReportState {
        if matches!(event, ResolverEvent::AuthFailed) {
            self.inner
                .context
                .auth
                .notify(Some(&target.connect_url), AuthFailureOrigin::Resolver);
        }

        let mut targets = self.inner.targets.lock().await;
        let slot = targets
            .entry(target.connect_url.clone())
            .or_insert_with(TargetSlot::new);

        if slot.generation != generation {
            log_debug!(
                "Discarding superseded resolution {} for {} (current {})",
                generation,
                target.display_name(),
                slot.generation
            );
            return slot.state.borrow().clone();
        }

        let next = reduce(&slot.state.borrow(), event);
        slot.state.send_replace(next.clone());
        next
    }

    async fn resolve_chain(&self, target: &Target) -> ResolverEvent {
        let api = &self.inner.api;
        match api
            .query_active_recording(target, &self.inner.context.recording)
            .await
        {
            Ok(Some(recording)) => self.live_report(target, recording).await,
            Ok(None) | Err(ApiError::NotFound) => self.fallback_report(target).await,
            Err(err) if err.is_auth() => ResolverEvent::AuthFailed,
            Err(err) => {
                log_error!(
                    "Active recording query failed for {}: {err}",
                    target.display_name()
                );
                ResolverEvent::Failed(ErrorKind::InternalError)
            }
        }
    }

    async fn profiling_chain(&self, target: &Target) -> ResolverEvent {
        let config = &self.inner.context.recording;
        let recording = match self.inner.api.create_recording(target, config).await {
            Ok(recording) => recording,
            Err(ApiError::AlreadyExists) => {
                log_debug!("Analysis recording already running on {}", target.display_name());
                ActiveRecording::reserved(config)
            }
            Err(err) if err.is_auth() => return ResolverEvent::AuthFailed,
            Err(err) => {
                log_error!(
                    "Failed to start analysis recording on {}: {err}",
                    target.display_name()
                );
                return ResolverEvent::Failed(ErrorKind::RecordingCreationFailure);
            }
        };
        self.live_report(target, recording).await
    }

    async fn live_report(&self, target: &Target, recording: ActiveRecording) -> ResolverEvent {
        let result = self
            .inner
            .api
            .generate_report(target, ReportSource::Active(&recording))
            .await;

        if recording.snapshot {
            self.spawn_cleanup(target, recording.name.clone());
        }

        match result {
            Ok(report) => {
                if let Err(err) = self.inner.context.cache.delete(&target.connect_url).await {
                    log_warn!("{err:#}");
                }
                log_info!(
                    "Live report for {} from recording {}",
                    target.display_name(),
                    recording.name
                );
                ResolverEvent::LiveReport(report)
            }
            Err(err) if err.is_auth() => ResolverEvent::AuthFailed,
            Err(err) => {
                log_error!(
                    "Report generation failed for recording {} on {}: {err}",
                    recording.name,
                    target.display_name()
                );
                ResolverEvent::Failed(ErrorKind::ReportFailure)
            }
        }
    }

    async fn fallback_report(&self, target: &Target) -> ResolverEvent {
        let connect_url = &target.connect_url;
        match self.inner.context.cache.get(connect_url).await {
            Ok(Some(entry)) if !entry.report.is_empty() => {
                log_info!("Using cached report for {}", target.display_name());
                return ResolverEvent::CachedReport(entry);
            }
            Ok(_) => {}
            Err(err) => log_warn!("Ignoring unreadable cache entry: {err:#}"),
        }

        let recordings = match self.inner.api.query_archived_recordings(target).await {
            Ok(recordings) => recordings,
            Err(err) if err.is_auth() => return ResolverEvent::AuthFailed,
            Err(err) => {
                log_warn!(
                    "Archived recording query failed for {}: {err}",
                    target.display_name()
                );
                return ResolverEvent::Failed(ErrorKind::NoRecordings);
            }
        };

        let Some(freshest) = freshest_archived(&recordings) else {
            log_info!("No recordings available for {}", target.display_name());
            return ResolverEvent::Failed(ErrorKind::NoRecordings);
        };

        match self
            .inner
            .api
            .generate_report(target, ReportSource::Archived(freshest))
            .await
        {
            Ok(report) => {
                if let Err(err) = self
                    .inner
                    .context
                    .cache
                    .put(connect_url, report.clone(), freshest.archived_time)
                    .await
                {
                    log_warn!("{err:#}");
                }
                log_info!(
                    "Archived report for {} from recording {}",
                    target.display_name(),
                    freshest.name
                );
                ResolverEvent::ArchivedReport {
                    report,
                    archived_time: freshest.archived_time,
                }
            }
            Err(err) if err.is_auth() => ResolverEvent::AuthFailed,
            Err(err) => {
                log_error!(
                    "Report generation failed for archived recording {}: {err}",
                    freshest.name
                );
                ResolverEvent::Failed(ErrorKind::InternalError)
            }
        }
    }

    fn spawn_cleanup(&self, target: &Target, name: String) {
        let api = self.inner.api.clone();
        let target = target.clone();
        self.inner.cleanup.spawn(async move {
            if let Err(err) = api.delete_recording(&target, &name).await {
                log_warn!(
                    "Failed to delete analysis recording {} on {}: {err}",
                    name,
                    target.display_name()
                );
            }
        });
    }

    async fn apply_auth_failure(&self, failure: &AuthFailure) {
        let mut targets = self.inner.targets.lock().await;
        for (connect_url, slot) in targets.iter_mut() {
            if !failure.applies_to(connect_url) {
                continue;
            }
            slot.generation += 1;
            let next = reduce(&slot.state.borrow(), ResolverEvent::AuthFailed);
            slot.state.send_replace(next);
            log_warn!("Authentication failure reported for {}", connect_url);
        }
    }
}

async fn auth_failure_listener(
    inner: Weak<ResolverInner>,
    mut rx: broadcast::Receiver<AuthFailure>,
    shutdown: CancellationToken,
) {
    loop {
        let failure = tokio::select! {
            received = rx.recv() => received,
            _ = shutdown.cancelled() => break,
        };

        match failure {
            Ok(failure) if failure.origin == AuthFailureOrigin::External => {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                SourceResolver { inner }.apply_auth_failure(&failure).await;
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log_warn!("Auth failure listener skipped {} notifications", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
