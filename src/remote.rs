//! Interfaces to the remote management API and the shared target session.
//! Transport and target selection live outside this crate.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::errors::ApiError;
use crate::models::{
    ActiveRecording, AnalysisRecordingConfig, AnalysisReport, ArchivedRecording, Target,
};

/// Recording a report is requested for.
#[derive(Debug, Clone, Copy)]
pub enum ReportSource<'a> {
    Active(&'a ActiveRecording),
    Archived(&'a ArchivedRecording),
}

impl ReportSource<'_> {
    pub fn name(&self) -> &str {
        match self {
            ReportSource::Active(recording) => &recording.name,
            ReportSource::Archived(recording) => &recording.name,
        }
    }
}

#[async_trait]
pub trait RecordingApi: Send + Sync {
    /// Looks up the reserved analysis recording on the target. `Ok(None)` and
    /// `Err(ApiError::NotFound)` both mean "no such recording".
    async fn query_active_recording(
        &self,
        target: &Target,
        config: &AnalysisRecordingConfig,
    ) -> Result<Option<ActiveRecording>, ApiError>;

    async fn query_archived_recordings(
        &self,
        target: &Target,
    ) -> Result<Vec<ArchivedRecording>, ApiError>;

    async fn generate_report(
        &self,
        target: &Target,
        source: ReportSource<'_>,
    ) -> Result<AnalysisReport, ApiError>;

    /// Starts the reserved analysis recording. Returns
    /// `Err(ApiError::AlreadyExists)` if it is already running.
    async fn create_recording(
        &self,
        target: &Target,
        config: &AnalysisRecordingConfig,
    ) -> Result<ActiveRecording, ApiError>;

    async fn delete_recording(&self, target: &Target, name: &str) -> Result<(), ApiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailureOrigin {
    /// Raised by the resolver after a collaborator call was rejected.
    Resolver,
    /// Pushed by the target-session owner.
    External,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthFailure {
    /// `None` applies to every target.
    pub connect_url: Option<String>,
    pub origin: AuthFailureOrigin,
}

impl AuthFailure {
    pub fn applies_to(&self, connect_url: &str) -> bool {
        self.connect_url
            .as_deref()
            .map_or(true, |url| url == connect_url)
    }
}

const AUTH_SIGNAL_CAPACITY: usize = 16;

/// Broadcast stream of authentication failures shared by every consumer of a
/// target session.
#[derive(Clone)]
pub struct AuthFailureSignal {
    tx: broadcast::Sender<AuthFailure>,
}

impl Default for AuthFailureSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthFailureSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(AUTH_SIGNAL_CAPACITY);
        Self { tx }
    }

    pub fn notify(&self, connect_url: Option<&str>, origin: AuthFailureOrigin) {
        // No subscribers is fine.
        let _ = self.tx.send(AuthFailure {
            connect_url: connect_url.map(str::to_string),
            origin,
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthFailure> {
        self.tx.subscribe()
    }
}
