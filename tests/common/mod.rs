#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use automated_analysis::{
    models::AnalysisReport, ActiveRecording, AnalysisRecordingConfig, ApiError,
    ArchivedRecording, RecordingApi, ReportSource, RuleEvaluation, Target,
};
use tokio::sync::Notify;

pub const TARGET_URL: &str = "service:jmx:rmi:///jndi/rmi://cryostat-sample:9091/jmxrmi";

pub fn target() -> Target {
    Target::new(TARGET_URL).with_alias("sample-app")
}

pub fn evaluations(tag: &str) -> AnalysisReport {
    vec![
        RuleEvaluation::new("gc", format!("{tag} GC Pauses"), 80.0),
        RuleEvaluation::new("gc", format!("{tag} Heap Usage"), 10.0),
        RuleEvaluation::new("io", format!("{tag} File Read"), 55.0),
    ]
}

pub fn archived(name: &str, archived_time: i64) -> ArchivedRecording {
    ArchivedRecording {
        name: name.into(),
        report_url: None,
        labels: Default::default(),
        size: 1024,
        archived_time,
    }
}

pub fn analysis_recording() -> ActiveRecording {
    ActiveRecording::reserved(&AnalysisRecordingConfig::default())
}

/// Scripted stand-in for the remote management API. Every call is recorded
/// as a short string so tests can assert on the order of remote calls.
pub struct FakeApi {
    active: Mutex<Result<Option<ActiveRecording>, ApiError>>,
    archived: Mutex<Result<Vec<ArchivedRecording>, ApiError>>,
    reports: Mutex<HashMap<String, Result<AnalysisReport, ApiError>>>,
    create: Mutex<Result<ActiveRecording, ApiError>>,
    delete: Mutex<Result<(), ApiError>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    calls: Mutex<Vec<String>>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            active: Mutex::new(Ok(None)),
            archived: Mutex::new(Ok(Vec::new())),
            reports: Mutex::new(HashMap::new()),
            create: Mutex::new(Ok(analysis_recording())),
            delete: Mutex::new(Ok(())),
            gates: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_active(&self, active: Result<Option<ActiveRecording>, ApiError>) {
        *self.active.lock().unwrap() = active;
    }

    pub fn set_archived(&self, archived: Result<Vec<ArchivedRecording>, ApiError>) {
        *self.archived.lock().unwrap() = archived;
    }

    pub fn set_report(&self, recording: &str, report: Result<AnalysisReport, ApiError>) {
        self.reports
            .lock()
            .unwrap()
            .insert(recording.to_string(), report);
    }

    pub fn set_create(&self, create: Result<ActiveRecording, ApiError>) {
        *self.create.lock().unwrap() = create;
    }

    pub fn set_delete(&self, delete: Result<(), ApiError>) {
        *self.delete.lock().unwrap() = delete;
    }

    /// Holds report generation for `recording` until the returned gate is
    /// notified.
    pub fn gate_report(&self, recording: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(recording.to_string(), gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, call: &str) -> bool {
        self.calls().iter().any(|recorded| recorded == call)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RecordingApi for FakeApi {
    async fn query_active_recording(
        &self,
        _target: &Target,
        _config: &AnalysisRecordingConfig,
    ) -> Result<Option<ActiveRecording>, ApiError> {
        self.record("query_active".into());
        self.active.lock().unwrap().clone()
    }

    async fn query_archived_recordings(
        &self,
        _target: &Target,
    ) -> Result<Vec<ArchivedRecording>, ApiError> {
        self.record("query_archived".into());
        self.archived.lock().unwrap().clone()
    }

    async fn generate_report(
        &self,
        _target: &Target,
        source: ReportSource<'_>,
    ) -> Result<AnalysisReport, ApiError> {
        let name = source.name().to_string();
        self.record(format!("report:{name}"));

        let gate = self.gates.lock().unwrap().get(&name).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.reports
            .lock()
            .unwrap()
            .get(&name)
            .cloned()
            .unwrap_or(Err(ApiError::http(500, "no report scripted")))
    }

    async fn create_recording(
        &self,
        _target: &Target,
        config: &AnalysisRecordingConfig,
    ) -> Result<ActiveRecording, ApiError> {
        self.record(format!("create:{}", config.name));
        self.create.lock().unwrap().clone()
    }

    async fn delete_recording(&self, _target: &Target, name: &str) -> Result<(), ApiError> {
        self.record(format!("delete:{name}"));
        self.delete.lock().unwrap().clone()
    }
}
