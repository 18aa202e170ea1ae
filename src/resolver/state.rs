//! Report state machine. The resolver never mutates state directly: each step
//! of a resolution produces a `ResolverEvent` and `reduce` folds it into the
//! next immutable `ReportState`.

use serde::Serialize;

use crate::analysis::{categorize, CategorizedReport};
use crate::cache::CacheEntry;
use crate::errors::ErrorKind;
use crate::models::AnalysisReport;

/// Where the displayed report came from. Only non-live sources carry a
/// timestamp, which drives the staleness display.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "source")]
pub enum Provenance {
    Live,
    Cached { timestamp: i64 },
    Archived { timestamp: i64 },
}

impl Provenance {
    /// Age reference for non-live reports. A zero or negative timestamp means
    /// the source never recorded one, so there is no age to show.
    pub fn timestamp(&self) -> Option<i64> {
        match self {
            Provenance::Live => None,
            Provenance::Cached { timestamp } | Provenance::Archived { timestamp } => {
                Some(*timestamp).filter(|timestamp| *timestamp > 0)
            }
        }
    }

    pub fn description(&self) -> Option<&'static str> {
        match self {
            Provenance::Live => None,
            Provenance::Cached { .. } => Some("Showing cached report from"),
            Provenance::Archived { .. } => Some("Showing archived report from"),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "status", content = "detail")]
pub enum ReportState {
    Loading,
    Ready {
        report: CategorizedReport,
        provenance: Provenance,
    },
    Failed(ErrorKind),
}

impl ReportState {
    pub fn is_loading(&self) -> bool {
        matches!(self, ReportState::Loading)
    }

    pub fn provenance(&self) -> Option<Provenance> {
        match self {
            ReportState::Ready { provenance, .. } => Some(*provenance),
            _ => None,
        }
    }

    pub fn report(&self) -> Option<&CategorizedReport> {
        match self {
            ReportState::Ready { report, .. } => Some(report),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<ErrorKind> {
        match self {
            ReportState::Failed(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn staleness_timestamp(&self) -> Option<i64> {
        self.provenance().and_then(|provenance| provenance.timestamp())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolverEvent {
    Started,
    LiveReport(AnalysisReport),
    CachedReport(CacheEntry),
    ArchivedReport {
        report: AnalysisReport,
        archived_time: i64,
    },
    Failed(ErrorKind),
    AuthFailed,
    /// The user discarded the cached report without asking for a new one.
    AnalysisCleared,
}

impl ResolverEvent {
    fn is_outcome(&self) -> bool {
        matches!(
            self,
            ResolverEvent::LiveReport(_)
                | ResolverEvent::CachedReport(_)
                | ResolverEvent::ArchivedReport { .. }
                | ResolverEvent::Failed(_)
        )
    }
}

/// Outcomes of a resolution only land on a `Loading` state; auth failures and
/// explicit clears apply whatever the current state is.
pub fn reduce(state: &ReportState, event: ResolverEvent) -> ReportState {
    if event.is_outcome() && !state.is_loading() {
        return state.clone();
    }

    match event {
        ResolverEvent::Started => ReportState::Loading,
        ResolverEvent::LiveReport(report) => ReportState::Ready {
            report: categorize(&report),
            provenance: Provenance::Live,
        },
        ResolverEvent::CachedReport(entry) => ReportState::Ready {
            report: categorize(&entry.report),
            provenance: Provenance::Cached {
                timestamp: entry.timestamp,
            },
        },
        ResolverEvent::ArchivedReport {
            report,
            archived_time,
        } => ReportState::Ready {
            report: categorize(&report),
            provenance: Provenance::Archived {
                timestamp: archived_time,
            },
        },
        ResolverEvent::Failed(kind) => ReportState::Failed(kind),
        ResolverEvent::AuthFailed => ReportState::Failed(ErrorKind::AuthFailure),
        ResolverEvent::AnalysisCleared => ReportState::Failed(ErrorKind::NoRecordings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RuleEvaluation;

    fn report() -> AnalysisReport {
        vec![RuleEvaluation::new("gc", "GC Pauses", 60.0)]
    }

    #[test]
    fn live_report_has_no_staleness_timestamp() {
        let state = reduce(&ReportState::Loading, ResolverEvent::LiveReport(report()));
        assert_eq!(state.provenance(), Some(Provenance::Live));
        assert_eq!(state.staleness_timestamp(), None);
        assert_eq!(state.report().unwrap().evaluation_count(), 1);
    }

    #[test]
    fn cached_and_archived_reports_carry_their_timestamp() {
        let cached = reduce(
            &ReportState::Loading,
            ResolverEvent::CachedReport(CacheEntry {
                target: "t".into(),
                report: report(),
                timestamp: 100,
            }),
        );
        assert_eq!(cached.provenance(), Some(Provenance::Cached { timestamp: 100 }));

        let archived = reduce(
            &ReportState::Loading,
            ResolverEvent::ArchivedReport {
                report: report(),
                archived_time: 200,
            },
        );
        assert_eq!(archived.staleness_timestamp(), Some(200));
    }

    #[test]
    fn unset_timestamp_has_no_staleness() {
        let archived = reduce(
            &ReportState::Loading,
            ResolverEvent::ArchivedReport {
                report: report(),
                archived_time: 0,
            },
        );
        assert_eq!(archived.provenance(), Some(Provenance::Archived { timestamp: 0 }));
        assert_eq!(archived.staleness_timestamp(), None);
        assert_eq!(Provenance::Cached { timestamp: -5 }.timestamp(), None);
    }

    #[test]
    fn outcomes_only_apply_while_loading() {
        let failed = ReportState::Failed(ErrorKind::AuthFailure);
        let next = reduce(&failed, ResolverEvent::LiveReport(report()));
        assert_eq!(next, failed);
    }

    #[test]
    fn auth_failure_and_clear_apply_from_any_state() {
        let ready = reduce(&ReportState::Loading, ResolverEvent::LiveReport(report()));
        assert_eq!(
            reduce(&ready, ResolverEvent::AuthFailed).error(),
            Some(ErrorKind::AuthFailure)
        );
        assert_eq!(
            reduce(&ready, ResolverEvent::AnalysisCleared).error(),
            Some(ErrorKind::NoRecordings)
        );
        assert!(reduce(&ready, ResolverEvent::Started).is_loading());
    }

    #[test]
    fn state_serializes_with_status_tag() {
        let json = serde_json::to_value(ReportState::Failed(ErrorKind::ReportFailure)).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["detail"], "reportFailure");
    }
}
