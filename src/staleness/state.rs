use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

const SECOND_MILLIS: i64 = 1_000;
const MINUTE_MILLIS: i64 = 60 * SECOND_MILLIS;
const HOUR_MILLIS: i64 = 60 * MINUTE_MILLIS;
const DAY_MILLIS: i64 = 24 * HOUR_MILLIS;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StalenessUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl StalenessUnit {
    pub fn millis(self) -> i64 {
        match self {
            StalenessUnit::Seconds => SECOND_MILLIS,
            StalenessUnit::Minutes => MINUTE_MILLIS,
            StalenessUnit::Hours => HOUR_MILLIS,
            StalenessUnit::Days => DAY_MILLIS,
        }
    }

    pub fn for_elapsed(elapsed_ms: i64) -> Self {
        if elapsed_ms < MINUTE_MILLIS {
            StalenessUnit::Seconds
        } else if elapsed_ms < HOUR_MILLIS {
            StalenessUnit::Minutes
        } else if elapsed_ms < DAY_MILLIS {
            StalenessUnit::Hours
        } else {
            StalenessUnit::Days
        }
    }

    pub fn label(self, quantity: u64) -> &'static str {
        match (self, quantity == 1) {
            (StalenessUnit::Seconds, true) => "second",
            (StalenessUnit::Seconds, false) => "seconds",
            (StalenessUnit::Minutes, true) => "minute",
            (StalenessUnit::Minutes, false) => "minutes",
            (StalenessUnit::Hours, true) => "hour",
            (StalenessUnit::Hours, false) => "hours",
            (StalenessUnit::Days, true) => "day",
            (StalenessUnit::Days, false) => "days",
        }
    }
}

/// Age of a report in whole units, floored. `next_update_in` is the time left
/// until the displayed quantity increments.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Staleness {
    pub quantity: u64,
    pub unit: StalenessUnit,
    #[serde(skip)]
    pub next_update_in: Duration,
}

impl Staleness {
    /// Negative elapsed time (clock skew) counts as zero.
    pub fn from_elapsed(elapsed_ms: i64) -> Self {
        let elapsed_ms = elapsed_ms.max(0);
        let unit = StalenessUnit::for_elapsed(elapsed_ms);
        let unit_ms = unit.millis();
        let next_update_ms = unit_ms - elapsed_ms % unit_ms;
        Self {
            quantity: (elapsed_ms / unit_ms) as u64,
            unit,
            next_update_in: Duration::from_millis(next_update_ms as u64),
        }
    }

    pub fn between(report_timestamp_ms: i64, now_ms: i64) -> Self {
        Self::from_elapsed(now_ms.saturating_sub(report_timestamp_ms))
    }

    pub fn as_tuple(&self) -> (u64, StalenessUnit) {
        (self.quantity, self.unit)
    }

    pub fn display(&self) -> String {
        format!("{} {}", self.quantity, self.unit.label(self.quantity))
    }
}

/// Elapsed-time bookkeeping for one report: the age measured against the wall
/// clock when tracking began, plus monotonic time since.
#[derive(Debug, Clone, Copy)]
pub struct StalenessState {
    pub report_timestamp_ms: i64,
    elapsed_baseline_ms: i64,
    anchor: Instant,
}

impl StalenessState {
    pub fn new(report_timestamp_ms: i64, now_ms: i64, anchor: Instant) -> Self {
        Self {
            report_timestamp_ms,
            elapsed_baseline_ms: now_ms.saturating_sub(report_timestamp_ms),
            anchor,
        }
    }

    pub fn elapsed_ms(&self) -> i64 {
        let since_anchor = i64::try_from(self.anchor.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.elapsed_baseline_ms.saturating_add(since_anchor)
    }

    pub fn current(&self) -> Staleness {
        Staleness::from_elapsed(self.elapsed_ms())
    }
}
