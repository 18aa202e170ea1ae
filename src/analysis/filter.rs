//! Filter engine applied to a categorized report before display.
//!
//! A `FilterSet` has three dimensions: categories (topics), rule names and a
//! score range. An empty dimension is inactive. Dimensions are AND-ed, the
//! values selected inside one dimension are OR-ed. The per-target and global
//! sets must both accept an evaluation for it to be kept.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::{RuleEvaluation, MAX_SCORE, ORANGE_SCORE_THRESHOLD};

use super::categorize::CategorizedReport;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

impl ScoreRange {
    pub fn new(min: f64, max: f64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Warning and critical scores only.
    pub fn critical() -> Self {
        Self::new(ORANGE_SCORE_THRESHOLD, MAX_SCORE)
    }

    pub fn contains(&self, score: f64) -> bool {
        score >= self.min && score <= self.max
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSet {
    pub categories: BTreeSet<String>,
    pub rule_names: BTreeSet<String>,
    pub score_range: Option<ScoreRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "op", content = "value")]
pub enum FilterDelta {
    AddCategory(String),
    RemoveCategory(String),
    AddRuleName(String),
    RemoveRuleName(String),
    SetScoreRange(Option<ScoreRange>),
}

impl FilterSet {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.rule_names.is_empty() && self.score_range.is_none()
    }

    pub fn apply(&mut self, delta: FilterDelta) {
        match delta {
            FilterDelta::AddCategory(topic) => {
                self.categories.insert(topic);
            }
            FilterDelta::RemoveCategory(topic) => {
                self.categories.remove(&topic);
            }
            FilterDelta::AddRuleName(name) => {
                self.rule_names.insert(name);
            }
            FilterDelta::RemoveRuleName(name) => {
                self.rule_names.remove(&name);
            }
            FilterDelta::SetScoreRange(range) => {
                self.score_range = range;
            }
        }
    }

    pub fn accepts_topic(&self, topic: &str) -> bool {
        self.categories.is_empty() || self.categories.contains(topic)
    }

    /// Not-applicable scores skip the range check; whether they are shown at
    /// all is decided by the caller's toggle.
    pub fn accepts(&self, evaluation: &RuleEvaluation) -> bool {
        if !self.accepts_topic(&evaluation.topic) {
            return false;
        }
        if !self.rule_names.is_empty() && !self.rule_names.contains(&evaluation.name) {
            return false;
        }
        match self.score_range {
            Some(range) if evaluation.is_applicable() => range.contains(evaluation.score),
            _ => true,
        }
    }
}

pub fn filter_report(
    report: &CategorizedReport,
    target_filters: &FilterSet,
    global_filters: &FilterSet,
    show_na: bool,
) -> CategorizedReport {
    let topics: BTreeMap<String, Vec<RuleEvaluation>> = report
        .topics()
        .filter(|(topic, _)| {
            target_filters.accepts_topic(topic) && global_filters.accepts_topic(topic)
        })
        .map(|(topic, evaluations)| {
            let kept = evaluations
                .iter()
                .filter(|evaluation| show_na || evaluation.is_applicable())
                .filter(|evaluation| {
                    target_filters.accepts(evaluation) && global_filters.accepts(evaluation)
                })
                .cloned()
                .collect();
            (topic.to_string(), kept)
        })
        .collect();

    CategorizedReport::from_topics(topics)
}
