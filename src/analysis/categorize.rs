use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{AnalysisReport, RuleEvaluation};

/// Evaluations grouped by topic. Topics iterate in lexicographic order and
/// each bucket is sorted by descending score, then ascending rule name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorizedReport {
    topics: BTreeMap<String, Vec<RuleEvaluation>>,
}

impl CategorizedReport {
    pub(crate) fn from_topics(topics: BTreeMap<String, Vec<RuleEvaluation>>) -> Self {
        Self { topics }
    }

    pub fn topics(&self) -> impl Iterator<Item = (&str, &[RuleEvaluation])> {
        self.topics
            .iter()
            .map(|(topic, evaluations)| (topic.as_str(), evaluations.as_slice()))
    }

    /// Topics worth rendering: buckets left empty by filtering are skipped.
    pub fn non_empty_topics(&self) -> impl Iterator<Item = (&str, &[RuleEvaluation])> {
        self.topics()
            .filter(|(_, evaluations)| !evaluations.is_empty())
    }

    pub fn get(&self, topic: &str) -> Option<&[RuleEvaluation]> {
        self.topics.get(topic).map(Vec::as_slice)
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    pub fn evaluation_count(&self) -> usize {
        self.topics.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluation_count() == 0
    }

    pub fn flatten(&self) -> AnalysisReport {
        self.topics.values().flatten().cloned().collect()
    }
}

pub(crate) fn compare_evaluations(a: &RuleEvaluation, b: &RuleEvaluation) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.name.cmp(&b.name))
}

pub fn categorize(report: &[RuleEvaluation]) -> CategorizedReport {
    let mut topics: BTreeMap<String, Vec<RuleEvaluation>> = BTreeMap::new();
    for evaluation in report {
        topics
            .entry(evaluation.topic.clone())
            .or_default()
            .push(evaluation.clone());
    }
    for evaluations in topics.values_mut() {
        evaluations.sort_by(compare_evaluations);
    }
    CategorizedReport::from_topics(topics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NA_SCORE;

    fn sample_report() -> AnalysisReport {
        vec![
            RuleEvaluation::new("gc", "Heap Usage", 20.0),
            RuleEvaluation::new("io", "File Read", 80.0),
            RuleEvaluation::new("gc", "GC Pauses", 75.0),
            RuleEvaluation::new("gc", "Allocation Rate", 20.0),
            RuleEvaluation::new("threads", "Deadlocks", NA_SCORE),
            RuleEvaluation::new("io", "Socket Write", 80.0),
        ]
    }

    #[test]
    fn groups_every_evaluation_exactly_once() {
        let report = sample_report();
        let categorized = categorize(&report);

        assert_eq!(categorized.topic_count(), 3);
        assert_eq!(categorized.evaluation_count(), report.len());

        let mut original: Vec<_> = report.iter().map(|e| (&e.topic, &e.name)).collect();
        let flattened = categorized.flatten();
        let mut regrouped: Vec<_> = flattened.iter().map(|e| (&e.topic, &e.name)).collect();
        original.sort();
        regrouped.sort();
        assert_eq!(original, regrouped);

        for (topic, evaluations) in categorized.topics() {
            assert!(evaluations.iter().all(|e| e.topic == topic));
        }
    }

    #[test]
    fn buckets_sort_by_score_then_name() {
        let categorized = categorize(&sample_report());
        let gc: Vec<_> = categorized
            .get("gc")
            .unwrap()
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(gc, vec!["GC Pauses", "Allocation Rate", "Heap Usage"]);

        let io: Vec<_> = categorized
            .get("io")
            .unwrap()
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(io, vec!["File Read", "Socket Write"]);
    }

    #[test]
    fn topics_iterate_in_sorted_order() {
        let categorized = categorize(&sample_report());
        let topics: Vec<_> = categorized.topics().map(|(topic, _)| topic).collect();
        assert_eq!(topics, vec!["gc", "io", "threads"]);
    }

    #[test]
    fn categorize_is_idempotent_over_flatten() {
        let once = categorize(&sample_report());
        let twice = categorize(&once.flatten());
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_report_has_no_topics() {
        let categorized = categorize(&[]);
        assert!(categorized.is_empty());
        assert_eq!(categorized.topic_count(), 0);
    }
}
