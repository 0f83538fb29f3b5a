// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! # FeedbackService — Outcome Intake & Learning Metrics
//!
//! Validates and stores human-verified case outcomes, then aggregates
//! them into [`LearningMetrics`]: average accuracy, per-category
//! accuracy, the improvement trend, and recurring mistake buckets.
//!
//! Metrics are a pure function of the stored outcome set: recomputing
//! over an unchanged set yields identical metrics.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use metrics::counter;
use tracing::{debug, info};

use coldtrail_core::domain::CaseId;

use crate::application::EventBus;
use crate::domain::{
    CaseOutcome, CategoryAccuracy, CategoryFeedback, CommonMistake, LearningEvent, LearningMetrics,
};
use crate::infrastructure::OutcomeStore;

/// Verified outcomes considered in the improvement trend
const TREND_WINDOW: usize = 10;

/// Top mistake buckets reported in metrics
const MAX_COMMON_MISTAKES: usize = 5;

/// Intake and aggregation over verified case outcomes
pub struct FeedbackService {
    store: Arc<dyn OutcomeStore>,
    event_bus: Arc<dyn EventBus>,
}

impl FeedbackService {
    pub fn new(store: Arc<dyn OutcomeStore>, event_bus: Arc<dyn EventBus>) -> Self {
        Self { store, event_bus }
    }

    /// Validate and store an outcome. Malformed submissions are rejected
    /// synchronously with a typed [`FeedbackError`] and nothing is
    /// recorded.
    ///
    /// [`FeedbackError`]: crate::domain::FeedbackError
    pub async fn record_outcome(&self, outcome: CaseOutcome) -> Result<()> {
        outcome.validate()?;

        info!(
            case_id = %outcome.case_id,
            verified = outcome.verified,
            accuracy = outcome.accuracy,
            "Recording case outcome"
        );
        counter!("coldtrail_outcomes_recorded_total").increment(1);

        let event = LearningEvent::OutcomeRecorded {
            case_id: outcome.case_id.clone(),
            verified: outcome.verified,
            accuracy: outcome.accuracy,
            timestamp: Utc::now(),
        };
        self.store.record(outcome).await?;
        self.event_bus.publish(event).await?;
        Ok(())
    }

    pub async fn outcome(&self, case_id: &CaseId) -> Result<Option<CaseOutcome>> {
        self.store.get(case_id).await
    }

    /// Aggregate learning metrics over the stored outcome set
    pub async fn metrics(&self) -> Result<LearningMetrics> {
        let outcomes = self.store.all().await?;
        let verified: Vec<&CaseOutcome> = outcomes.iter().filter(|o| o.verified).collect();

        let metrics = if verified.is_empty() {
            LearningMetrics {
                total_cases: outcomes.len(),
                verified_cases: 0,
                average_accuracy: 0,
                accuracy_by_category: CategoryAccuracy::default(),
                improvement_trend: Vec::new(),
                common_mistakes: Vec::new(),
            }
        } else {
            let sum: u32 = verified.iter().map(|o| o.accuracy as u32).sum();
            let average_accuracy = (sum as f64 / verified.len() as f64).round() as u8;

            let trend_start = verified.len().saturating_sub(TREND_WINDOW);
            let improvement_trend = verified[trend_start..].iter().map(|o| o.accuracy).collect();

            LearningMetrics {
                total_cases: outcomes.len(),
                verified_cases: verified.len(),
                average_accuracy,
                accuracy_by_category: CategoryAccuracy {
                    insights: category_accuracy(verified.iter().map(|o| &o.insights)),
                    hypotheses: category_accuracy(verified.iter().map(|o| &o.hypotheses)),
                    anomalies: category_accuracy(verified.iter().map(|o| &o.anomalies)),
                    patterns: pattern_accuracy(&verified),
                },
                improvement_trend,
                common_mistakes: common_mistakes(&verified),
            }
        };

        debug!(
            total_cases = metrics.total_cases,
            verified_cases = metrics.verified_cases,
            average_accuracy = metrics.average_accuracy,
            "Computed learning metrics"
        );
        self.event_bus
            .publish(LearningEvent::MetricsComputed {
                total_cases: metrics.total_cases,
                verified_cases: metrics.verified_cases,
                average_accuracy: metrics.average_accuracy,
                timestamp: Utc::now(),
            })
            .await?;

        Ok(metrics)
    }

    /// Render a learning summary prompt for generation-backed insights
    pub fn learning_prompt(&self, metrics: &LearningMetrics) -> String {
        let mistakes = metrics
            .common_mistakes
            .iter()
            .map(|m| format!("- {}: {} occurrences", m.description, m.count))
            .collect::<Vec<_>>()
            .join("\n");
        let trend = metrics
            .improvement_trend
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join("%, ");

        format!(
            "You are an AI detective learning from past cases. Here's your performance:\n\n\
             Overall Accuracy: {}%\n\
             Insight Accuracy: {}%\n\
             Hypothesis Accuracy: {}%\n\
             Anomaly Accuracy: {}%\n\n\
             Common Mistakes:\n{}\n\n\
             Recent Accuracy Trend: {}%\n\n\
             Based on this feedback, adjust your analysis approach to improve accuracy. Focus on:\n\
             1. Avoiding the common mistakes identified\n\
             2. Being more conservative with low-confidence findings\n\
             3. Cross-referencing patterns more carefully\n\
             4. Validating anomalies before flagging them",
            metrics.average_accuracy,
            metrics.accuracy_by_category.insights,
            metrics.accuracy_by_category.hypotheses,
            metrics.accuracy_by_category.anomalies,
            mistakes,
            trend,
        )
    }
}

/// Σcorrect / (Σcorrect + Σincorrect) as a rounded percentage, 50 when the
/// category has no feedback at all.
fn category_accuracy<'a>(feedback: impl Iterator<Item = &'a CategoryFeedback>) -> u8 {
    let mut correct = 0usize;
    let mut total = 0usize;
    for item in feedback {
        correct += item.correct.len();
        total += item.total();
    }
    if total == 0 {
        50
    } else {
        ((correct as f64 / total as f64) * 100.0).round() as u8
    }
}

/// Σcorrect / Σtotal over accumulated pattern feedback, 50 when none exists
fn pattern_accuracy(verified: &[&CaseOutcome]) -> u8 {
    let mut correct = 0u32;
    let mut total = 0u32;
    for outcome in verified {
        if let Some(feedback) = outcome.pattern_feedback {
            correct += feedback.correct;
            total += feedback.total;
        }
    }
    if total == 0 {
        50
    } else {
        ((correct as f64 / total as f64) * 100.0).round() as u8
    }
}

/// Bucket an incorrect insight by its wording
fn categorize_mistake(insight: &str) -> &'static str {
    let lower = insight.to_lowercase();
    if lower.contains("pattern") || lower.contains("similar") {
        "Pattern Matching Error"
    } else if lower.contains("timeline") || lower.contains("date") {
        "Timeline Error"
    } else if lower.contains("evidence") || lower.contains("forensic") {
        "Evidence Interpretation Error"
    } else if lower.contains("witness") || lower.contains("statement") {
        "Witness Analysis Error"
    } else {
        "General Analysis Error"
    }
}

/// Top mistake buckets: incorrect insights by keyword category plus one
/// bucket per incorrect hypothesis, count descending, ties broken by
/// category name.
fn common_mistakes(verified: &[&CaseOutcome]) -> Vec<CommonMistake> {
    let mut counts: HashMap<&'static str, u32> = HashMap::new();
    for outcome in verified {
        for insight in &outcome.insights.incorrect {
            *counts.entry(categorize_mistake(insight)).or_insert(0) += 1;
        }
        for _ in &outcome.hypotheses.incorrect {
            *counts.entry("Incorrect Hypothesis").or_insert(0) += 1;
        }
    }

    let mut mistakes: Vec<CommonMistake> = counts
        .into_iter()
        .map(|(category, count)| CommonMistake {
            category: category.to_string(),
            description: category.to_string(),
            count,
        })
        .collect();
    mistakes.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    mistakes.truncate(MAX_COMMON_MISTAKES);
    mistakes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeedbackError, PatternFeedback};
    use crate::infrastructure::InMemoryOutcomeStore;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    struct MockEventBus {
        events: Mutex<Vec<LearningEvent>>,
    }

    impl MockEventBus {
        fn new() -> Self {
            Self { events: Mutex::new(Vec::new()) }
        }

        async fn event_types(&self) -> Vec<&'static str> {
            self.events.lock().await.iter().map(|e| e.event_type()).collect()
        }
    }

    #[async_trait]
    impl EventBus for MockEventBus {
        async fn publish(&self, event: LearningEvent) -> Result<()> {
            self.events.lock().await.push(event);
            Ok(())
        }
    }

    fn outcome(case_id: &str, accuracy: u8) -> CaseOutcome {
        CaseOutcome {
            case_id: CaseId::new(case_id),
            verified: true,
            accuracy,
            insights: CategoryFeedback::default(),
            hypotheses: CategoryFeedback::default(),
            anomalies: CategoryFeedback::default(),
            pattern_feedback: None,
            actual_outcome: None,
            notes: None,
            verified_at: Utc::now(),
        }
    }

    fn service() -> (FeedbackService, Arc<MockEventBus>) {
        let bus = Arc::new(MockEventBus::new());
        let service = FeedbackService::new(
            Arc::new(InMemoryOutcomeStore::new()),
            Arc::clone(&bus) as Arc<dyn EventBus>,
        );
        (service, bus)
    }

    #[tokio::test]
    async fn test_invalid_outcome_is_rejected_and_not_stored() {
        let (service, bus) = service();
        let mut invalid = outcome("case-1", 80);
        invalid.insights.correct.push("a".to_string());
        invalid.insights.incorrect.push("a".to_string());

        let err = service.record_outcome(invalid).await.unwrap_err();
        assert!(err.downcast_ref::<FeedbackError>().is_some());
        assert!(service.outcome(&CaseId::new("case-1")).await.unwrap().is_none());
        assert!(bus.event_types().await.is_empty());
    }

    #[tokio::test]
    async fn test_recorded_outcome_publishes_event() {
        let (service, bus) = service();
        service.record_outcome(outcome("case-1", 80)).await.unwrap();

        assert!(service.outcome(&CaseId::new("case-1")).await.unwrap().is_some());
        assert_eq!(bus.event_types().await, vec!["outcome_recorded"]);
    }

    #[tokio::test]
    async fn test_metrics_with_no_outcomes() {
        let (service, _) = service();
        let metrics = service.metrics().await.unwrap();

        assert_eq!(metrics.total_cases, 0);
        assert_eq!(metrics.verified_cases, 0);
        assert_eq!(metrics.average_accuracy, 0);
        assert_eq!(metrics.accuracy_by_category, CategoryAccuracy::default());
        assert!(metrics.improvement_trend.is_empty());
        assert!(metrics.common_mistakes.is_empty());
    }

    #[tokio::test]
    async fn test_insight_accuracy_accumulates_across_outcomes() {
        // One prior outcome with 1 correct / 1 incorrect insight, then a
        // new outcome with 2 correct / 1 incorrect: 3 of 5 correct.
        let (service, _) = service();

        let mut first = outcome("case-1", 70);
        first.insights.correct.push("x".to_string());
        first.insights.incorrect.push("y".to_string());
        service.record_outcome(first).await.unwrap();

        let mut second = outcome("case-2", 80);
        second.insights.correct = vec!["a".to_string(), "b".to_string()];
        second.insights.incorrect = vec!["c".to_string()];
        service.record_outcome(second).await.unwrap();

        let metrics = service.metrics().await.unwrap();
        assert_eq!(metrics.accuracy_by_category.insights, 60);
        // No hypothesis or anomaly feedback yet: unknown, not zero.
        assert_eq!(metrics.accuracy_by_category.hypotheses, 50);
        assert_eq!(metrics.accuracy_by_category.anomalies, 50);
    }

    #[tokio::test]
    async fn test_pattern_accuracy_from_accumulated_feedback() {
        let (service, _) = service();

        let mut first = outcome("case-1", 70);
        first.pattern_feedback = Some(PatternFeedback { correct: 2, total: 2 });
        service.record_outcome(first).await.unwrap();

        let mut second = outcome("case-2", 80);
        second.pattern_feedback = Some(PatternFeedback { correct: 1, total: 2 });
        service.record_outcome(second).await.unwrap();

        let metrics = service.metrics().await.unwrap();
        assert_eq!(metrics.accuracy_by_category.patterns, 75);
    }

    #[tokio::test]
    async fn test_metrics_are_idempotent_over_unchanged_outcomes() {
        let (service, _) = service();
        service.record_outcome(outcome("case-1", 70)).await.unwrap();
        service.record_outcome(outcome("case-2", 90)).await.unwrap();

        let first = service.metrics().await.unwrap();
        let second = service.metrics().await.unwrap();

        assert_eq!(first.average_accuracy, second.average_accuracy);
        assert_eq!(first.improvement_trend, second.improvement_trend);
        assert_eq!(first.common_mistakes, second.common_mistakes);
    }

    #[tokio::test]
    async fn test_trend_keeps_last_ten_in_submission_order() {
        let (service, _) = service();
        for i in 0..12u8 {
            service.record_outcome(outcome(&format!("case-{i}"), 50 + i)).await.unwrap();
        }

        let metrics = service.metrics().await.unwrap();
        assert_eq!(metrics.improvement_trend.len(), 10);
        assert_eq!(metrics.improvement_trend[0], 52);
        assert_eq!(metrics.improvement_trend[9], 61);
    }

    #[tokio::test]
    async fn test_unverified_outcomes_count_only_toward_totals() {
        let (service, _) = service();
        let mut unverified = outcome("case-1", 90);
        unverified.verified = false;
        service.record_outcome(unverified).await.unwrap();
        service.record_outcome(outcome("case-2", 80)).await.unwrap();

        let metrics = service.metrics().await.unwrap();
        assert_eq!(metrics.total_cases, 2);
        assert_eq!(metrics.verified_cases, 1);
        assert_eq!(metrics.average_accuracy, 80);
    }

    #[tokio::test]
    async fn test_common_mistakes_bucket_and_rank() {
        let (service, _) = service();

        let mut first = outcome("case-1", 60);
        first.insights.incorrect = vec![
            "Misread the timeline of events".to_string(),
            "Wrong date attribution".to_string(),
            "Pattern linkage was spurious".to_string(),
        ];
        first.hypotheses.incorrect = vec!["h-1".to_string()];
        service.record_outcome(first).await.unwrap();

        let mut second = outcome("case-2", 70);
        second.insights.incorrect = vec!["Another date mixup".to_string()];
        service.record_outcome(second).await.unwrap();

        let metrics = service.metrics().await.unwrap();
        assert_eq!(metrics.common_mistakes[0].category, "Timeline Error");
        assert_eq!(metrics.common_mistakes[0].count, 3);
        // Ties (1 each) break alphabetically by category name.
        assert_eq!(metrics.common_mistakes[1].category, "Incorrect Hypothesis");
        assert_eq!(metrics.common_mistakes[2].category, "Pattern Matching Error");
    }

    #[tokio::test]
    async fn test_learning_prompt_embeds_metrics() {
        let (service, _) = service();
        let metrics = LearningMetrics {
            total_cases: 3,
            verified_cases: 3,
            average_accuracy: 72,
            accuracy_by_category: CategoryAccuracy {
                insights: 60,
                hypotheses: 75,
                anomalies: 50,
                patterns: 80,
            },
            improvement_trend: vec![65, 70, 81],
            common_mistakes: vec![CommonMistake {
                category: "Timeline Error".to_string(),
                description: "Timeline Error".to_string(),
                count: 3,
            }],
        };

        let prompt = service.learning_prompt(&metrics);
        assert!(prompt.contains("Overall Accuracy: 72%"));
        assert!(prompt.contains("- Timeline Error: 3 occurrences"));
        assert!(prompt.contains("65%, 70%, 81%"));
    }
}
