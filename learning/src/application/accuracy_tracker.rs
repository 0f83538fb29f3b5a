// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! # AccuracyTracker — Prediction vs Ground Truth
//!
//! Grades what the analysis engines predicted for a case against the
//! human-verified outcome, producing per-category accuracies, an overall
//! score, and confidence-calibration buckets (did the 70%+ hypotheses
//! actually turn out right 70% of the time?).
//!
//! Reports are stored in evaluation order so the host can plot the
//! accuracy trend.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use coldtrail_core::domain::{Anomaly, CaseId, CaseMatch, Hypothesis, Severity};

use crate::application::EventBus;
use crate::domain::{CaseOutcome, CategoryAccuracy, CategoryFeedback, LearningEvent};

/// What the analysis engines predicted for one case, frozen at analysis
/// time for later comparison against the verified outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    pub case_id: CaseId,
    /// Insight texts surfaced to the investigator
    pub insights: Vec<String>,
    pub hypotheses: Vec<Hypothesis>,
    pub anomalies: Vec<Anomaly>,
    pub matches: Vec<CaseMatch>,
}

/// Predicted vs actual accuracy for one confidence band
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationBucket {
    /// Rounded mean confidence of the hypotheses in the band, 0 if empty
    pub predicted: u8,
    /// Rounded fraction of band hypotheses verified correct, 0 if empty
    pub actual: u8,
}

/// Calibration across the three confidence bands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceCalibration {
    /// Hypotheses with confidence >= 70
    pub high: CalibrationBucket,
    /// Hypotheses with confidence in 50..=69
    pub medium: CalibrationBucket,
    /// Hypotheses with confidence < 50
    pub low: CalibrationBucket,
}

/// One graded comparison of a snapshot against its outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub id: Uuid,
    pub case_id: CaseId,
    /// Weighted overall accuracy in [0,100]
    pub overall_accuracy: u8,
    pub component_accuracy: CategoryAccuracy,
    pub calibration: ConfidenceCalibration,
    pub evaluated_at: DateTime<Utc>,
}

/// Grades analysis snapshots against verified outcomes
pub struct AccuracyTracker {
    reports: RwLock<Vec<AccuracyReport>>,
    event_bus: Arc<dyn EventBus>,
}

impl AccuracyTracker {
    pub fn new(event_bus: Arc<dyn EventBus>) -> Self {
        Self { reports: RwLock::new(Vec::new()), event_bus }
    }

    /// Grade one snapshot against its verified outcome, store the report,
    /// and publish an `AccuracyEvaluated` event.
    pub async fn evaluate(
        &self,
        snapshot: &AnalysisSnapshot,
        outcome: &CaseOutcome,
    ) -> Result<AccuracyReport> {
        let insights = insight_accuracy(&snapshot.insights, &outcome.insights);
        let hypotheses = hypothesis_accuracy(&snapshot.hypotheses, &outcome.hypotheses);
        let anomalies = anomaly_accuracy(&snapshot.anomalies, &outcome.anomalies);
        let patterns = pattern_accuracy(&snapshot.matches);

        let overall_accuracy = (insights as f64 * 0.25
            + hypotheses as f64 * 0.3
            + anomalies as f64 * 0.25
            + patterns as f64 * 0.2)
            .round() as u8;

        let report = AccuracyReport {
            id: Uuid::new_v4(),
            case_id: snapshot.case_id.clone(),
            overall_accuracy,
            component_accuracy: CategoryAccuracy { insights, hypotheses, anomalies, patterns },
            calibration: calibration(&snapshot.hypotheses, outcome),
            evaluated_at: Utc::now(),
        };

        info!(
            case_id = %report.case_id,
            overall_accuracy = report.overall_accuracy,
            "Evaluated analysis accuracy"
        );
        self.reports.write().await.push(report.clone());
        self.event_bus
            .publish(LearningEvent::AccuracyEvaluated {
                case_id: report.case_id.clone(),
                overall_accuracy: report.overall_accuracy,
                timestamp: Utc::now(),
            })
            .await?;

        Ok(report)
    }

    /// Rounded mean overall accuracy over stored reports, 0 when none
    pub async fn average_accuracy(&self) -> u8 {
        let reports = self.reports.read().await;
        if reports.is_empty() {
            return 0;
        }
        let sum: u32 = reports.iter().map(|r| r.overall_accuracy as u32).sum();
        (sum as f64 / reports.len() as f64).round() as u8
    }

    /// Overall accuracies in evaluation order
    pub async fn accuracy_trend(&self) -> Vec<u8> {
        self.reports.read().await.iter().map(|r| r.overall_accuracy).collect()
    }

    pub async fn reports(&self) -> Vec<AccuracyReport> {
        self.reports.read().await.clone()
    }
}

/// Empty predictions score 0; predictions without feedback score the
/// neutral 50; otherwise the verified correct ratio.
fn insight_accuracy(insights: &[String], feedback: &CategoryFeedback) -> u8 {
    if insights.is_empty() {
        return 0;
    }
    let total = feedback.total();
    if total == 0 {
        return 50;
    }
    ((feedback.correct.len() as f64 / total as f64) * 100.0).round() as u8
}

/// Without feedback, estimate conservatively from the hypotheses' own
/// confidence (mean x 0.8).
fn hypothesis_accuracy(hypotheses: &[Hypothesis], feedback: &CategoryFeedback) -> u8 {
    if hypotheses.is_empty() {
        return 0;
    }
    let total = feedback.total();
    if total == 0 {
        let mean = hypotheses.iter().map(|h| h.confidence as f64).sum::<f64>()
            / hypotheses.len() as f64;
        return (mean * 0.8).round() as u8;
    }
    ((feedback.correct.len() as f64 / total as f64) * 100.0).round() as u8
}

/// Without feedback, estimate from severity: higher-severity anomalies
/// are more likely to be real.
fn anomaly_accuracy(anomalies: &[Anomaly], feedback: &CategoryFeedback) -> u8 {
    if anomalies.is_empty() {
        return 0;
    }
    let total = feedback.total();
    if total == 0 {
        let severe = anomalies
            .iter()
            .filter(|a| a.severity >= Severity::High)
            .count();
        return (60.0 + (severe as f64 / anomalies.len() as f64) * 30.0).round() as u8;
    }
    ((feedback.correct.len() as f64 / total as f64) * 100.0).round() as u8
}

/// Estimate pattern accuracy from match strength: high-confidence matches
/// (composite >= 0.7) count 0.8, medium (0.5..0.7) count 0.6.
fn pattern_accuracy(matches: &[CaseMatch]) -> u8 {
    if matches.is_empty() {
        return 0;
    }
    let high = matches.iter().filter(|m| m.score.composite >= 0.7).count();
    let medium = matches
        .iter()
        .filter(|m| m.score.composite >= 0.5 && m.score.composite < 0.7)
        .count();
    let estimated_correct = (high as f64 * 0.8 + medium as f64 * 0.6).round();
    ((estimated_correct / matches.len() as f64) * 100.0).round() as u8
}

fn calibration(hypotheses: &[Hypothesis], outcome: &CaseOutcome) -> ConfidenceCalibration {
    let high: Vec<&Hypothesis> = hypotheses.iter().filter(|h| h.confidence >= 70).collect();
    let medium: Vec<&Hypothesis> =
        hypotheses.iter().filter(|h| h.confidence >= 50 && h.confidence < 70).collect();
    let low: Vec<&Hypothesis> = hypotheses.iter().filter(|h| h.confidence < 50).collect();

    ConfidenceCalibration {
        high: bucket(&high, outcome),
        medium: bucket(&medium, outcome),
        low: bucket(&low, outcome),
    }
}

fn bucket(hypotheses: &[&Hypothesis], outcome: &CaseOutcome) -> CalibrationBucket {
    if hypotheses.is_empty() {
        return CalibrationBucket::default();
    }
    let predicted = (hypotheses.iter().map(|h| h.confidence as f64).sum::<f64>()
        / hypotheses.len() as f64)
        .round() as u8;
    let correct = hypotheses
        .iter()
        .filter(|h| outcome.hypotheses.correct.contains(&h.id.to_string()))
        .count();
    let actual = ((correct as f64 / hypotheses.len() as f64) * 100.0).round() as u8;
    CalibrationBucket { predicted, actual }
}
