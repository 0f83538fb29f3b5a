// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! Learning Metrics
//!
//! Aggregated accuracy statistics over verified case outcomes.

use serde::{Deserialize, Serialize};

/// Accuracy percentage per analysis category. 50 means "no feedback yet"
/// rather than "half wrong": the category defaults to unknown until an
/// outcome actually grades it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAccuracy {
    pub insights: u8,
    pub hypotheses: u8,
    pub anomalies: u8,
    pub patterns: u8,
}

impl Default for CategoryAccuracy {
    fn default() -> Self {
        Self { insights: 50, hypotheses: 50, anomalies: 50, patterns: 50 }
    }
}

/// One recurring error category across verified outcomes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonMistake {
    pub category: String,
    pub description: String,
    pub count: u32,
}

/// Aggregate statistics over all recorded outcomes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearningMetrics {
    pub total_cases: usize,
    pub verified_cases: usize,
    /// Rounded mean accuracy over verified outcomes, 0 when none exist
    pub average_accuracy: u8,
    pub accuracy_by_category: CategoryAccuracy,
    /// Last 10 or fewer verified accuracies in submission order
    pub improvement_trend: Vec<u8>,
    /// Top 5 mistake buckets, count descending, ties by category name
    pub common_mistakes: Vec<CommonMistake>,
}
