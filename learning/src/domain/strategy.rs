// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! Improvement Strategy
//!
//! The tunable knobs the self-improvement controller adjusts from
//! verified-outcome history, plus the rules it accumulates along the way.

use serde::{Deserialize, Serialize};

/// Current analysis tuning derived from learning history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementStrategy {
    /// Minimum confidence required before a finding is surfaced, [0,100].
    /// Wired into the pattern classifier's serial confidence floor.
    pub confidence_threshold: u8,

    /// Weight given to pattern-matching signals, [0,1].
    /// Wired into the similarity engine's narrative factor weight.
    pub pattern_matching_weight: f64,

    /// Anomaly detector sensitivity, [0,1]
    pub anomaly_sensitivity: f64,

    /// Areas the next analyses should concentrate on
    pub focus_areas: Vec<String>,

    /// Accumulated "Avoid: ..." rules learned from repeated mistakes
    pub learned_rules: Vec<String>,
}

impl Default for ImprovementStrategy {
    fn default() -> Self {
        Self {
            confidence_threshold: 60,
            pattern_matching_weight: 0.3,
            anomaly_sensitivity: 0.7,
            focus_areas: Vec::new(),
            learned_rules: Vec::new(),
        }
    }
}

/// Knobs for the improvement controller itself
#[derive(Debug, Clone)]
pub struct ImprovementConfig {
    /// Accuracy the controller steers towards, [0,100]
    pub target_accuracy: u8,

    /// Verified outcomes considered in the improvement trend
    pub trend_window: usize,
}

impl Default for ImprovementConfig {
    fn default() -> Self {
        Self { target_accuracy: 95, trend_window: 10 }
    }
}
