// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! Cross-Case Patterns
//!
//! Higher-order relationships derived from similarity scores. Pattern
//! kinds are a closed enumeration; the classifier is the only producer.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pattern insights, risk levels, and classifier knobs

use serde::{Deserialize, Serialize};

use crate::domain::case::CaseId;

/// The closed set of pattern kinds the classifier can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    SerialOffender,
    GeographicCluster,
    TemporalSeries,
    EvidenceChain,
    SuspectLink,
}

/// Investigative risk attached to a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// A named relationship across multiple cases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternInsight {
    pub kind: PatternKind,
    pub name: String,
    pub description: String,
    /// Integer confidence in [0,100]
    pub confidence: u8,
    pub risk: RiskLevel,
    /// Cases involved, target first
    pub case_ids: Vec<CaseId>,
    pub indicators: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Full classifier output for one target case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternReport {
    /// Patterns sorted by confidence descending (stable)
    pub patterns: Vec<PatternInsight>,
    /// Aggregate likelihood of a single actor, [0,100]
    pub serial_offender_probability: u8,
    /// Ordered investigative recommendations across all patterns
    pub recommendations: Vec<String>,
}

impl PatternReport {
    pub fn pattern_of_kind(&self, kind: PatternKind) -> Option<&PatternInsight> {
        self.patterns.iter().find(|p| p.kind == kind)
    }
}

/// Thresholds gating the serial-offender rule
#[derive(Debug, Clone)]
pub struct PatternConfig {
    /// Minimum composite similarity for a serial candidate
    pub serial_similarity_threshold: f64,

    /// Minimum temporal proximity for a serial candidate
    pub serial_temporal_threshold: f64,

    /// Minimum geographic proximity for a serial candidate
    pub serial_geographic_threshold: f64,

    /// Both target and candidate need at least this much evidence
    pub serial_min_evidence: usize,

    /// Serial patterns below this confidence are rejected
    pub serial_confidence_floor: u8,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            serial_similarity_threshold: 0.6,
            serial_temporal_threshold: 0.5,
            serial_geographic_threshold: 0.4,
            serial_min_evidence: 3,
            serial_confidence_floor: 60,
        }
    }
}
