// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! Anomalies
//!
//! Inconsistencies detected inside a single case file: timeline gaps,
//! conflicting evidence, witness discrepancies, and data-quality problems.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Anomaly value objects and detector sensitivity knobs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::case::CaseId;

/// Identifier for a detected anomaly.
///
/// Derived deterministically (UUID v5) from the case id and the rule tag,
/// so recomputing an unchanged case yields the same ids and verified
/// feedback can reference them without the core persisting anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnomalyId(pub Uuid);

impl AnomalyId {
    pub fn derive(case_id: &CaseId, tag: &str) -> Self {
        let name = format!("anomaly:{}:{}", case_id, tag);
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }
}

impl std::fmt::Display for AnomalyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of inconsistency found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    Inconsistency,
    TimelineGap,
    EvidenceConflict,
    WitnessDiscrepancy,
    DataQuality,
}

/// How strongly an anomaly should pull investigator attention
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// One detected inconsistency within a case file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    pub id: AnomalyId,
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub description: String,
    /// Labels of the case elements involved (evidence ids, field names)
    pub affected_elements: Vec<String>,
    pub suggested_investigation: Vec<String>,
}

/// Detector sensitivity and rule thresholds
#[derive(Debug, Clone)]
pub struct AnomalyConfig {
    /// In [0,1]; lower sensitivity reports only the most severe findings
    pub sensitivity: f64,

    /// Timeline gaps shorter than this many days are ignored
    pub min_gap_days: i64,

    /// Timeline gaps at or beyond this many days are treated as separate
    /// episodes rather than anomalies
    pub max_gap_days: i64,

    /// Narratives shorter than this are flagged as low-quality
    pub min_narrative_chars: usize,

    /// Cases with fewer evidence items than this are flagged
    pub min_evidence_items: usize,

    /// Fraction of undated evidence above which a flag is raised
    pub undated_ratio_threshold: f64,
}

impl AnomalyConfig {
    /// Lowest severity the configured sensitivity lets through
    pub fn severity_floor(&self) -> Severity {
        if self.sensitivity >= 0.7 {
            Severity::Low
        } else if self.sensitivity >= 0.4 {
            Severity::Medium
        } else if self.sensitivity >= 0.2 {
            Severity::High
        } else {
            Severity::Critical
        }
    }
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.7,
            min_gap_days: 30,
            max_gap_days: 365,
            min_narrative_chars: 50,
            min_evidence_items: 3,
            undated_ratio_threshold: 0.3,
        }
    }
}
