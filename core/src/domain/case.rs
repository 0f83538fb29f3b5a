// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! Case Records
//!
//! Read-only input model for the analysis engine. Case and evidence data
//! are owned by the host's case store; this core only consumes them.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Case and evidence value objects shared by every engine

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier for a case, as issued by the host case store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaseId(pub String);

impl CaseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for an evidence item within a case
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvidenceId(pub String);

impl EvidenceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EvidenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Investigative priority assigned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// Kind of evidence attached to a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceCategory {
    Document,
    Image,
    Audio,
    Video,
    Physical,
    WitnessStatement,
    Forensic,
    Other,
}

impl EvidenceCategory {
    /// Human-readable label used in indicators and prompt context
    pub fn label(&self) -> &'static str {
        match self {
            EvidenceCategory::Document => "document",
            EvidenceCategory::Image => "image",
            EvidenceCategory::Audio => "audio",
            EvidenceCategory::Video => "video",
            EvidenceCategory::Physical => "physical",
            EvidenceCategory::WitnessStatement => "witness_statement",
            EvidenceCategory::Forensic => "forensic",
            EvidenceCategory::Other => "other",
        }
    }
}

impl std::fmt::Display for EvidenceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A typed, described piece of evidence attached to a case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub id: EvidenceId,
    pub category: EvidenceCategory,
    pub description: String,
    pub date: Option<NaiveDate>,
    /// Collection confidence in [0,100], when the host records one
    pub confidence: Option<u8>,
}

/// One investigative case as supplied by the host case store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: CaseId,
    pub title: String,
    pub narrative: String,
    pub date: Option<NaiveDate>,
    pub jurisdiction: Option<String>,
    pub priority: Priority,
    pub evidence: Vec<EvidenceItem>,
}

impl CaseRecord {
    /// Narrative plus every evidence description, lower-cased.
    /// Keyword factors and matching labels search this combined text.
    pub fn combined_text(&self) -> String {
        let mut text = self.narrative.clone();
        for item in &self.evidence {
            text.push(' ');
            text.push_str(&item.description);
        }
        text.to_lowercase()
    }

    /// Distinct evidence categories in first-seen order
    pub fn evidence_categories(&self) -> Vec<EvidenceCategory> {
        let mut categories = Vec::new();
        for item in &self.evidence {
            if !categories.contains(&item.category) {
                categories.push(item.category);
            }
        }
        categories
    }

    /// Evidence items that carry a date, sorted ascending
    pub fn dated_evidence(&self) -> Vec<&EvidenceItem> {
        let mut dated: Vec<&EvidenceItem> =
            self.evidence.iter().filter(|e| e.date.is_some()).collect();
        dated.sort_by_key(|e| e.date);
        dated
    }
}
