// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! Similarity Scores
//!
//! Value objects produced by the similarity engine: per-factor breakdowns,
//! composite scores, and ranked case matches.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pairwise similarity results and tuning knobs

use serde::{Deserialize, Serialize};

use crate::domain::case::CaseId;

/// Per-factor similarity values in [0,1].
///
/// `None` means the factor was skipped because one of the two cases lacks
/// the data for it. Skipped factors do not drag the composite down, so
/// incomplete records are not unfairly penalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorBreakdown {
    pub narrative: Option<f64>,
    pub evidence: Option<f64>,
    pub keyword: Option<f64>,
    pub jurisdiction: Option<f64>,
    pub temporal: Option<f64>,
}

impl FactorBreakdown {
    /// Number of factors that were applicable for this pair
    pub fn applicable_count(&self) -> usize {
        [
            self.narrative,
            self.evidence,
            self.keyword,
            self.jurisdiction,
            self.temporal,
        ]
        .iter()
        .filter(|f| f.is_some())
        .count()
    }
}

/// Composite similarity between two cases plus its factor breakdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScore {
    /// Weighted average over applicable factors, in [0,1]
    pub composite: f64,
    pub factors: FactorBreakdown,
}

/// One corpus case matched against a target, with human-readable labels
/// describing which factors drove the match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseMatch {
    pub case_id: CaseId,
    pub title: String,
    pub score: SimilarityScore,
    pub matching_factors: Vec<String>,
}

/// Tuning knobs for the similarity engine
#[derive(Debug, Clone)]
pub struct SimilarityConfig {
    pub narrative_weight: f64,
    pub evidence_weight: f64,
    pub keyword_weight: f64,
    pub jurisdiction_weight: f64,
    pub temporal_weight: f64,

    /// Matches scoring below this composite are dropped
    pub min_similarity: f64,

    /// Upper bound on the returned match list
    pub max_matches: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            narrative_weight: 0.30,
            evidence_weight: 0.25,
            keyword_weight: 0.25,
            jurisdiction_weight: 0.20,
            temporal_weight: 0.15,
            min_similarity: 0.35,
            max_matches: 10,
        }
    }
}
