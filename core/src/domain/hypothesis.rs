// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! Hypotheses
//!
//! Investigative leads generated from case content and match lists.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Hypothesis value objects

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::case::CaseId;

/// Identifier for a generated hypothesis.
///
/// Derived deterministically (UUID v5) from the case id and the rule tag
/// so verified feedback can reference hypotheses across recomputations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HypothesisId(pub Uuid);

impl HypothesisId {
    pub fn derive(case_id: &CaseId, tag: &str) -> Self {
        let name = format!("hypothesis:{}:{}", case_id, tag);
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }
}

impl std::fmt::Display for HypothesisId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What aspect of the investigation a hypothesis addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HypothesisCategory {
    Suspect,
    Timeline,
    Motive,
    Connection,
    Location,
    Other,
}

/// One investigative lead with supporting evidence and follow-up actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hypothesis {
    pub id: HypothesisId,
    pub title: String,
    pub description: String,
    /// Integer confidence in [0,100]
    pub confidence: u8,
    pub category: HypothesisCategory,
    pub supporting_evidence: Vec<String>,
    pub recommended_actions: Vec<String>,
}
