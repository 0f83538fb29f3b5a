// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! # HypothesisGenerator — Rule-Based Investigative Leads
//!
//! Produces ranked hypotheses from case content: suspect profiling from
//! witness statements, forensic identification potential, pre-incident
//! activity, cross-case serial connections, and multi-location analysis.
//! Output is capped at the ten highest-confidence leads.
//!
//! Hypothesis ids are derived from the case id plus a per-rule tag, so
//! outcome feedback can mark individual hypotheses correct or incorrect
//! without the core persisting anything.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::domain::{CaseRecord, EvidenceCategory, Hypothesis, HypothesisCategory, HypothesisId};

static SUSPECT_DESCRIPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)suspect|perpetrator|person|individual|man|woman").unwrap());

static LOCATION_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)location|scene|address|place|area").unwrap());

/// Maximum hypotheses returned per case.
const MAX_HYPOTHESES: usize = 10;

/// Generates investigative leads for one case against a corpus.
#[derive(Debug, Default)]
pub struct HypothesisGenerator;

impl HypothesisGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Run every rule and return the top hypotheses sorted by confidence
    /// descending (stable).
    pub fn generate(&self, case: &CaseRecord, corpus: &[CaseRecord]) -> Vec<Hypothesis> {
        let mut hypotheses = Vec::new();
        hypotheses.extend(suspect_hypotheses(case));
        hypotheses.extend(timeline_hypothesis(case));
        hypotheses.extend(connection_hypothesis(case, corpus));
        hypotheses.extend(location_hypothesis(case));

        hypotheses.sort_by(|a, b| b.confidence.cmp(&a.confidence));
        hypotheses.truncate(MAX_HYPOTHESES);

        debug!(case_id = %case.id, hypotheses = hypotheses.len(), "Generated hypotheses");
        hypotheses
    }
}

fn suspect_hypotheses(case: &CaseRecord) -> Vec<Hypothesis> {
    let mut hypotheses = Vec::new();

    let witness_statements: Vec<_> = case
        .evidence
        .iter()
        .filter(|e| e.category == EvidenceCategory::WitnessStatement)
        .collect();
    let has_description = witness_statements
        .iter()
        .any(|e| SUSPECT_DESCRIPTION.is_match(&e.description));

    if has_description {
        hypotheses.push(Hypothesis {
            id: HypothesisId::derive(&case.id, "suspect-profile-1"),
            title: "Suspect Profile Development".to_string(),
            description: "Witness statements contain potential suspect descriptions. \
                          Recommend developing a composite profile."
                .to_string(),
            confidence: 65,
            category: HypothesisCategory::Suspect,
            supporting_evidence: witness_statements
                .iter()
                .map(|e| e.id.as_str().to_string())
                .collect(),
            recommended_actions: vec![
                "Create composite sketch from witness descriptions".to_string(),
                "Cross-reference with known offender databases".to_string(),
                "Review similar cases for suspect patterns".to_string(),
            ],
        });
    }

    let forensic: Vec<String> = case
        .evidence
        .iter()
        .filter(|e| e.category == EvidenceCategory::Forensic)
        .map(|e| e.id.as_str().to_string())
        .collect();
    if !forensic.is_empty() {
        hypotheses.push(Hypothesis {
            id: HypothesisId::derive(&case.id, "suspect-forensic-1"),
            title: "Forensic DNA/Evidence Analysis".to_string(),
            description: "Forensic evidence available for suspect identification. \
                          Recommend database comparison."
                .to_string(),
            confidence: 75,
            category: HypothesisCategory::Suspect,
            supporting_evidence: forensic,
            recommended_actions: vec![
                "Submit evidence for DNA analysis if not already done".to_string(),
                "Compare with CODIS database".to_string(),
                "Consider genealogical DNA analysis for cold cases".to_string(),
            ],
        });
    }

    hypotheses
}

fn timeline_hypothesis(case: &CaseRecord) -> Option<Hypothesis> {
    let incident_date = case.date?;
    let earliest = case.dated_evidence().into_iter().next()?;
    if earliest.date? >= incident_date {
        return None;
    }

    Some(Hypothesis {
        id: HypothesisId::derive(&case.id, "timeline-pre-incident"),
        title: "Pre-Incident Activity Investigation".to_string(),
        description: "Timeline suggests activity before the reported incident. \
                      Investigate pre-incident events."
            .to_string(),
        confidence: 60,
        category: HypothesisCategory::Timeline,
        supporting_evidence: vec![earliest.id.as_str().to_string()],
        recommended_actions: vec![
            "Review surveillance footage from before incident".to_string(),
            "Interview individuals present before the incident".to_string(),
            "Check for related incidents in the area".to_string(),
        ],
    })
}

fn connection_hypothesis(case: &CaseRecord, corpus: &[CaseRecord]) -> Option<Hypothesis> {
    let jurisdiction = case.jurisdiction.as_deref()?;
    let case_date = case.date?;

    let similar = corpus
        .iter()
        .filter(|other| other.id != case.id)
        .filter(|other| other.jurisdiction.as_deref() == Some(jurisdiction))
        .filter(|other| {
            other
                .date
                .is_some_and(|d| (d - case_date).num_days().abs() < 365)
        })
        .count();
    if similar == 0 {
        return None;
    }

    Some(Hypothesis {
        id: HypothesisId::derive(&case.id, "connection-similar-cases"),
        title: "Potential Serial Offender Connection".to_string(),
        description: format!(
            "Found {similar} similar case(s) in the same jurisdiction/timeframe. \
             Possible serial offender pattern."
        ),
        confidence: 70,
        category: HypothesisCategory::Connection,
        supporting_evidence: Vec::new(),
        recommended_actions: vec![
            "Compare MO across similar cases".to_string(),
            "Review geographic patterns".to_string(),
            "Check for suspect overlap".to_string(),
            "Consider task force coordination".to_string(),
        ],
    })
}

fn location_hypothesis(case: &CaseRecord) -> Option<Hypothesis> {
    let mentions: Vec<String> = case
        .evidence
        .iter()
        .filter(|e| LOCATION_MENTION.is_match(&e.description))
        .map(|e| e.id.as_str().to_string())
        .collect();
    if mentions.len() <= 1 {
        return None;
    }

    Some(Hypothesis {
        id: HypothesisId::derive(&case.id, "location-multiple"),
        title: "Multiple Location Analysis".to_string(),
        description: "Evidence suggests multiple locations. \
                      Investigate connections between locations."
            .to_string(),
        confidence: 55,
        category: HypothesisCategory::Location,
        supporting_evidence: mentions,
        recommended_actions: vec![
            "Map all locations on timeline".to_string(),
            "Check for surveillance footage at each location".to_string(),
            "Investigate routes between locations".to_string(),
            "Review traffic camera footage".to_string(),
        ],
    })
}
