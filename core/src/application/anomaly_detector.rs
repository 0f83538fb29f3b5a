// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! # AnomalyDetector — Intra-Case Inconsistency Scan
//!
//! Inspects a single case file for timeline gaps, conflicting evidence
//! statements, witness discrepancies, and data-quality problems.
//!
//! ## Sensitivity
//!
//! Every rule fires at a fixed severity; the configured sensitivity then
//! acts as a floor, dropping findings below it. At the default 0.7 all
//! severities pass through.
//!
//! Anomaly ids are derived from the case id plus a per-rule tag, so the
//! same case always reports the same ids and outcome feedback can refer
//! to them across recomputations.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::domain::{
    Anomaly, AnomalyConfig, AnomalyId, AnomalyKind, CaseRecord, EvidenceCategory, Severity,
};

/// Terms whose described values are cross-checked for conflicts.
const CONFLICT_KEYWORDS: [&str; 5] = ["weapon", "location", "time", "suspect", "vehicle"];

/// Details compared across witness statements.
const WITNESS_DETAILS: [&str; 4] = ["time", "location", "description", "suspect"];

/// Extractors pulling the phrase following `keyword:` or `keyword `
/// out of an evidence description, one per conflict keyword.
static CONFLICT_EXTRACTORS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    CONFLICT_KEYWORDS
        .iter()
        .map(|kw| (*kw, value_extractor(kw)))
        .collect()
});

static WITNESS_EXTRACTORS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    WITNESS_DETAILS
        .iter()
        .map(|detail| (*detail, value_extractor(detail)))
        .collect()
});

fn value_extractor(keyword: &str) -> Regex {
    Regex::new(&format!(r"(?i){keyword}[\s:]+([^,;.]+)")).unwrap()
}

/// Scans one case for internal inconsistencies.
pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    /// Run every rule over the case. Findings come back sorted by severity
    /// descending (stable), with severities below the sensitivity floor
    /// dropped.
    pub fn detect(&self, case: &CaseRecord) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();
        anomalies.extend(self.timeline_anomalies(case));
        anomalies.extend(self.evidence_conflicts(case));
        anomalies.extend(self.witness_discrepancies(case));
        anomalies.extend(self.data_quality_issues(case));

        let floor = self.config.severity_floor();
        anomalies.retain(|a| a.severity >= floor);
        anomalies.sort_by(|a, b| b.severity.cmp(&a.severity));

        debug!(case_id = %case.id, anomalies = anomalies.len(), "Scanned case for anomalies");
        anomalies
    }

    fn timeline_anomalies(&self, case: &CaseRecord) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();

        let dated = case.dated_evidence();
        for (i, pair) in dated.windows(2).enumerate() {
            // dated_evidence is sorted ascending, both dates present
            let (Some(prev), Some(curr)) = (pair[0].date, pair[1].date) else {
                continue;
            };
            let gap = (curr - prev).num_days();
            if gap > self.config.min_gap_days && gap < self.config.max_gap_days {
                anomalies.push(Anomaly {
                    id: AnomalyId::derive(&case.id, &format!("timeline-gap-{}", i + 1)),
                    kind: AnomalyKind::TimelineGap,
                    severity: Severity::Medium,
                    description: format!("Significant gap of {gap} days between events"),
                    affected_elements: vec![
                        pair[0].id.as_str().to_string(),
                        pair[1].id.as_str().to_string(),
                    ],
                    suggested_investigation: vec![
                        "Review records for missing events during this period".to_string(),
                        "Check for additional witness statements".to_string(),
                        "Verify evidence collection dates".to_string(),
                    ],
                });
            }
        }

        if let Some(incident_date) = case.date {
            let early: Vec<String> = case
                .evidence
                .iter()
                .filter(|e| e.date.is_some_and(|d| d < incident_date))
                .map(|e| e.id.as_str().to_string())
                .collect();
            if !early.is_empty() {
                anomalies.push(Anomaly {
                    id: AnomalyId::derive(&case.id, "timeline-impossible"),
                    kind: AnomalyKind::TimelineGap,
                    severity: Severity::High,
                    description: "Evidence dated before the incident date".to_string(),
                    affected_elements: early,
                    suggested_investigation: vec![
                        "Verify evidence collection dates".to_string(),
                        "Check for data entry errors".to_string(),
                        "Review chain of custody documentation".to_string(),
                    ],
                });
            }
        }

        anomalies
    }

    fn evidence_conflicts(&self, case: &CaseRecord) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();
        let descriptions: Vec<String> =
            case.evidence.iter().map(|e| e.description.to_lowercase()).collect();

        for (keyword, extractor) in CONFLICT_EXTRACTORS.iter() {
            let mentions: Vec<usize> = descriptions
                .iter()
                .enumerate()
                .filter(|(_, desc)| desc.contains(keyword))
                .map(|(idx, _)| idx)
                .collect();
            if mentions.len() < 2 {
                continue;
            }

            let values: HashSet<Option<String>> = mentions
                .iter()
                .map(|&idx| {
                    extractor
                        .captures(&descriptions[idx])
                        .and_then(|c| c.get(1))
                        .map(|m| m.as_str().trim().to_string())
                })
                .collect();

            // Every mention names a different value
            if values.len() > 1 && values.len() == mentions.len() {
                anomalies.push(Anomaly {
                    id: AnomalyId::derive(&case.id, &format!("evidence-conflict-{keyword}")),
                    kind: AnomalyKind::EvidenceConflict,
                    severity: Severity::High,
                    description: format!(
                        "Conflicting information about {keyword} across evidence items"
                    ),
                    affected_elements: mentions
                        .iter()
                        .map(|&idx| case.evidence[idx].id.as_str().to_string())
                        .collect(),
                    suggested_investigation: vec![
                        "Review original evidence sources".to_string(),
                        "Verify evidence authenticity".to_string(),
                        "Check for transcription errors".to_string(),
                        "Re-interview witnesses if applicable".to_string(),
                    ],
                });
            }
        }

        anomalies
    }

    fn witness_discrepancies(&self, case: &CaseRecord) -> Vec<Anomaly> {
        let statements: Vec<_> = case
            .evidence
            .iter()
            .filter(|e| e.category == EvidenceCategory::WitnessStatement)
            .collect();
        if statements.len() < 2 {
            return Vec::new();
        }

        let texts: Vec<String> = statements.iter().map(|e| e.description.to_lowercase()).collect();
        let mut differing_details = 0;
        for (detail, extractor) in WITNESS_EXTRACTORS.iter() {
            let mentions: Vec<&String> = texts.iter().filter(|t| t.contains(detail)).collect();
            if mentions.len() < 2 {
                continue;
            }
            let phrases: HashSet<Option<String>> = mentions
                .iter()
                .map(|text| {
                    extractor
                        .captures(text)
                        .and_then(|c| c.get(1))
                        .map(|m| m.as_str().trim().chars().take(20).collect::<String>())
                })
                .collect();
            if phrases.len() > 1 {
                differing_details += 1;
            }
        }

        if differing_details < 2 {
            return Vec::new();
        }

        vec![Anomaly {
            id: AnomalyId::derive(&case.id, "witness-inconsistency"),
            kind: AnomalyKind::WitnessDiscrepancy,
            severity: Severity::Medium,
            description: "Significant inconsistencies detected across witness statements"
                .to_string(),
            affected_elements: statements.iter().map(|e| e.id.as_str().to_string()).collect(),
            suggested_investigation: vec![
                "Re-interview witnesses separately".to_string(),
                "Review original statement recordings".to_string(),
                "Check for memory contamination".to_string(),
                "Consider witness credibility assessment".to_string(),
            ],
        }]
    }

    fn data_quality_issues(&self, case: &CaseRecord) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();

        if case.narrative.chars().count() < self.config.min_narrative_chars {
            anomalies.push(Anomaly {
                id: AnomalyId::derive(&case.id, "data-quality-description"),
                kind: AnomalyKind::DataQuality,
                severity: Severity::Low,
                description: "Case description is brief or missing".to_string(),
                affected_elements: vec!["description".to_string()],
                suggested_investigation: vec!["Gather additional case details".to_string()],
            });
        }

        if case.evidence.len() < self.config.min_evidence_items {
            anomalies.push(Anomaly {
                id: AnomalyId::derive(&case.id, "data-quality-evidence"),
                kind: AnomalyKind::DataQuality,
                severity: Severity::Medium,
                description: "Limited evidence available for analysis".to_string(),
                affected_elements: case
                    .evidence
                    .iter()
                    .map(|e| e.id.as_str().to_string())
                    .collect(),
                suggested_investigation: vec![
                    "Review case files for additional evidence".to_string(),
                    "Check for archived materials".to_string(),
                    "Verify all evidence has been catalogued".to_string(),
                ],
            });
        }

        let undated: Vec<String> = case
            .evidence
            .iter()
            .filter(|e| e.date.is_none())
            .map(|e| e.id.as_str().to_string())
            .collect();
        if undated.len() as f64 > case.evidence.len() as f64 * self.config.undated_ratio_threshold {
            anomalies.push(Anomaly {
                id: AnomalyId::derive(&case.id, "data-quality-dates"),
                kind: AnomalyKind::DataQuality,
                severity: Severity::Low,
                description: "Many evidence items missing dates".to_string(),
                affected_elements: undated,
                suggested_investigation: vec![
                    "Update evidence records with collection dates".to_string(),
                ],
            });
        }

        anomalies
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(AnomalyConfig::default())
    }
}
