// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! # PatternClassifier — Higher-Order Pattern Derivation
//!
//! Turns raw pairwise similarity into investigative patterns: serial
//! offender signals, geographic clusters, temporal series, evidence-type
//! chains, and suspect-description links.
//!
//! ## Serial gate
//!
//! A corpus case only enters the serial-offender set when composite
//! similarity, temporal proximity, and geographic proximity all clear
//! their thresholds and both cases carry at least `serial_min_evidence`
//! items. The resulting pattern is scored from MO consistency (mean
//! pairwise composite), temporal consistency (inverse interval variance),
//! and geographic concentration, then rejected below the configured
//! confidence floor.
//!
//! ## Aggregate probability
//!
//! `serial_offender_probability` starts from the serial pattern's
//! confidence and grows with corroborating evidence (set size, temporal
//! series, geographic cluster of 3+), capped at 100. It is 0 whenever no
//! serial pattern survives the floor.

use chrono::NaiveDate;
use tracing::debug;

use crate::application::similarity_engine::{
    geographic_proximity, jurisdiction_proximity, temporal_proximity, SimilarityEngine,
};
use crate::domain::{
    CaseRecord, PatternConfig, PatternInsight, PatternKind, PatternReport, RiskLevel,
    SimilarityConfig,
};

/// Terms marking a case as carrying a suspect description.
const SUSPECT_KEYWORDS: [&str; 4] = ["suspect", "perpetrator", "description", "witness saw"];

/// Members closer than this jurisdiction proximity join a geographic cluster.
const CLUSTER_PROXIMITY: f64 = 0.7;

/// Derives cross-case patterns for one target against a corpus.
pub struct PatternClassifier {
    engine: SimilarityEngine,
    config: PatternConfig,
}

impl PatternClassifier {
    pub fn new(similarity: SimilarityConfig, config: PatternConfig) -> Self {
        Self { engine: SimilarityEngine::new(similarity), config }
    }

    pub fn config(&self) -> &PatternConfig {
        &self.config
    }

    /// Classify the target case against the corpus. Patterns come back
    /// sorted by confidence descending with the insertion order preserved
    /// on ties.
    pub fn classify(&self, target: &CaseRecord, corpus: &[CaseRecord]) -> PatternReport {
        let mut patterns = Vec::new();

        if let Some(serial) = self.detect_serial_offender(target, corpus) {
            patterns.push(serial);
        }
        patterns.extend(self.detect_geographic_clusters(target, corpus));
        if let Some(series) = self.detect_temporal_series(target, corpus) {
            patterns.push(series);
        }
        if let Some(chain) = self.detect_evidence_chain(target, corpus) {
            patterns.push(chain);
        }
        if let Some(link) = self.detect_suspect_link(target, corpus) {
            patterns.push(link);
        }

        let serial_offender_probability = serial_probability(&patterns);
        let recommendations = aggregate_recommendations(&patterns, serial_offender_probability);

        patterns.sort_by(|a, b| b.confidence.cmp(&a.confidence));

        debug!(
            case_id = %target.id,
            patterns = patterns.len(),
            serial_offender_probability,
            "Classified cross-case patterns"
        );

        PatternReport { patterns, serial_offender_probability, recommendations }
    }

    fn detect_serial_offender(
        &self,
        target: &CaseRecord,
        corpus: &[CaseRecord],
    ) -> Option<PatternInsight> {
        if target.evidence.len() < self.config.serial_min_evidence {
            return None;
        }

        let matched: Vec<&CaseRecord> = corpus
            .iter()
            .filter(|other| other.id != target.id)
            .filter(|other| other.evidence.len() >= self.config.serial_min_evidence)
            .filter(|other| {
                self.engine.score(target, other).composite >= self.config.serial_similarity_threshold
            })
            .filter(|other| {
                temporal_proximity(target.date, other.date)
                    .is_some_and(|t| t >= self.config.serial_temporal_threshold)
            })
            .filter(|other| {
                geographic_proximity(target, other) >= self.config.serial_geographic_threshold
            })
            .collect();

        if matched.len() < 2 {
            return None;
        }

        let mut involved: Vec<&CaseRecord> = vec![target];
        involved.extend(matched.iter().copied());

        let mo = self.mo_consistency(&involved);
        let temporal = temporal_consistency(&involved);
        let geographic = geographic_concentration(&involved);

        let confidence =
            (mo as f64 * 0.4 + temporal as f64 * 0.3 + geographic as f64 * 0.3).round() as u8;
        if confidence < self.config.serial_confidence_floor {
            return None;
        }

        let risk = if confidence >= 80 {
            RiskLevel::Critical
        } else if confidence >= 65 {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        };

        Some(PatternInsight {
            kind: PatternKind::SerialOffender,
            name: "Potential Serial Offender Pattern".to_string(),
            description: format!(
                "Strong indicators of serial offender activity across {} cases",
                involved.len()
            ),
            confidence,
            risk,
            case_ids: involved.iter().map(|c| c.id.clone()).collect(),
            indicators: vec![
                format!("MO similarity: {mo}%"),
                format!(
                    "Temporal pattern: {}",
                    if temporal > 70 { "Strong" } else { "Moderate" }
                ),
                format!(
                    "Geographic pattern: {}",
                    if geographic > 70 { "Concentrated" } else { "Scattered" }
                ),
            ],
            recommendations: vec![
                "Coordinate investigation across jurisdictions".to_string(),
                "Create task force if not already established".to_string(),
                "Cross-reference all cases for suspect overlap".to_string(),
                "Review unsolved cases in same timeframe".to_string(),
                "Check for similar cases in adjacent jurisdictions".to_string(),
            ],
        })
    }

    /// Mean pairwise composite similarity over the involved set, as a
    /// rounded percentage.
    fn mo_consistency(&self, cases: &[&CaseRecord]) -> u8 {
        if cases.len() < 2 {
            return 0;
        }
        let mut total = 0.0;
        let mut comparisons = 0u32;
        for i in 0..cases.len() {
            for j in (i + 1)..cases.len() {
                total += self.engine.score(cases[i], cases[j]).composite;
                comparisons += 1;
            }
        }
        ((total / comparisons as f64) * 100.0).round() as u8
    }

    fn detect_geographic_clusters(
        &self,
        target: &CaseRecord,
        corpus: &[CaseRecord],
    ) -> Vec<PatternInsight> {
        let target_jurisdiction = match target.jurisdiction.as_deref() {
            Some(j) => j,
            None => return Vec::new(),
        };

        // Greedy single pass: a candidate joins the first cluster holding a
        // member within CLUSTER_PROXIMITY, else opens a new target-seeded
        // cluster. Singleton clusters are discarded.
        let mut clusters: Vec<Vec<&CaseRecord>> = Vec::new();
        for other in corpus {
            if other.id == target.id {
                continue;
            }
            let other_jurisdiction = match other.jurisdiction.as_deref() {
                Some(j) => j,
                None => continue,
            };
            if jurisdiction_proximity(target_jurisdiction, other_jurisdiction) < CLUSTER_PROXIMITY {
                continue;
            }

            let joined = clusters.iter_mut().find(|cluster| {
                cluster.iter().any(|member| {
                    member
                        .jurisdiction
                        .as_deref()
                        .map(|j| jurisdiction_proximity(j, other_jurisdiction))
                        .unwrap_or(0.0)
                        >= CLUSTER_PROXIMITY
                })
            });
            match joined {
                Some(cluster) => cluster.push(other),
                None => clusters.push(vec![target, other]),
            }
        }

        clusters
            .into_iter()
            .filter(|cluster| cluster.len() > 1)
            .enumerate()
            .map(|(idx, cluster)| {
                let concentration = geographic_concentration(&cluster);
                let size_score = (cluster.len() * 15).min(100) as f64;
                let confidence = (size_score * 0.5 + concentration as f64 * 0.5).round() as u8;
                let risk = if cluster.len() >= 5 {
                    RiskLevel::High
                } else if cluster.len() >= 3 {
                    RiskLevel::Medium
                } else {
                    RiskLevel::Low
                };

                PatternInsight {
                    kind: PatternKind::GeographicCluster,
                    name: format!("Geographic Cluster {}", idx + 1),
                    description: format!("{} cases in similar geographic area", cluster.len()),
                    confidence,
                    risk,
                    case_ids: cluster.iter().map(|c| c.id.clone()).collect(),
                    indicators: geographic_indicators(&cluster),
                    recommendations: vec![
                        "Map all locations to identify patterns".to_string(),
                        "Check for surveillance footage in area".to_string(),
                        "Review local police reports for similar incidents".to_string(),
                    ],
                }
            })
            .collect()
    }

    fn detect_temporal_series(
        &self,
        target: &CaseRecord,
        corpus: &[CaseRecord],
    ) -> Option<PatternInsight> {
        let target_date = target.date?;

        let mut nearby: Vec<(&CaseRecord, i64)> = corpus
            .iter()
            .filter(|other| other.id != target.id)
            .filter_map(|other| {
                let gap = (other.date? - target_date).num_days().abs();
                (gap <= 365).then_some((other, gap))
            })
            .collect();
        nearby.sort_by_key(|(_, gap)| *gap);
        nearby.truncate(5);

        if nearby.len() < 2 {
            return None;
        }

        let mut dates: Vec<NaiveDate> = vec![target_date];
        dates.extend(nearby.iter().filter_map(|(c, _)| c.date));
        let (kind, description) = date_pattern(&dates)?;

        let mut case_ids = vec![target.id.clone()];
        case_ids.extend(nearby.iter().map(|(c, _)| c.id.clone()));

        Some(PatternInsight {
            kind: PatternKind::TemporalSeries,
            name: "Temporal Pattern Detected".to_string(),
            description: format!("Cases show temporal clustering: {description}"),
            confidence: 75,
            risk: RiskLevel::Medium,
            case_ids,
            indicators: vec![
                format!("{} cases within 1 year", nearby.len()),
                format!("Pattern: {kind}"),
            ],
            recommendations: vec![
                "Investigate what was happening during pattern periods".to_string(),
                "Check for events that might explain timing".to_string(),
                "Review cases before/after pattern for context".to_string(),
            ],
        })
    }

    fn detect_evidence_chain(
        &self,
        target: &CaseRecord,
        corpus: &[CaseRecord],
    ) -> Option<PatternInsight> {
        let target_categories = target.evidence_categories();
        if target_categories.is_empty() {
            return None;
        }
        let required = (target_categories.len() as f64 * 0.6).ceil() as usize;

        let matching: Vec<&CaseRecord> = corpus
            .iter()
            .filter(|other| other.id != target.id)
            .filter(|other| {
                let other_categories = other.evidence_categories();
                let overlap = target_categories
                    .iter()
                    .filter(|c| other_categories.contains(c))
                    .count();
                overlap >= required
            })
            .collect();

        if matching.len() < 2 {
            return None;
        }

        let type_list: Vec<&str> = target_categories.iter().map(|c| c.label()).collect();
        let mut case_ids = vec![target.id.clone()];
        case_ids.extend(matching.iter().map(|c| c.id.clone()));

        Some(PatternInsight {
            kind: PatternKind::EvidenceChain,
            name: "Evidence Type Chain".to_string(),
            description: format!("{} cases share similar evidence types", matching.len() + 1),
            confidence: 70,
            risk: RiskLevel::Medium,
            case_ids,
            indicators: vec![
                format!("Common evidence types: {}", type_list.join(", ")),
                format!("{} matching cases", matching.len()),
            ],
            recommendations: vec![
                "Cross-reference evidence collection methods".to_string(),
                "Check if same lab processed evidence".to_string(),
                "Review chain of custody for all cases".to_string(),
            ],
        })
    }

    fn detect_suspect_link(
        &self,
        target: &CaseRecord,
        corpus: &[CaseRecord],
    ) -> Option<PatternInsight> {
        if !has_suspect_description(target) {
            return None;
        }

        let linked: Vec<&CaseRecord> = corpus
            .iter()
            .filter(|other| other.id != target.id)
            .filter(|other| has_suspect_description(other))
            .filter(|other| {
                self.engine
                    .score(target, other)
                    .factors
                    .narrative
                    .is_some_and(|n| n > 0.4)
            })
            .collect();

        if linked.len() < 2 {
            return None;
        }

        let mut case_ids = vec![target.id.clone()];
        case_ids.extend(linked.iter().map(|c| c.id.clone()));

        Some(PatternInsight {
            kind: PatternKind::SuspectLink,
            name: "Suspect Description Link".to_string(),
            description: format!("{} cases have similar suspect descriptions", linked.len() + 1),
            confidence: 65,
            risk: RiskLevel::High,
            case_ids,
            indicators: vec![
                "Similar witness descriptions".to_string(),
                "Potential same perpetrator".to_string(),
            ],
            recommendations: vec![
                "Create composite sketch from all descriptions".to_string(),
                "Cross-reference with known offender databases".to_string(),
                "Review mugshot databases for matches".to_string(),
            ],
        })
    }
}

impl Default for PatternClassifier {
    fn default() -> Self {
        Self::new(SimilarityConfig::default(), PatternConfig::default())
    }
}

fn has_suspect_description(case: &CaseRecord) -> bool {
    let narrative = case.narrative.to_lowercase();
    SUSPECT_KEYWORDS.iter().any(|kw| {
        narrative.contains(kw)
            || case
                .evidence
                .iter()
                .any(|e| e.description.to_lowercase().contains(kw))
    })
}

/// Inverse-variance consistency of the day intervals between consecutive
/// dated cases, as a rounded percentage. Fewer than two intervals is
/// treated as perfectly consistent; undated cases are excluded.
fn temporal_consistency(cases: &[&CaseRecord]) -> u8 {
    let mut dates: Vec<NaiveDate> = cases.iter().filter_map(|c| c.date).collect();
    dates.sort();

    if dates.len() < 3 {
        return 100;
    }

    let intervals: Vec<f64> = dates
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_days() as f64)
        .collect();
    let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
    let variance =
        intervals.iter().map(|i| (i - mean).powi(2)).sum::<f64>() / intervals.len() as f64;

    if mean == 0.0 {
        return if variance == 0.0 { 100 } else { 0 };
    }
    (100.0 - (variance / mean) * 100.0).max(0.0).round() as u8
}

/// Fraction of involved cases sharing a jurisdiction, as a rounded
/// percentage; 50 when none carry a jurisdiction at all.
fn geographic_concentration(cases: &[&CaseRecord]) -> u8 {
    let jurisdictions: Vec<&str> = cases.iter().filter_map(|c| c.jurisdiction.as_deref()).collect();
    if jurisdictions.is_empty() {
        return 50;
    }
    let unique: std::collections::HashSet<&str> = jurisdictions.iter().copied().collect();
    ((1.0 - unique.len() as f64 / jurisdictions.len() as f64) * 100.0).round() as u8
}

fn geographic_indicators(cluster: &[&CaseRecord]) -> Vec<String> {
    let jurisdictions: Vec<&str> =
        cluster.iter().filter_map(|c| c.jurisdiction.as_deref()).collect();
    if jurisdictions.is_empty() {
        return Vec::new();
    }
    let unique: std::collections::HashSet<&str> = jurisdictions.iter().copied().collect();
    if unique.len() == 1 {
        vec![format!("All cases in: {}", jurisdictions[0])]
    } else {
        vec![format!("{} different jurisdictions", unique.len())]
    }
}

/// Interval regularity over three or more sorted dates: roughly monthly,
/// seasonal, or weekly mean spacing, checked in that order.
fn date_pattern(dates: &[NaiveDate]) -> Option<(&'static str, &'static str)> {
    if dates.len() < 3 {
        return None;
    }
    let mut sorted = dates.to_vec();
    sorted.sort();

    let intervals: Vec<f64> = sorted
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_days() as f64)
        .collect();
    let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;

    if (28.0..=31.0).contains(&mean) {
        return Some(("monthly", "Cases occur approximately monthly"));
    }
    if (90.0..=120.0).contains(&mean) {
        return Some(("seasonal", "Cases occur seasonally"));
    }
    if (5.0..=9.0).contains(&mean) {
        return Some(("weekly", "Cases occur approximately weekly"));
    }
    None
}

fn serial_probability(patterns: &[PatternInsight]) -> u8 {
    let serial = match patterns.iter().find(|p| p.kind == PatternKind::SerialOffender) {
        Some(p) => p,
        None => return 0,
    };

    let mut probability = serial.confidence as u32;
    if serial.case_ids.len() >= 5 {
        probability += 10;
    }
    if serial.case_ids.len() >= 10 {
        probability += 10;
    }
    if patterns.iter().any(|p| p.kind == PatternKind::TemporalSeries) {
        probability += 5;
    }
    let geographic = patterns.iter().find(|p| p.kind == PatternKind::GeographicCluster);
    if geographic.is_some_and(|p| p.case_ids.len() >= 3) {
        probability += 5;
    }

    probability.min(100) as u8
}

/// Ordered, deliberately non-deduplicated action list across all detected
/// patterns.
fn aggregate_recommendations(patterns: &[PatternInsight], probability: u8) -> Vec<String> {
    let mut recommendations = Vec::new();

    if probability >= 70 {
        recommendations.push(
            "HIGH PRIORITY: Strong indicators of serial offender - escalate to task force"
                .to_string(),
        );
        recommendations.push("Coordinate with all jurisdictions involved in pattern".to_string());
    }

    if let Some(serial) = patterns.iter().find(|p| p.kind == PatternKind::SerialOffender) {
        recommendations.extend(serial.recommendations.iter().cloned());
    }
    if patterns.iter().any(|p| p.kind == PatternKind::GeographicCluster) {
        recommendations.push("Map all locations to identify geographic pattern".to_string());
        recommendations.push("Check for surveillance cameras in identified area".to_string());
    }
    if patterns.iter().any(|p| p.kind == PatternKind::TemporalSeries) {
        recommendations.push("Investigate what occurs during pattern periods".to_string());
        recommendations.push("Check for events that might explain timing".to_string());
    }

    if recommendations.is_empty() {
        recommendations.push("Continue standard investigation procedures".to_string());
        recommendations.push("Monitor for similar cases".to_string());
    }
    recommendations
}
