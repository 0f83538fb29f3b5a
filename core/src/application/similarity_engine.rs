// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! # SimilarityEngine — Pairwise Case Linkage Scoring
//!
//! Scores how closely two case files resemble each other across five
//! weighted factors: narrative trigram overlap, evidence-type overlap,
//! MO keyword co-occurrence, jurisdiction proximity, and temporal
//! proximity.
//!
//! ## Missing data
//!
//! A factor whose inputs are absent (no date, no jurisdiction, no
//! evidence) is *skipped*, not zeroed: the composite is normalised over
//! the weights of the factors that actually applied, so an undated case
//! is never penalised for the host store not knowing its date. A pair
//! with no applicable factor at all scores 0.0.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::{CaseMatch, CaseRecord, FactorBreakdown, SimilarityConfig, SimilarityScore};

/// MO indicator vocabulary, matched by lower-cased substring against
/// narrative plus all evidence descriptions.
pub const MO_KEYWORDS: [&str; 20] = [
    "weapon", "method", "entry", "escape", "victim", "location", "time", "threat", "demand",
    "ransom", "note", "letter", "call", "witness", "forced", "bound", "gagged", "stabbed", "shot",
    "strangled",
];

/// Keyword hits reported back to investigators as matching-factor labels.
const MO_FACTOR_LABELS: [(&str, &str); 5] = [
    ("weapon", "Similar weapon"),
    ("method", "Similar method"),
    ("threat", "Similar threats"),
    ("note", "Similar notes/letters"),
    ("forced", "Similar force used"),
];

/// Scores case pairs and ranks corpus matches for a target case.
pub struct SimilarityEngine {
    config: SimilarityConfig,
}

impl SimilarityEngine {
    pub fn new(config: SimilarityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    /// Score one pair of cases. Order of arguments does not affect the result.
    pub fn score(&self, a: &CaseRecord, b: &CaseRecord) -> SimilarityScore {
        let factors = FactorBreakdown {
            narrative: narrative_similarity(a, b),
            evidence: evidence_similarity(a, b),
            keyword: keyword_similarity(a, b),
            jurisdiction: jurisdiction_factor(a, b),
            temporal: temporal_proximity(a.date, b.date),
        };

        let weighted = [
            (factors.narrative, self.config.narrative_weight),
            (factors.evidence, self.config.evidence_weight),
            (factors.keyword, self.config.keyword_weight),
            (factors.jurisdiction, self.config.jurisdiction_weight),
            (factors.temporal, self.config.temporal_weight),
        ];

        let mut sum = 0.0;
        let mut weight_total = 0.0;
        for (value, weight) in weighted {
            if let Some(value) = value {
                sum += value * weight;
                weight_total += weight;
            }
        }

        let composite = if weight_total > 0.0 { sum / weight_total } else { 0.0 };
        SimilarityScore { composite, factors }
    }

    /// Score the target against every other corpus case and keep those at or
    /// above `min_similarity`, sorted by composite descending with ties
    /// broken ascending by case id, truncated to `max_matches`.
    pub fn find_matches(&self, target: &CaseRecord, corpus: &[CaseRecord]) -> Vec<CaseMatch> {
        let mut matches: Vec<CaseMatch> = corpus
            .iter()
            .filter(|other| other.id != target.id)
            .filter_map(|other| {
                let score = self.score(target, other);
                if score.composite >= self.config.min_similarity {
                    Some(CaseMatch {
                        case_id: other.id.clone(),
                        title: other.title.clone(),
                        score,
                        matching_factors: matching_factors(target, other),
                    })
                } else {
                    None
                }
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .composite
                .partial_cmp(&a.score.composite)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.case_id.cmp(&b.case_id))
        });
        matches.truncate(self.config.max_matches);

        debug!(
            case_id = %target.id,
            corpus_size = corpus.len(),
            matches = matches.len(),
            "Scored case against corpus"
        );
        matches
    }
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self::new(SimilarityConfig::default())
    }
}

/// Character-trigram Jaccard over lower-cased narratives, spaces included.
/// Skipped when either narrative is empty; 0.0 when the trigram union is
/// empty (both narratives shorter than three characters).
fn narrative_similarity(a: &CaseRecord, b: &CaseRecord) -> Option<f64> {
    if a.narrative.is_empty() || b.narrative.is_empty() {
        return None;
    }
    let grams_a = trigram_set(&a.narrative.to_lowercase());
    let grams_b = trigram_set(&b.narrative.to_lowercase());
    let union = grams_a.union(&grams_b).count();
    if union == 0 {
        return Some(0.0);
    }
    let intersection = grams_a.intersection(&grams_b).count();
    Some(intersection as f64 / union as f64)
}

fn trigram_set(text: &str) -> HashSet<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.windows(3).map(|window| window.iter().collect()).collect()
}

/// Category-set Jaccard blended 70/30 with an item-count ratio.
/// Skipped unless both cases carry at least one evidence item.
fn evidence_similarity(a: &CaseRecord, b: &CaseRecord) -> Option<f64> {
    if a.evidence.is_empty() || b.evidence.is_empty() {
        return None;
    }
    let types_a: HashSet<_> = a.evidence.iter().map(|e| e.category).collect();
    let types_b: HashSet<_> = b.evidence.iter().map(|e| e.category).collect();
    let union = types_a.union(&types_b).count();
    let intersection = types_a.intersection(&types_b).count();
    let type_overlap = intersection as f64 / union as f64;

    let min_count = a.evidence.len().min(b.evidence.len()) as f64;
    let max_count = a.evidence.len().max(b.evidence.len()) as f64;
    let count_ratio = min_count / max_count;

    Some(type_overlap * 0.7 + count_ratio * 0.3)
}

/// Fraction of MO keywords present in both cases' combined text, over the
/// keywords present in at least one. Skipped when no keyword appears in
/// either case.
fn keyword_similarity(a: &CaseRecord, b: &CaseRecord) -> Option<f64> {
    let text_a = a.combined_text();
    let text_b = b.combined_text();

    let mut matches = 0u32;
    let mut total = 0u32;
    for keyword in MO_KEYWORDS {
        let in_a = text_a.contains(keyword);
        let in_b = text_b.contains(keyword);
        if in_a || in_b {
            total += 1;
            if in_a && in_b {
                matches += 1;
            }
        }
    }

    if total == 0 {
        None
    } else {
        Some(matches as f64 / total as f64)
    }
}

fn jurisdiction_factor(a: &CaseRecord, b: &CaseRecord) -> Option<f64> {
    match (a.jurisdiction.as_deref(), b.jurisdiction.as_deref()) {
        (Some(ja), Some(jb)) => Some(jurisdiction_proximity(ja, jb)),
        _ => None,
    }
}

/// Proximity of two jurisdiction strings: exact match 1.0, same state
/// (second comma field) 0.7, same coarse region 0.4, otherwise 0.1.
pub fn jurisdiction_proximity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let state_a = a.split(',').nth(1).map(str::trim).filter(|s| !s.is_empty());
    let state_b = b.split(',').nth(1).map(str::trim).filter(|s| !s.is_empty());
    if let (Some(sa), Some(sb)) = (state_a, state_b) {
        if sa == sb {
            return 0.7;
        }
    }

    if let (Some(ra), Some(rb)) = (region(a), region(b)) {
        if ra == rb {
            return 0.4;
        }
    }

    0.1
}

/// Jurisdiction proximity with a 0.5 neutral default when either side is
/// missing. The pattern classifier's serial gate uses this so that undated
/// jurisdictions neither qualify nor disqualify a case on geography alone.
pub fn geographic_proximity(a: &CaseRecord, b: &CaseRecord) -> f64 {
    match (a.jurisdiction.as_deref(), b.jurisdiction.as_deref()) {
        (Some(ja), Some(jb)) => jurisdiction_proximity(ja, jb),
        _ => 0.5,
    }
}

fn region(jurisdiction: &str) -> Option<&'static str> {
    let lower = jurisdiction.to_lowercase();
    if lower.contains("california") || lower.contains("west") {
        return Some("west");
    }
    if lower.contains("new york") || lower.contains("east") {
        return Some("east");
    }
    if lower.contains("texas") || lower.contains("south") {
        return Some("south");
    }
    if lower.contains("illinois") || lower.contains("midwest") {
        return Some("midwest");
    }
    None
}

/// Step function on the absolute day gap between two case dates.
/// Skipped when either date is missing.
pub fn temporal_proximity(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Option<f64> {
    let (da, db) = match (a, b) {
        (Some(da), Some(db)) => (da, db),
        _ => return None,
    };
    let gap = (da - db).num_days().abs();
    let value = match gap {
        0..=30 => 1.0,
        31..=90 => 0.8,
        91..=180 => 0.6,
        181..=365 => 0.4,
        366..=730 => 0.2,
        _ => 0.1,
    };
    Some(value)
}

/// Human-readable labels explaining why two cases matched.
fn matching_factors(a: &CaseRecord, b: &CaseRecord) -> Vec<String> {
    let mut factors = Vec::new();

    let text_a = a.combined_text();
    let text_b = b.combined_text();
    for (keyword, label) in MO_FACTOR_LABELS {
        if text_a.contains(keyword) && text_b.contains(keyword) {
            factors.push(label.to_string());
        }
    }

    let types_a: HashSet<_> = a.evidence.iter().map(|e| e.category).collect();
    let types_b: HashSet<_> = b.evidence.iter().map(|e| e.category).collect();
    if types_a.intersection(&types_b).count() >= 2 {
        factors.push("Similar evidence types".to_string());
    }

    if let (Some(ja), Some(jb)) = (a.jurisdiction.as_deref(), b.jurisdiction.as_deref()) {
        let proximity = jurisdiction_proximity(ja, jb);
        if proximity >= 0.7 {
            factors.push("Same jurisdiction".to_string());
        } else if proximity >= 0.4 {
            factors.push("Nearby jurisdiction".to_string());
        }
    }

    if factors.is_empty() {
        factors.push("General similarity".to_string());
    }
    factors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CaseId, EvidenceCategory, EvidenceId, EvidenceItem, Priority};

    fn evidence(id: &str, category: EvidenceCategory, description: &str) -> EvidenceItem {
        EvidenceItem {
            id: EvidenceId::new(id),
            category,
            description: description.to_string(),
            date: None,
            confidence: None,
        }
    }

    fn case(id: &str, narrative: &str) -> CaseRecord {
        CaseRecord {
            id: CaseId::new(id),
            title: format!("Case {id}"),
            narrative: narrative.to_string(),
            date: None,
            jurisdiction: None,
            priority: Priority::Medium,
            evidence: Vec::new(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn identical_narratives_score_full_trigram_overlap() {
        let a = case("a", "The suspect fled on foot through the alley");
        let b = case("b", "The suspect fled on foot through the alley");
        assert_eq!(narrative_similarity(&a, &b), Some(1.0));
    }

    #[test]
    fn empty_narrative_skips_the_factor() {
        let a = case("a", "");
        let b = case("b", "Something happened");
        assert_eq!(narrative_similarity(&a, &b), None);
    }

    #[test]
    fn factors_are_order_independent() {
        let mut a = case("a", "Armed robbery with a weapon, masked intruder");
        let mut b = case("b", "Robbery at gunpoint, the weapon was recovered");
        a.jurisdiction = Some("Springfield, IL".to_string());
        b.jurisdiction = Some("Peoria, IL".to_string());
        a.date = Some(date(2023, 1, 10));
        b.date = Some(date(2023, 3, 2));
        a.evidence.push(evidence("e1", EvidenceCategory::Forensic, "weapon residue"));
        b.evidence.push(evidence("e2", EvidenceCategory::Forensic, "weapon casing"));

        let engine = SimilarityEngine::default();
        let ab = engine.score(&a, &b);
        let ba = engine.score(&b, &a);
        assert_eq!(ab.composite, ba.composite);
        assert_eq!(ab.factors, ba.factors);
    }

    #[test]
    fn composite_stays_in_unit_interval() {
        let mut a = case("a", "weapon threat note forced entry method");
        let mut b = case("b", "weapon threat note forced entry method");
        a.jurisdiction = Some("Austin, TX".to_string());
        b.jurisdiction = Some("Austin, TX".to_string());
        a.date = Some(date(2022, 6, 1));
        b.date = Some(date(2022, 6, 5));
        for c in [&mut a, &mut b] {
            c.evidence.push(evidence("e", EvidenceCategory::Physical, "knife"));
        }

        let score = SimilarityEngine::default().score(&a, &b);
        assert!(score.composite > 0.0 && score.composite <= 1.0);
    }

    #[test]
    fn no_applicable_factors_scores_zero() {
        let a = case("a", "");
        let b = case("b", "");
        let score = SimilarityEngine::default().score(&a, &b);
        assert_eq!(score.composite, 0.0);
        assert_eq!(score.factors.applicable_count(), 0);
    }

    #[test]
    fn jurisdiction_proximity_tiers() {
        assert_eq!(jurisdiction_proximity("Springfield, IL", "Springfield, IL"), 1.0);
        assert_eq!(jurisdiction_proximity("Springfield, IL", "Peoria, IL"), 0.7);
        assert_eq!(jurisdiction_proximity("Los Angeles, CA (west)", "Fresno area, west"), 0.4);
        assert_eq!(jurisdiction_proximity("Miami, FL", "Anchorage, AK"), 0.1);
    }

    #[test]
    fn geographic_proximity_defaults_when_jurisdiction_missing() {
        let a = case("a", "x");
        let mut b = case("b", "y");
        b.jurisdiction = Some("Austin, TX".to_string());
        assert_eq!(geographic_proximity(&a, &b), 0.5);
    }

    #[test]
    fn temporal_proximity_steps() {
        let base = date(2023, 1, 1);
        let cases = [
            (10, 1.0),
            (60, 0.8),
            (150, 0.6),
            (300, 0.4),
            (700, 0.2),
            (1000, 0.1),
        ];
        for (days, expected) in cases {
            let other = base + chrono::Duration::days(days);
            assert_eq!(temporal_proximity(Some(base), Some(other)), Some(expected));
        }
        assert_eq!(temporal_proximity(Some(base), None), None);
    }

    #[test]
    fn keyword_similarity_counts_shared_terms() {
        let a = case("a", "a ransom note and a weapon were found");
        let b = case("b", "the ransom demand mentioned a weapon");
        // weapon and ransom shared; note and demand in one case each.
        assert_eq!(keyword_similarity(&a, &b), Some(2.0 / 4.0));
    }

    #[test]
    fn find_matches_filters_sorts_and_labels() {
        let mut target = case("target", "Armed robbery, weapon drawn, threat made, note left");
        target.jurisdiction = Some("Springfield, IL".to_string());
        target.date = Some(date(2023, 1, 1));
        target.evidence.push(evidence("e1", EvidenceCategory::WitnessStatement, "saw weapon"));
        target.evidence.push(evidence("e2", EvidenceCategory::Document, "threat note"));

        let mut close = case("b-close", "Armed robbery, weapon drawn, threat made, note left");
        close.jurisdiction = Some("Springfield, IL".to_string());
        close.date = Some(date(2023, 1, 11));
        close.evidence.push(evidence("e3", EvidenceCategory::WitnessStatement, "saw weapon"));
        close.evidence.push(evidence("e4", EvidenceCategory::Document, "threat note"));

        let far = case("a-far", "Unrelated noise complaint downtown");

        let engine = SimilarityEngine::default();
        let matches = engine.find_matches(&target, &[far, close]);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].case_id, CaseId::new("b-close"));
        assert!(matches[0].score.composite > 0.8);
        assert!(matches[0].matching_factors.contains(&"Similar weapon".to_string()));
        assert!(matches[0].matching_factors.contains(&"Same jurisdiction".to_string()));
        assert!(matches[0].matching_factors.contains(&"Similar evidence types".to_string()));
    }

    #[test]
    fn equal_scores_break_ties_by_case_id() {
        let target = case("target", "weapon threat ransom note forced entry");
        let twin_a = case("id-b", "weapon threat ransom note forced entry");
        let twin_b = case("id-a", "weapon threat ransom note forced entry");

        let matches = SimilarityEngine::default().find_matches(&target, &[twin_a, twin_b]);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].case_id, CaseId::new("id-a"));
        assert_eq!(matches[1].case_id, CaseId::new("id-b"));
    }

    #[test]
    fn unrelated_pair_falls_back_to_general_label() {
        let a = case("a", "quiet street, nothing notable");
        let b = case("b", "routine patrol, nothing notable");
        assert_eq!(matching_factors(&a, &b), vec!["General similarity".to_string()]);
    }
}
