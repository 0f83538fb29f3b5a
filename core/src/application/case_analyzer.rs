// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! # CaseAnalyzer — Analysis Facade
//!
//! Composes the five engines into one entry point: similarity ranking,
//! pattern classification, anomaly detection, rule-based lead
//! generation, and the chain-of-thought pipeline. One call to
//! [`CaseAnalyzer::analyze`] is one sequential task; running analyses
//! concurrently is the caller's choice, and concurrent analyses of the
//! same case id are not deduplicated.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{
    Anomaly, AnomalyConfig, CaseId, CaseMatch, CaseRecord, Hypothesis, PatternConfig,
    PatternReport, ReasoningChain, ReasoningConfig, SimilarityConfig, TextGenerator,
};
use crate::infrastructure::chain_cache::ChainStore;
use crate::infrastructure::event_bus::EventBus;
use crate::domain::AnalysisEvent;

use super::anomaly_detector::AnomalyDetector;
use super::hypothesis_generator::HypothesisGenerator;
use super::pattern_classifier::PatternClassifier;
use super::reasoning_engine::ReasoningEngine;
use super::similarity_engine::SimilarityEngine;

/// Tuning for every engine the facade composes. The learning crate
/// derives adjusted copies of these from verified-outcome history.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerConfig {
    pub similarity: SimilarityConfig,
    pub pattern: PatternConfig,
    pub anomaly: AnomalyConfig,
    pub reasoning: ReasoningConfig,
}

/// Everything one analysis pass produced for a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub case_id: CaseId,
    pub matches: Vec<CaseMatch>,
    pub patterns: PatternReport,
    pub anomalies: Vec<Anomaly>,
    pub hypotheses: Vec<Hypothesis>,
    pub chain: ReasoningChain,
    pub analyzed_at: DateTime<Utc>,
}

pub struct CaseAnalyzer {
    similarity: SimilarityEngine,
    classifier: PatternClassifier,
    detector: AnomalyDetector,
    generator: HypothesisGenerator,
    reasoning: ReasoningEngine,
    event_bus: EventBus,
}

impl CaseAnalyzer {
    pub fn new(
        text_generator: Arc<dyn TextGenerator>,
        chain_store: Arc<dyn ChainStore>,
        event_bus: EventBus,
        config: AnalyzerConfig,
    ) -> Result<Self> {
        Ok(Self {
            similarity: SimilarityEngine::new(config.similarity.clone()),
            classifier: PatternClassifier::new(config.similarity, config.pattern),
            detector: AnomalyDetector::new(config.anomaly),
            generator: HypothesisGenerator::new(),
            reasoning: ReasoningEngine::new(
                text_generator,
                chain_store,
                event_bus.clone(),
                config.reasoning,
            )?,
            event_bus,
        })
    }

    /// Run the full analysis pass for one case against a corpus.
    ///
    /// The deterministic engines run first; the reasoning pipeline runs
    /// last so it can fold their output into its prompts via the corpus.
    pub async fn analyze(&self, case: &CaseRecord, corpus: &[CaseRecord]) -> AnalysisReport {
        counter!("coldtrail_analyses_total").increment(1);
        info!(case_id = %case.id, corpus_size = corpus.len(), "Starting case analysis");
        self.event_bus.publish(AnalysisEvent::AnalysisStarted {
            case_id: case.id.clone(),
            corpus_size: corpus.len(),
            timestamp: Utc::now(),
        });

        let matches = self.similarity.find_matches(case, corpus);
        self.event_bus.publish(AnalysisEvent::SimilarityScored {
            case_id: case.id.clone(),
            matches: matches.len(),
            timestamp: Utc::now(),
        });

        let patterns = self.classifier.classify(case, corpus);
        self.event_bus.publish(AnalysisEvent::PatternsClassified {
            case_id: case.id.clone(),
            patterns: patterns.patterns.len(),
            serial_offender_probability: patterns.serial_offender_probability,
            timestamp: Utc::now(),
        });

        let anomalies = self.detector.detect(case);
        self.event_bus.publish(AnalysisEvent::AnomaliesDetected {
            case_id: case.id.clone(),
            anomalies: anomalies.len(),
            timestamp: Utc::now(),
        });

        let hypotheses = self.generator.generate(case, corpus);
        self.event_bus.publish(AnalysisEvent::HypothesesGenerated {
            case_id: case.id.clone(),
            hypotheses: hypotheses.len(),
            timestamp: Utc::now(),
        });

        let chain = self.reasoning.reason_through_case(case, corpus).await;

        info!(
            case_id = %case.id,
            matches = matches.len(),
            patterns = patterns.patterns.len(),
            anomalies = anomalies.len(),
            hypotheses = hypotheses.len(),
            chain_quality = chain.quality,
            "Case analysis finished"
        );

        AnalysisReport {
            case_id: case.id.clone(),
            matches,
            patterns,
            anomalies,
            hypotheses,
            chain,
            analyzed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EvidenceCategory, EvidenceId, EvidenceItem, GenerationError, Priority};
    use crate::infrastructure::chain_cache::LruChainStore;
    use async_trait::async_trait;

    struct FixedGenerator(String);

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _system: Option<&str>,
        ) -> Result<String, GenerationError> {
            Ok(self.0.clone())
        }

        async fn health_check(&self) -> Result<(), GenerationError> {
            Ok(())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn evidence(id: &str, category: EvidenceCategory, description: &str) -> EvidenceItem {
        EvidenceItem {
            id: EvidenceId::new(id),
            category,
            description: description.to_string(),
            date: None,
            confidence: None,
        }
    }

    fn robbery_case(id: &str, day: u32) -> CaseRecord {
        CaseRecord {
            id: CaseId::new(id),
            title: format!("Convenience store robbery {id}"),
            narrative: "Masked suspect robbed the clerk at knife point and fled on foot"
                .to_string(),
            date: chrono::NaiveDate::from_ymd_opt(2023, 6, day),
            jurisdiction: Some("Springfield, IL".to_string()),
            priority: Priority::High,
            evidence: vec![
                evidence("ev-1", EvidenceCategory::WitnessStatement, "Clerk described a masked man"),
                evidence("ev-2", EvidenceCategory::Video, "Parking lot camera footage"),
                evidence("ev-3", EvidenceCategory::Forensic, "Partial print on the counter"),
            ],
        }
    }

    fn analyzer(event_bus: EventBus) -> CaseAnalyzer {
        CaseAnalyzer::new(
            Arc::new(FixedGenerator("1. The robbery was likely planned in advance.".to_string())),
            Arc::new(LruChainStore::default()),
            event_bus,
            AnalyzerConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn analyze_produces_a_complete_report() {
        let analyzer = analyzer(EventBus::new(256));
        let target = robbery_case("case-1", 1);
        let corpus = vec![robbery_case("case-2", 10), robbery_case("case-3", 20)];

        let report = analyzer.analyze(&target, &corpus).await;

        assert_eq!(report.case_id, target.id);
        assert!(!report.matches.is_empty(), "near-identical cases should match");
        assert!(!report.hypotheses.is_empty());
        assert!(report.chain.is_completed());
        assert!(!report.chain.steps.is_empty());
    }

    #[tokio::test]
    async fn analyze_publishes_the_stage_events_in_order() {
        let bus = EventBus::new(256);
        let mut receiver = bus.subscribe();
        let analyzer = analyzer(bus);
        let target = robbery_case("case-1", 1);

        analyzer.analyze(&target, &[]).await;

        let mut types = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            types.push(event.event_type());
        }
        let engine_events: Vec<&str> = types
            .iter()
            .copied()
            .filter(|t| !matches!(*t, "stage_completed" | "chain_completed"))
            .collect();
        assert_eq!(
            engine_events,
            vec![
                "analysis_started",
                "similarity_scored",
                "patterns_classified",
                "anomalies_detected",
                "hypotheses_generated",
            ]
        );
        assert!(types.contains(&"chain_completed"));
    }

    #[tokio::test]
    async fn repeat_analysis_reuses_the_cached_chain() {
        let bus = EventBus::new(256);
        let analyzer = analyzer(bus.clone());
        let target = robbery_case("case-1", 1);

        let first = analyzer.analyze(&target, &[]).await;
        let mut receiver = bus.subscribe();
        let second = analyzer.analyze(&target, &[]).await;

        assert_eq!(first.chain.steps.len(), second.chain.steps.len());
        let mut saw_cache_hit = false;
        while let Ok(event) = receiver.try_recv() {
            if event.event_type() == "chain_cache_hit" {
                saw_cache_hit = true;
            }
        }
        assert!(saw_cache_hit);
    }

    #[test]
    fn report_round_trips_through_serde() {
        let report = AnalysisReport {
            case_id: CaseId::new("case-1"),
            matches: vec![],
            patterns: PatternReport {
                patterns: vec![],
                serial_offender_probability: 40,
                recommendations: vec![],
            },
            anomalies: vec![],
            hypotheses: vec![],
            chain: ReasoningChain::new(CaseId::new("case-1")),
            analyzed_at: Utc::now(),
        };

        let json = serde_json::to_string(&report).unwrap();
        let parsed: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.case_id, report.case_id);
    }
}
