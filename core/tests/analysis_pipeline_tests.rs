// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the full analysis pipeline: the CaseAnalyzer
//! facade driving all five engines, chain caching, and graceful
//! degradation when the text generator yields nothing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use coldtrail_core::application::{AnalyzerConfig, CaseAnalyzer};
use coldtrail_core::domain::{
    CaseId, CaseRecord, EvidenceCategory, EvidenceId, EvidenceItem, GenerationError, Priority,
    TextGenerator,
};
use coldtrail_core::infrastructure::chain_cache::{ChainStore, LruChainStore};
use coldtrail_core::infrastructure::event_bus::EventBus;

struct CountingGenerator {
    reply: String,
    calls: AtomicUsize,
}

impl CountingGenerator {
    fn new(reply: &str) -> Self {
        Self { reply: reply.to_string(), calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl TextGenerator for CountingGenerator {
    async fn generate(&self, _prompt: &str, _system: Option<&str>) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    async fn health_check(&self) -> Result<(), GenerationError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

fn burglary_case(id: &str, day: u32) -> CaseRecord {
    CaseRecord {
        id: CaseId::new(id),
        title: format!("Residential burglary {id}"),
        narrative: "Intruder forced the rear entry while the residents were away, \
                    a witness saw a man leaving through the yard"
            .to_string(),
        date: NaiveDate::from_ymd_opt(2023, 7, day),
        jurisdiction: Some("Springfield, IL".to_string()),
        priority: Priority::Medium,
        evidence: vec![
            EvidenceItem {
                id: EvidenceId::new(format!("{id}-ev-1")),
                category: EvidenceCategory::WitnessStatement,
                description: "Neighbor saw a man in dark clothing".to_string(),
                date: None,
                confidence: None,
            },
            EvidenceItem {
                id: EvidenceId::new(format!("{id}-ev-2")),
                category: EvidenceCategory::Forensic,
                description: "Pry marks on the rear door frame".to_string(),
                date: None,
                confidence: None,
            },
            EvidenceItem {
                id: EvidenceId::new(format!("{id}-ev-3")),
                category: EvidenceCategory::Physical,
                description: "Partial shoe print in the flower bed".to_string(),
                date: None,
                confidence: None,
            },
        ],
    }
}

#[tokio::test]
async fn empty_generator_still_completes_the_full_analysis() {
    let analyzer = CaseAnalyzer::new(
        Arc::new(CountingGenerator::new("")),
        Arc::new(LruChainStore::default()),
        EventBus::new(256),
        AnalyzerConfig::default(),
    )
    .unwrap();

    let target = burglary_case("case-1", 1);
    let corpus = vec![burglary_case("case-2", 8), burglary_case("case-3", 15)];

    let report = analyzer.analyze(&target, &corpus).await;

    // The deterministic engines still produce output.
    assert!(!report.matches.is_empty());
    assert!(!report.hypotheses.is_empty());

    // The reasoning chain degrades to an empty, unvalidated chain.
    assert!(report.chain.is_completed());
    assert!(report.chain.steps.is_empty());
    assert_eq!(report.chain.overall_confidence, 0);
    assert_eq!(report.chain.quality, 0);
    assert!(!report.chain.validated);
    assert_eq!(report.chain.stage_reports.len(), 8);
}

#[tokio::test]
async fn second_analysis_of_the_same_case_skips_generation() {
    let generator =
        Arc::new(CountingGenerator::new("1. The intruder likely scouted the house first."));
    let analyzer = CaseAnalyzer::new(
        Arc::clone(&generator) as Arc<dyn TextGenerator>,
        Arc::new(LruChainStore::default()),
        EventBus::new(256),
        AnalyzerConfig::default(),
    )
    .unwrap();

    let target = burglary_case("case-1", 1);

    let first = analyzer.analyze(&target, &[]).await;
    let calls_after_first = generator.calls.load(Ordering::SeqCst);
    assert!(calls_after_first > 0);

    let second = analyzer.analyze(&target, &[]).await;
    assert_eq!(generator.calls.load(Ordering::SeqCst), calls_after_first);
    assert_eq!(first.chain.steps.len(), second.chain.steps.len());
}

#[tokio::test]
async fn chain_cache_evicts_only_the_least_recently_used_entry() {
    let generator = Arc::new(CountingGenerator::new(""));
    let store = Arc::new(LruChainStore::new(50));
    let analyzer = CaseAnalyzer::new(
        generator,
        Arc::clone(&store) as Arc<dyn ChainStore>,
        EventBus::new(256),
        AnalyzerConfig::default(),
    )
    .unwrap();

    for i in 0..50 {
        analyzer.analyze(&burglary_case(&format!("case-{i:02}"), 1), &[]).await;
    }
    assert_eq!(store.len(), 50);

    analyzer.analyze(&burglary_case("case-50", 1), &[]).await;

    assert_eq!(store.len(), 50);
    assert!(store.get(&CaseId::new("case-00")).is_none(), "oldest entry evicted");
    assert!(store.get(&CaseId::new("case-01")).is_some());
    assert!(store.get(&CaseId::new("case-50")).is_some());
}
