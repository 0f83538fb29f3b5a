// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! # ImprovementService — Self-Improvement Controller
//!
//! Turns learning metrics into an [`ImprovementStrategy`]: the first pass
//! builds an initial strategy from the current mistake profile and
//! average accuracy, later passes refine the persisted strategy from the
//! improvement trend and accumulate "Avoid" rules for repeated mistakes.
//!
//! The strategy wires back into the analysis engines through
//! [`tuned_configs`](ImprovementService::tuned_configs): confidence
//! threshold into the serial confidence floor, pattern weight into the
//! narrative factor weight, anomaly sensitivity into the detector.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use coldtrail_core::application::AnalyzerConfig;
use coldtrail_core::domain::{CaseRecord, TextGenerator};

use crate::application::EventBus;
use crate::domain::{ImprovementConfig, ImprovementStrategy, LearningEvent, LearningMetrics};

/// Maximum generation-backed insights returned per case
const MAX_ENHANCED_INSIGHTS: usize = 8;

const ENHANCED_SYSTEM_PROMPT: &str = "You are an AI detective that learns from mistakes and \
     continuously improves. Provide concise, accurate insights.";

static LIST_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\d+\.|[-*])\s*").unwrap());

/// Derives and refines the analysis tuning from verified-outcome history
pub struct ImprovementService {
    strategy: RwLock<Option<ImprovementStrategy>>,
    config: ImprovementConfig,
    event_bus: Arc<dyn EventBus>,
}

impl ImprovementService {
    pub fn new(config: ImprovementConfig, event_bus: Arc<dyn EventBus>) -> Self {
        Self { strategy: RwLock::new(None), config, event_bus }
    }

    /// Produce the strategy for the given metrics: refine the persisted
    /// strategy when one exists and outcomes have been verified, build
    /// the initial strategy otherwise. The result is persisted for the
    /// next pass.
    pub async fn strategy_for(&self, metrics: &LearningMetrics) -> Result<ImprovementStrategy> {
        let mut current = self.strategy.write().await;

        let next = match current.as_ref() {
            Some(existing) if metrics.verified_cases > 0 => {
                refine_strategy(existing, metrics, self.config.trend_window)
            }
            _ => initial_strategy(metrics),
        };

        info!(
            confidence_threshold = next.confidence_threshold,
            pattern_matching_weight = next.pattern_matching_weight,
            focus_areas = next.focus_areas.len(),
            learned_rules = next.learned_rules.len(),
            "Adjusted improvement strategy"
        );
        self.event_bus
            .publish(LearningEvent::StrategyAdjusted {
                confidence_threshold: next.confidence_threshold,
                focus_areas: next.focus_areas.len(),
                learned_rules: next.learned_rules.len(),
                timestamp: Utc::now(),
            })
            .await?;

        *current = Some(next.clone());
        Ok(next)
    }

    pub async fn current_strategy(&self) -> Option<ImprovementStrategy> {
        self.strategy.read().await.clone()
    }

    pub fn target_accuracy(&self) -> u8 {
        self.config.target_accuracy
    }

    /// Progress toward the target accuracy, capped at 100
    pub fn progress_to_target(&self, metrics: &LearningMetrics) -> u8 {
        let ratio = metrics.average_accuracy as f64 / self.config.target_accuracy as f64;
        ((ratio * 100.0).round() as u32).min(100) as u8
    }

    /// Analysis configs with the strategy's adjustments applied
    pub fn tuned_configs(&self, strategy: &ImprovementStrategy) -> AnalyzerConfig {
        let mut config = AnalyzerConfig::default();
        config.pattern.serial_confidence_floor = strategy.confidence_threshold;
        config.similarity.narrative_weight = strategy.pattern_matching_weight;
        config.anomaly.sensitivity = strategy.anomaly_sensitivity;
        config
    }

    /// Generation-backed insights incorporating the learning history.
    /// Generation failure is recoverable and yields an empty list.
    pub async fn enhanced_insights(
        &self,
        case: &CaseRecord,
        strategy: &ImprovementStrategy,
        learning_prompt: &str,
        generator: &dyn TextGenerator,
    ) -> Vec<String> {
        let date = case.date.map(|d| d.to_string()).unwrap_or_else(|| "unknown".to_string());
        let prompt = format!(
            "{learning_prompt}\n\n\
             Now analyze this case with your improved understanding:\n\n\
             Case: {}\n\
             Date: {date}\n\
             Description: {}\n\n\
             Focus Areas: {}\n\
             Learned Rules: {}\n\n\
             Provide 5-8 specific, actionable insights that incorporate your learning.",
            case.title,
            case.narrative,
            strategy.focus_areas.join(", "),
            strategy.learned_rules.join("; "),
        );

        match generator.generate(&prompt, Some(ENHANCED_SYSTEM_PROMPT)).await {
            Ok(reply) => {
                let insights = parse_insights(&reply);
                debug!(case_id = %case.id, insights = insights.len(), "Generated enhanced insights");
                insights
            }
            Err(e) => {
                warn!(case_id = %case.id, error = %e, "Enhanced insight generation failed");
                Vec::new()
            }
        }
    }
}

fn initial_strategy(metrics: &LearningMetrics) -> ImprovementStrategy {
    let mut strategy = ImprovementStrategy::default();

    if let Some(top) = metrics.common_mistakes.first() {
        if top.description.contains("Pattern") {
            strategy.pattern_matching_weight = 0.2;
            strategy.focus_areas.push("Improve pattern matching validation".to_string());
        }
        if top.description.contains("Timeline") {
            strategy.focus_areas.push("Enhance timeline analysis".to_string());
        }
        if top.description.contains("Evidence") {
            strategy.focus_areas.push("Improve evidence interpretation".to_string());
        }
    }

    if metrics.average_accuracy < 80 {
        strategy.confidence_threshold = 70;
    } else if metrics.average_accuracy > 90 {
        strategy.confidence_threshold = 50;
    }

    strategy
}

fn refine_strategy(
    current: &ImprovementStrategy,
    metrics: &LearningMetrics,
    trend_window: usize,
) -> ImprovementStrategy {
    let mut refined = current.clone();

    // Trend delta over the last three windowed entries: improving runs
    // can surface findings earlier, declining runs hold them back.
    let trend_start = metrics.improvement_trend.len().saturating_sub(trend_window);
    let trend = &metrics.improvement_trend[trend_start..];
    if trend.len() >= 3 {
        let recent = &trend[trend.len() - 3..];
        let delta = recent[2] as i32 - recent[0] as i32;
        if delta > 5 {
            refined.confidence_threshold = refined.confidence_threshold.saturating_sub(5).max(50);
        } else if delta < -5 {
            refined.confidence_threshold = (refined.confidence_threshold + 5).min(80);
        }
    }

    for mistake in &metrics.common_mistakes {
        if mistake.count >= 3 {
            let rule = format!("Avoid: {}", mistake.description);
            if !refined.learned_rules.contains(&rule) {
                refined.learned_rules.push(rule);
            }
        }
    }

    if metrics
        .common_mistakes
        .first()
        .is_some_and(|top| top.description.contains("Pattern"))
    {
        refined.pattern_matching_weight = 0.2;
    }

    refined
}

/// Numbered or bulleted lines with their markers stripped, at most 8
fn parse_insights(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| LIST_MARKER.is_match(line))
        .map(|line| LIST_MARKER.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .take(MAX_ENHANCED_INSIGHTS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CategoryAccuracy, CommonMistake};
    use async_trait::async_trait;
    use coldtrail_core::domain::{CaseId, GenerationError, Priority};
    use tokio::sync::Mutex;

    struct MockEventBus {
        events: Mutex<Vec<LearningEvent>>,
    }

    #[async_trait]
    impl EventBus for MockEventBus {
        async fn publish(&self, event: LearningEvent) -> Result<()> {
            self.events.lock().await.push(event);
            Ok(())
        }
    }

    struct FixedGenerator(Result<String, GenerationError>);

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _system: Option<&str>,
        ) -> Result<String, GenerationError> {
            match &self.0 {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(GenerationError::Network("unreachable".to_string())),
            }
        }

        async fn health_check(&self) -> Result<(), GenerationError> {
            Ok(())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn service() -> ImprovementService {
        ImprovementService::new(
            ImprovementConfig::default(),
            Arc::new(MockEventBus { events: Mutex::new(Vec::new()) }),
        )
    }

    fn metrics(average: u8, verified: usize) -> LearningMetrics {
        LearningMetrics {
            total_cases: verified,
            verified_cases: verified,
            average_accuracy: average,
            accuracy_by_category: CategoryAccuracy::default(),
            improvement_trend: Vec::new(),
            common_mistakes: Vec::new(),
        }
    }

    fn mistake(description: &str, count: u32) -> CommonMistake {
        CommonMistake {
            category: description.to_string(),
            description: description.to_string(),
            count,
        }
    }

    fn case() -> CaseRecord {
        CaseRecord {
            id: CaseId::new("case-1"),
            title: "Warehouse arson".to_string(),
            narrative: "Fire started in the loading bay overnight".to_string(),
            date: None,
            jurisdiction: None,
            priority: Priority::High,
            evidence: vec![],
        }
    }

    #[tokio::test]
    async fn test_first_pass_produces_defaults() {
        let service = service();
        let strategy = service.strategy_for(&metrics(85, 0)).await.unwrap();

        assert_eq!(strategy.confidence_threshold, 60);
        assert_eq!(strategy.pattern_matching_weight, 0.3);
        assert_eq!(strategy.anomaly_sensitivity, 0.7);
        assert!(service.current_strategy().await.is_some());
    }

    #[tokio::test]
    async fn test_low_accuracy_raises_the_threshold() {
        let service = service();
        let strategy = service.strategy_for(&metrics(70, 0)).await.unwrap();
        assert_eq!(strategy.confidence_threshold, 70);
    }

    #[tokio::test]
    async fn test_high_accuracy_lowers_the_threshold() {
        let service = service();
        let strategy = service.strategy_for(&metrics(95, 0)).await.unwrap();
        assert_eq!(strategy.confidence_threshold, 50);
    }

    #[tokio::test]
    async fn test_pattern_mistakes_shift_focus_and_weight() {
        let service = service();
        let mut with_mistakes = metrics(85, 0);
        with_mistakes.common_mistakes = vec![mistake("Pattern Matching Error", 4)];

        let strategy = service.strategy_for(&with_mistakes).await.unwrap();

        assert_eq!(strategy.pattern_matching_weight, 0.2);
        assert_eq!(strategy.focus_areas, vec!["Improve pattern matching validation".to_string()]);
    }

    #[tokio::test]
    async fn test_improving_trend_relaxes_the_threshold() {
        let service = service();
        service.strategy_for(&metrics(85, 0)).await.unwrap();

        let mut improving = metrics(85, 5);
        improving.improvement_trend = vec![70, 80, 90];

        let refined = service.strategy_for(&improving).await.unwrap();
        assert_eq!(refined.confidence_threshold, 55);
    }

    #[tokio::test]
    async fn test_threshold_floors_at_fifty_when_improving() {
        let service = service();
        service.strategy_for(&metrics(95, 0)).await.unwrap(); // threshold 50

        let mut improving = metrics(95, 5);
        improving.improvement_trend = vec![80, 90, 97];

        let refined = service.strategy_for(&improving).await.unwrap();
        assert_eq!(refined.confidence_threshold, 50);
    }

    #[tokio::test]
    async fn test_declining_trend_tightens_up_to_eighty() {
        let service = service();
        service.strategy_for(&metrics(70, 0)).await.unwrap(); // threshold 70

        let mut declining = metrics(70, 5);
        declining.improvement_trend = vec![80, 70, 60];
        let refined = service.strategy_for(&declining).await.unwrap();
        assert_eq!(refined.confidence_threshold, 75);

        let still_declining = {
            let mut m = metrics(60, 6);
            m.improvement_trend = vec![75, 65, 55];
            m
        };
        let again = service.strategy_for(&still_declining).await.unwrap();
        assert_eq!(again.confidence_threshold, 80, "caps at 80");
    }

    #[tokio::test]
    async fn test_repeated_mistakes_become_rules_once() {
        let service = service();
        service.strategy_for(&metrics(85, 0)).await.unwrap();

        let mut with_mistakes = metrics(85, 5);
        with_mistakes.common_mistakes =
            vec![mistake("Timeline Error", 3), mistake("Witness Analysis Error", 2)];

        let refined = service.strategy_for(&with_mistakes).await.unwrap();
        assert_eq!(refined.learned_rules, vec!["Avoid: Timeline Error".to_string()]);

        // A second refinement with the same mistakes does not duplicate.
        let again = service.strategy_for(&with_mistakes).await.unwrap();
        assert_eq!(again.learned_rules.len(), 1);
    }

    #[tokio::test]
    async fn test_tuned_configs_wire_strategy_into_engines() {
        let service = service();
        let strategy = ImprovementStrategy {
            confidence_threshold: 70,
            pattern_matching_weight: 0.2,
            anomaly_sensitivity: 0.9,
            focus_areas: vec![],
            learned_rules: vec![],
        };

        let config = service.tuned_configs(&strategy);

        assert_eq!(config.pattern.serial_confidence_floor, 70);
        assert_eq!(config.similarity.narrative_weight, 0.2);
        assert_eq!(config.anomaly.sensitivity, 0.9);
    }

    #[test]
    fn test_progress_to_target_caps_at_one_hundred() {
        let service = service();
        assert_eq!(service.target_accuracy(), 95);
        assert_eq!(service.progress_to_target(&metrics(76, 5)), 80);
        assert_eq!(service.progress_to_target(&metrics(100, 5)), 100);
    }

    #[tokio::test]
    async fn test_enhanced_insights_parse_numbered_lines() {
        let service = service();
        let reply = "1. Revisit the loading bay access logs\n\
                     2. tiny\n\
                     - Interview the night security contractor\n\
                     Narrative text without a marker";
        let generator = FixedGenerator(Ok(reply.to_string()));

        let insights = service
            .enhanced_insights(&case(), &ImprovementStrategy::default(), "prompt", &generator)
            .await;

        assert_eq!(
            insights,
            vec![
                "Revisit the loading bay access logs".to_string(),
                "tiny".to_string(),
                "Interview the night security contractor".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_enhanced_insights_survive_generation_failure() {
        let service = service();
        let generator = FixedGenerator(Err(GenerationError::Network("down".to_string())));

        let insights = service
            .enhanced_insights(&case(), &ImprovementStrategy::default(), "prompt", &generator)
            .await;

        assert!(insights.is_empty());
    }
}
