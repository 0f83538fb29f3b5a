// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! # ReasoningEngine — Chain-of-Thought Pipeline
//!
//! Runs a fixed sequence of reasoning stages over an injected
//! [`TextGenerator`], accumulating an append-only transcript:
//! observations, evidence inferences, pattern and lead hypotheses,
//! validation of earlier steps, self-reflection, self-correction, and
//! final conclusions. Each stage's prompt embeds the transcript of all
//! prior steps, so later stages reason over earlier output.
//!
//! ## Degradation
//!
//! A generation failure, empty reply, or unparsable reply degrades that
//! one stage to zero steps and records a [`StageOutcome`]; the pipeline
//! never aborts. A chain where every stage degraded still completes with
//! confidence 0, quality 0, and `validated == false`.
//!
//! ## Caching
//!
//! Completed chains are cached in the injected [`ChainStore`] keyed by
//! case id. Concurrent analyses of the same case id are not deduplicated;
//! both run the pipeline and the later write wins.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::domain::{
    AnalysisEvent, CaseRecord, ChainState, ConfidenceLevel, ReasoningChain, ReasoningConfig,
    ReasoningStage, ReasoningStep, SelfReflection, StageOutcome, StageReport, StepKind,
    TextGenerator, ValidationVerdict,
};
use crate::infrastructure::chain_cache::ChainStore;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::prompts::{PromptContext, PromptLibrary};

/// Steps below this confidence are candidates for self-correction.
const WEAK_STEP_CONFIDENCE: u8 = 70;

/// Maximum number of final conclusions kept on a chain.
const MAX_CONCLUSIONS: usize = 8;

/// Corpus cases summarized in the pattern-hypothesis prompt.
const SIMILAR_CASE_SAMPLE: usize = 5;

static LIST_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\d+\.|[-*])\s*").unwrap());
static INLINE_CONFIDENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)%?\s*(?:confidence|confident)").unwrap());
static EVIDENCE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)evidence\s+[A-Z0-9]+").unwrap());
static STEP_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)step\s+(\d+)").unwrap());

/// Drives the chain-of-thought pipeline for one case at a time.
pub struct ReasoningEngine {
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn ChainStore>,
    event_bus: EventBus,
    prompts: PromptLibrary,
    config: ReasoningConfig,
}

/// How one generation call resolved, before parsing.
enum StageReply {
    Text(String),
    Empty,
    Failed(String),
}

impl ReasoningEngine {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn ChainStore>,
        event_bus: EventBus,
        config: ReasoningConfig,
    ) -> Result<Self> {
        Ok(Self { generator, store, event_bus, prompts: PromptLibrary::new()?, config })
    }

    pub fn config(&self) -> &ReasoningConfig {
        &self.config
    }

    /// Reason through one case, returning the cached chain when one
    /// exists. The returned chain is always in the `Completed` state.
    pub async fn reason_through_case(
        &self,
        case: &CaseRecord,
        corpus: &[CaseRecord],
    ) -> ReasoningChain {
        if let Some(cached) = self.store.get(&case.id) {
            counter!("coldtrail_chain_cache_hits_total").increment(1);
            debug!(case_id = %case.id, "Serving cached reasoning chain");
            self.event_bus.publish(AnalysisEvent::ChainCacheHit {
                case_id: case.id.clone(),
                timestamp: Utc::now(),
            });
            return cached;
        }
        counter!("coldtrail_chain_cache_misses_total").increment(1);

        info!(case_id = %case.id, generator = self.generator.name(), "Starting reasoning chain");
        let mut chain = ReasoningChain::new(case.id.clone());

        self.run_observation(&mut chain, case).await;
        self.run_evidence_inference(&mut chain, case).await;
        self.run_pattern_hypothesis(&mut chain, case, corpus).await;
        self.run_hypothesis_generation(&mut chain).await;
        self.run_validation(&mut chain).await;
        self.run_reflection(&mut chain).await;
        self.run_correction(&mut chain).await;
        self.run_conclusion(&mut chain).await;

        chain.overall_confidence = overall_confidence(&chain.steps);
        chain.quality = score_quality(&chain);
        chain.validated = chain.quality >= 8;
        chain.state = ChainState::Completed;
        chain.completed_at = Some(Utc::now());

        info!(
            case_id = %case.id,
            steps = chain.steps.len(),
            overall_confidence = chain.overall_confidence,
            quality = chain.quality,
            validated = chain.validated,
            "Reasoning chain completed"
        );
        self.event_bus.publish(AnalysisEvent::ChainCompleted {
            case_id: case.id.clone(),
            steps: chain.steps.len(),
            overall_confidence: chain.overall_confidence,
            quality: chain.quality,
            validated: chain.validated,
            timestamp: Utc::now(),
        });

        self.store.put(chain.clone());
        chain
    }

    async fn run_observation(&self, chain: &mut ReasoningChain, case: &CaseRecord) {
        let stage = ReasoningStage::Observation;
        chain.state = ChainState::InProgress { stage };

        let context = PromptContext::new()
            .title(&case.title)
            .date(case.date.map(|d| d.to_string()).unwrap_or_else(|| "unknown".to_string()))
            .description(&case.narrative)
            .evidence_count(case.evidence.len());

        let reply = self.request(stage, &context).await;
        let outcome = self.ingest_steps(chain, reply, StepKind::Observation);
        self.finish_stage(chain, stage, outcome);
    }

    async fn run_evidence_inference(&self, chain: &mut ReasoningChain, case: &CaseRecord) {
        let stage = ReasoningStage::EvidenceInference;
        chain.state = ChainState::InProgress { stage };

        let evidence_summary = case
            .evidence
            .iter()
            .map(|e| format!("- {}: {}", e.category, e.description))
            .collect::<Vec<_>>()
            .join("\n");
        let context = PromptContext::new()
            .observations(kind_transcript(&chain.steps))
            .evidence_summary(evidence_summary);

        let reply = self.request(stage, &context).await;
        let outcome = self.ingest_steps(chain, reply, StepKind::Inference);
        self.finish_stage(chain, stage, outcome);
    }

    async fn run_pattern_hypothesis(
        &self,
        chain: &mut ReasoningChain,
        case: &CaseRecord,
        corpus: &[CaseRecord],
    ) {
        let stage = ReasoningStage::PatternHypothesis;
        chain.state = ChainState::InProgress { stage };

        let case_context = chain
            .steps
            .iter()
            .filter(|s| matches!(s.kind, StepKind::Observation | StepKind::Inference))
            .map(|s| s.content.clone())
            .collect::<Vec<_>>()
            .join("\n");
        let similar_cases = corpus
            .iter()
            .filter(|other| other.id != case.id)
            .take(SIMILAR_CASE_SAMPLE)
            .map(|other| {
                let date = other.date.map(|d| d.to_string()).unwrap_or_else(|| "undated".into());
                format!("- {} ({})", other.title, date)
            })
            .collect::<Vec<_>>()
            .join("\n");
        let context =
            PromptContext::new().case_context(case_context).similar_cases(similar_cases);

        let reply = self.request(stage, &context).await;
        let outcome = self.ingest_steps(chain, reply, StepKind::Hypothesis);
        self.finish_stage(chain, stage, outcome);
    }

    async fn run_hypothesis_generation(&self, chain: &mut ReasoningChain) {
        let stage = ReasoningStage::HypothesisGeneration;
        chain.state = ChainState::InProgress { stage };

        let context = PromptContext::new().chain_summary(numbered_transcript(&chain.steps));

        let reply = self.request(stage, &context).await;
        let outcome = self.ingest_steps(chain, reply, StepKind::Hypothesis);
        self.finish_stage(chain, stage, outcome);
    }

    /// Validation appends its own steps and writes pass/fail verdicts
    /// back onto the steps it references; it never edits their content.
    async fn run_validation(&self, chain: &mut ReasoningChain) {
        let stage = ReasoningStage::Validation;
        chain.state = ChainState::InProgress { stage };

        if !self.config.require_validation {
            self.finish_stage(chain, stage, StageOutcome::Skipped);
            return;
        }

        let context = PromptContext::new().chain_summary(confidence_transcript(&chain.steps));
        let reply = self.request(stage, &context).await;

        let prior_steps = chain.steps.len();
        let outcome = self.ingest_steps(chain, reply, StepKind::Validation);

        if matches!(outcome, StageOutcome::Parsed { .. }) {
            let verdicts: Vec<(usize, ValidationVerdict)> = chain.steps[prior_steps..]
                .iter()
                .filter_map(|v| {
                    let referenced = referenced_step(&v.content)?;
                    if referenced == 0 || referenced > prior_steps {
                        return None;
                    }
                    let lower = v.content.to_lowercase();
                    Some((
                        referenced - 1,
                        ValidationVerdict {
                            passed: !lower.contains("invalid") && !lower.contains("error"),
                            reason: v.content.clone(),
                        },
                    ))
                })
                .collect();
            for (index, verdict) in verdicts {
                chain.steps[index].validation = Some(verdict);
            }
        }
        self.finish_stage(chain, stage, outcome);
    }

    async fn run_reflection(&self, chain: &mut ReasoningChain) {
        let stage = ReasoningStage::Reflection;
        chain.state = ChainState::InProgress { stage };

        if !self.config.enable_reflection {
            self.finish_stage(chain, stage, StageOutcome::Skipped);
            return;
        }

        let summary = chain
            .steps
            .iter()
            .map(|s| format!("{}: {} (Confidence: {}%)", s.kind, s.content, s.confidence))
            .collect::<Vec<_>>()
            .join("\n");
        let context = PromptContext::new().chain_summary(summary);

        let outcome = match self.request(stage, &context).await {
            StageReply::Empty => StageOutcome::EmptyReply,
            StageReply::Failed(reason) => StageOutcome::GenerationFailed { reason },
            StageReply::Text(text) => {
                let reflection = parse_reflection(&text);
                let items = reflection.strengths.len()
                    + reflection.weaknesses.len()
                    + reflection.improvements.len();
                chain.reflection = reflection;
                if items > 0 {
                    StageOutcome::Parsed { items }
                } else {
                    StageOutcome::ParseFailed
                }
            }
        };
        self.finish_stage(chain, stage, outcome);
    }

    /// Correction only runs when reflection surfaced a weakness. It
    /// appends fresh reflection-typed steps for the weak ones; the chain
    /// stays append-only and auditable.
    async fn run_correction(&self, chain: &mut ReasoningChain) {
        let stage = ReasoningStage::Correction;
        chain.state = ChainState::InProgress { stage };

        if !self.config.enable_correction || chain.reflection.weaknesses.is_empty() {
            self.finish_stage(chain, stage, StageOutcome::Skipped);
            return;
        }

        let weak_steps = chain
            .steps
            .iter()
            .filter(|s| is_weak(s))
            .map(|s| format!("Step {}: {}", s.number, s.content))
            .collect::<Vec<_>>()
            .join("\n");
        let context = PromptContext::new()
            .weaknesses(chain.reflection.weaknesses.join("\n"))
            .weak_steps(weak_steps);

        let reply = self.request(stage, &context).await;
        let outcome = self.ingest_steps(chain, reply, StepKind::Reflection);
        self.finish_stage(chain, stage, outcome);
    }

    async fn run_conclusion(&self, chain: &mut ReasoningChain) {
        let stage = ReasoningStage::Conclusion;
        chain.state = ChainState::InProgress { stage };

        let key_reasoning = chain
            .steps
            .iter()
            .filter(|s| matches!(s.kind, StepKind::Hypothesis | StepKind::Conclusion))
            .map(|s| s.content.clone())
            .collect::<Vec<_>>()
            .join("\n");
        let context = PromptContext::new().key_reasoning(key_reasoning);

        let outcome = match self.request(stage, &context).await {
            StageReply::Empty => StageOutcome::EmptyReply,
            StageReply::Failed(reason) => StageOutcome::GenerationFailed { reason },
            StageReply::Text(text) => {
                let conclusions: Vec<String> =
                    list_items(&text).into_iter().take(MAX_CONCLUSIONS).collect();
                if conclusions.is_empty() {
                    StageOutcome::ParseFailed
                } else {
                    let items = conclusions.len();
                    chain.conclusions = conclusions;
                    StageOutcome::Parsed { items }
                }
            }
        };
        self.finish_stage(chain, stage, outcome);
    }

    async fn request(&self, stage: ReasoningStage, context: &PromptContext) -> StageReply {
        let prompt = match self.prompts.render(stage, context) {
            Ok(prompt) => prompt,
            Err(e) => return StageReply::Failed(e.to_string()),
        };

        match self.generator.generate(&prompt, Some(PromptLibrary::system_prompt(stage))).await {
            Ok(text) if text.trim().is_empty() => StageReply::Empty,
            Ok(text) => StageReply::Text(text),
            Err(e) => {
                counter!("coldtrail_generation_failures_total").increment(1);
                warn!(stage = %stage, error = %e, "Generation failed; stage degrades to zero steps");
                StageReply::Failed(e.to_string())
            }
        }
    }

    fn ingest_steps(
        &self,
        chain: &mut ReasoningChain,
        reply: StageReply,
        kind: StepKind,
    ) -> StageOutcome {
        match reply {
            StageReply::Empty => StageOutcome::EmptyReply,
            StageReply::Failed(reason) => StageOutcome::GenerationFailed { reason },
            StageReply::Text(text) => {
                let steps = parse_steps(
                    &text,
                    kind,
                    chain.next_step_number(),
                    self.config.max_steps_per_stage,
                );
                if steps.is_empty() {
                    StageOutcome::ParseFailed
                } else {
                    let items = steps.len();
                    chain.steps.extend(steps);
                    StageOutcome::Parsed { items }
                }
            }
        }
    }

    fn finish_stage(&self, chain: &mut ReasoningChain, stage: ReasoningStage, outcome: StageOutcome) {
        debug!(case_id = %chain.case_id, stage = %stage, outcome = ?outcome, "Stage resolved");
        self.event_bus.publish(AnalysisEvent::StageCompleted {
            case_id: chain.case_id.clone(),
            stage,
            outcome: outcome.clone(),
            timestamp: Utc::now(),
        });
        chain.stage_reports.push(StageReport { stage, outcome });
    }
}

fn is_weak(step: &ReasoningStep) -> bool {
    step.confidence < WEAK_STEP_CONFIDENCE
        || step.validation.as_ref().map(|v| !v.passed).unwrap_or(true)
}

/// `kind: content` per step, for the evidence-inference prompt.
fn kind_transcript(steps: &[ReasoningStep]) -> String {
    steps.iter().map(|s| format!("{}: {}", s.kind, s.content)).collect::<Vec<_>>().join("\n")
}

/// `Step N (kind): content` per step, for the hypothesis prompt.
fn numbered_transcript(steps: &[ReasoningStep]) -> String {
    steps
        .iter()
        .map(|s| format!("Step {} ({}): {}", s.number, s.kind, s.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `Step N: content (Confidence: C%)` per step, for the validation prompt.
fn confidence_transcript(steps: &[ReasoningStep]) -> String {
    steps
        .iter()
        .map(|s| format!("Step {}: {} (Confidence: {}%)", s.number, s.content, s.confidence))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Numbered or bulleted lines with their markers stripped.
fn list_items(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| LIST_MARKER.is_match(line))
        .map(|line| LIST_MARKER.replace(line, "").trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Parse a free-text stage reply into steps numbered from `start`.
/// Items of 10 characters or fewer are treated as noise and dropped.
fn parse_steps(reply: &str, kind: StepKind, start: u32, cap: usize) -> Vec<ReasoningStep> {
    list_items(reply)
        .into_iter()
        .filter(|content| content.len() > 10)
        .take(cap)
        .enumerate()
        .map(|(offset, content)| {
            let confidence = inline_confidence(&content).unwrap_or_else(|| estimate_confidence(&content));
            ReasoningStep {
                number: start + offset as u32,
                kind,
                evidence_refs: evidence_references(&content),
                confidence,
                content,
                validation: None,
            }
        })
        .collect()
}

/// Confidence stated inline, e.g. "85% confidence" or "confidence: 70".
fn inline_confidence(content: &str) -> Option<u8> {
    let captures = INLINE_CONFIDENCE.captures(content)?;
    let value: u32 = captures[1].parse().ok()?;
    Some(value.min(100) as u8)
}

/// Confidence estimated from hedging language when no percentage is given.
fn estimate_confidence(content: &str) -> u8 {
    let lower = content.to_lowercase();
    if lower.contains("certain") || lower.contains("definite") {
        90
    } else if lower.contains("likely") || lower.contains("probable") {
        75
    } else if lower.contains("possible") || lower.contains("might") {
        50
    } else if lower.contains("uncertain") || lower.contains("unclear") {
        30
    } else {
        60
    }
}

/// Evidence tokens like "evidence A12" mentioned in a step.
fn evidence_references(content: &str) -> Vec<String> {
    EVIDENCE_REF.find_iter(content).map(|m| m.as_str().trim().to_string()).collect()
}

/// The step number a validation line refers to, e.g. "Step 3 holds up".
fn referenced_step(content: &str) -> Option<usize> {
    STEP_REF.captures(content)?.get(1)?.as_str().parse().ok()
}

/// Split a reflection reply into keyword-bounded sections. Section
/// headers are non-list lines mentioning strengths/weaknesses/improve/
/// confidence; list items under a header land in that section.
fn parse_reflection(reply: &str) -> SelfReflection {
    #[derive(Clone, Copy)]
    enum Section {
        Strengths,
        Weaknesses,
        Improvements,
    }

    let mut reflection = SelfReflection::default();
    let mut current: Option<Section> = None;

    for line in reply.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let lower = trimmed.to_lowercase();

        if !LIST_MARKER.is_match(trimmed) {
            if lower.contains("strength") {
                current = Some(Section::Strengths);
            } else if lower.contains("weakness") {
                current = Some(Section::Weaknesses);
            } else if lower.contains("improve") {
                current = Some(Section::Improvements);
            } else if lower.contains("confidence") {
                if lower.contains("high") {
                    reflection.confidence_level = ConfidenceLevel::High;
                } else if lower.contains("low") {
                    reflection.confidence_level = ConfidenceLevel::Low;
                }
                current = None;
            }
            continue;
        }

        let item = LIST_MARKER.replace(trimmed, "").trim().to_string();
        if item.len() <= 5 {
            continue;
        }
        match current {
            Some(Section::Strengths) => reflection.strengths.push(item),
            Some(Section::Weaknesses) => reflection.weaknesses.push(item),
            Some(Section::Improvements) => reflection.improvements.push(item),
            None => {}
        }
    }

    reflection
}

/// Rounded mean of step confidences, 0 for an empty chain.
fn overall_confidence(steps: &[ReasoningStep]) -> u8 {
    if steps.is_empty() {
        return 0;
    }
    let sum: u32 = steps.iter().map(|s| s.confidence as u32).sum();
    ((sum as f64 / steps.len() as f64).round() as u32).min(100) as u8
}

/// Quality in [0,10]: five 0-2 sub-scores for step count, validation
/// pass ratio, reflection coverage, confidence variance, and conclusion
/// count. Ratio and variance score 0 on an empty chain.
fn score_quality(chain: &ReasoningChain) -> u8 {
    let mut score = 0u8;
    let count = chain.steps.len();

    if count >= 10 {
        score += 2;
    } else if count >= 5 {
        score += 1;
    }

    if count > 0 {
        let passed = chain
            .steps
            .iter()
            .filter(|s| s.validation.as_ref().is_some_and(|v| v.passed))
            .count();
        let ratio = passed as f64 / count as f64;
        if ratio >= 0.8 {
            score += 2;
        } else if ratio >= 0.5 {
            score += 1;
        }

        let mean =
            chain.steps.iter().map(|s| s.confidence as f64).sum::<f64>() / count as f64;
        let variance = chain
            .steps
            .iter()
            .map(|s| (s.confidence as f64 - mean).powi(2))
            .sum::<f64>()
            / count as f64;
        if variance < 100.0 {
            score += 2;
        } else if variance < 200.0 {
            score += 1;
        }
    }

    let reflection = &chain.reflection;
    if !reflection.strengths.is_empty() && !reflection.weaknesses.is_empty() {
        score += 2;
    } else if !reflection.strengths.is_empty() || !reflection.weaknesses.is_empty() {
        score += 1;
    }

    if chain.conclusions.len() >= 5 {
        score += 2;
    } else if chain.conclusions.len() >= 3 {
        score += 1;
    }

    score.min(10)
}
