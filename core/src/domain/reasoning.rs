// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! Reasoning Chains
//!
//! The chain-of-thought record built by the reasoning engine: ordered
//! steps, per-stage outcomes, self-reflection, conclusions, and the
//! explicit pipeline state machine.
//!
//! # Pipeline
//!
//! Stages run in a fixed order: Observation → EvidenceInference →
//! PatternHypothesis → HypothesisGeneration → Validation → Reflection →
//! Correction → Conclusion. Validation, reflection, and correction can be
//! disabled by configuration; correction additionally runs only when
//! reflection surfaced at least one weakness. Steps are append-only, so a
//! completed chain is an auditable transcript.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Chain-of-thought value objects and pipeline states

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::case::CaseId;

/// One stage of the reasoning pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningStage {
    Observation,
    EvidenceInference,
    PatternHypothesis,
    HypothesisGeneration,
    Validation,
    Reflection,
    Correction,
    Conclusion,
}

impl ReasoningStage {
    /// All stages in pipeline order
    pub const ALL: [ReasoningStage; 8] = [
        ReasoningStage::Observation,
        ReasoningStage::EvidenceInference,
        ReasoningStage::PatternHypothesis,
        ReasoningStage::HypothesisGeneration,
        ReasoningStage::Validation,
        ReasoningStage::Reflection,
        ReasoningStage::Correction,
        ReasoningStage::Conclusion,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ReasoningStage::Observation => "observation",
            ReasoningStage::EvidenceInference => "evidence_inference",
            ReasoningStage::PatternHypothesis => "pattern_hypothesis",
            ReasoningStage::HypothesisGeneration => "hypothesis_generation",
            ReasoningStage::Validation => "validation",
            ReasoningStage::Reflection => "reflection",
            ReasoningStage::Correction => "correction",
            ReasoningStage::Conclusion => "conclusion",
        }
    }
}

impl std::fmt::Display for ReasoningStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The type of an individual reasoning step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Observation,
    Inference,
    Hypothesis,
    Validation,
    Reflection,
    Conclusion,
}

impl StepKind {
    pub fn label(&self) -> &'static str {
        match self {
            StepKind::Observation => "observation",
            StepKind::Inference => "inference",
            StepKind::Hypothesis => "hypothesis",
            StepKind::Validation => "validation",
            StepKind::Reflection => "reflection",
            StepKind::Conclusion => "conclusion",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Pass/fail verdict written back by the validation stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub passed: bool,
    pub reason: String,
}

/// One entry in the chain-of-thought transcript.
/// Numbers are strictly increasing from 1 across the whole chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub number: u32,
    pub kind: StepKind,
    pub content: String,
    /// Evidence tokens referenced in the text, e.g. "evidence A12"
    pub evidence_refs: Vec<String>,
    /// Integer confidence in [0,100]
    pub confidence: u8,
    pub validation: Option<ValidationVerdict>,
}

/// Coarse confidence band reported by the reflection stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

/// Self-assessment produced by the reflection stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfReflection {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub improvements: Vec<String>,
    pub confidence_level: ConfidenceLevel,
}

impl Default for SelfReflection {
    fn default() -> Self {
        Self {
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            improvements: Vec::new(),
            confidence_level: ConfidenceLevel::Medium,
        }
    }
}

/// How a stage resolved.
///
/// Distinguishes "the generator said nothing useful" from "the parser
/// found no steps in a non-empty reply" from "the generation call itself
/// failed", so degraded chains can be diagnosed from their reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageOutcome {
    /// The reply parsed into at least one step (or list item)
    Parsed { items: usize },
    /// The generator returned an empty or whitespace-only reply
    EmptyReply,
    /// The reply was non-empty but yielded no usable items
    ParseFailed,
    /// The generation call returned an error
    GenerationFailed { reason: String },
    /// The stage was disabled or its precondition did not hold
    Skipped,
}

/// Per-stage record attached to a completed chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: ReasoningStage,
    pub outcome: StageOutcome,
}

/// Pipeline state for one chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChainState {
    Created,
    InProgress { stage: ReasoningStage },
    Completed,
}

/// The full chain-of-thought record for one case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningChain {
    pub case_id: CaseId,
    pub state: ChainState,
    pub steps: Vec<ReasoningStep>,
    /// Rounded mean of step confidences, 0 for an empty chain
    pub overall_confidence: u8,
    /// Quality score in [0,10]
    pub quality: u8,
    /// Final conclusions, at most 8
    pub conclusions: Vec<String>,
    pub reflection: SelfReflection,
    /// True iff quality >= 8
    pub validated: bool,
    pub stage_reports: Vec<StageReport>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ReasoningChain {
    pub fn new(case_id: CaseId) -> Self {
        Self {
            case_id,
            state: ChainState::Created,
            steps: Vec::new(),
            overall_confidence: 0,
            quality: 0,
            conclusions: Vec::new(),
            reflection: SelfReflection::default(),
            validated: false,
            stage_reports: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Number the next appended step must carry
    pub fn next_step_number(&self) -> u32 {
        self.steps.len() as u32 + 1
    }

    pub fn is_completed(&self) -> bool {
        self.state == ChainState::Completed
    }
}

/// Knobs for the reasoning pipeline
#[derive(Debug, Clone)]
pub struct ReasoningConfig {
    /// Parser cap on steps accepted from a single stage reply
    pub max_steps_per_stage: usize,

    /// Run the validation stage
    pub require_validation: bool,

    /// Run the self-reflection stage
    pub enable_reflection: bool,

    /// Run the self-correction stage (still gated on weaknesses)
    pub enable_correction: bool,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            max_steps_per_stage: 15,
            require_validation: true,
            enable_reflection: true,
            enable_correction: true,
        }
    }
}
