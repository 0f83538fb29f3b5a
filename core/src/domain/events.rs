// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0

//! Domain events for the analysis bounded context
//! Published to the EventBus for observability and host integration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::case::CaseId;
use super::reasoning::{ReasoningStage, StageOutcome};

/// Analysis domain events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisEvent {
    /// A full case analysis began
    AnalysisStarted {
        case_id: CaseId,
        corpus_size: usize,
        timestamp: DateTime<Utc>,
    },

    /// The similarity engine finished ranking the corpus for a target
    SimilarityScored {
        case_id: CaseId,
        matches: usize,
        timestamp: DateTime<Utc>,
    },

    /// The pattern classifier finished deriving insights
    PatternsClassified {
        case_id: CaseId,
        patterns: usize,
        serial_offender_probability: u8,
        timestamp: DateTime<Utc>,
    },

    /// The anomaly detector finished scanning a case file
    AnomaliesDetected {
        case_id: CaseId,
        anomalies: usize,
        timestamp: DateTime<Utc>,
    },

    /// The hypothesis generator finished producing leads
    HypothesesGenerated {
        case_id: CaseId,
        hypotheses: usize,
        timestamp: DateTime<Utc>,
    },

    /// One reasoning stage resolved (including degraded outcomes)
    StageCompleted {
        case_id: CaseId,
        stage: ReasoningStage,
        outcome: StageOutcome,
        timestamp: DateTime<Utc>,
    },

    /// A reasoning chain reached its terminal state
    ChainCompleted {
        case_id: CaseId,
        steps: usize,
        overall_confidence: u8,
        quality: u8,
        validated: bool,
        timestamp: DateTime<Utc>,
    },

    /// A cached chain was served instead of re-running the pipeline
    ChainCacheHit {
        case_id: CaseId,
        timestamp: DateTime<Utc>,
    },
}

impl AnalysisEvent {
    /// Get the timestamp of the event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            AnalysisEvent::AnalysisStarted { timestamp, .. } => *timestamp,
            AnalysisEvent::SimilarityScored { timestamp, .. } => *timestamp,
            AnalysisEvent::PatternsClassified { timestamp, .. } => *timestamp,
            AnalysisEvent::AnomaliesDetected { timestamp, .. } => *timestamp,
            AnalysisEvent::HypothesesGenerated { timestamp, .. } => *timestamp,
            AnalysisEvent::StageCompleted { timestamp, .. } => *timestamp,
            AnalysisEvent::ChainCompleted { timestamp, .. } => *timestamp,
            AnalysisEvent::ChainCacheHit { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            AnalysisEvent::AnalysisStarted { .. } => "analysis_started",
            AnalysisEvent::SimilarityScored { .. } => "similarity_scored",
            AnalysisEvent::PatternsClassified { .. } => "patterns_classified",
            AnalysisEvent::AnomaliesDetected { .. } => "anomalies_detected",
            AnalysisEvent::HypothesesGenerated { .. } => "hypotheses_generated",
            AnalysisEvent::StageCompleted { .. } => "stage_completed",
            AnalysisEvent::ChainCompleted { .. } => "chain_completed",
            AnalysisEvent::ChainCacheHit { .. } => "chain_cache_hit",
        }
    }

    /// The case the event refers to
    pub fn case_id(&self) -> &CaseId {
        match self {
            AnalysisEvent::AnalysisStarted { case_id, .. } => case_id,
            AnalysisEvent::SimilarityScored { case_id, .. } => case_id,
            AnalysisEvent::PatternsClassified { case_id, .. } => case_id,
            AnalysisEvent::AnomaliesDetected { case_id, .. } => case_id,
            AnalysisEvent::HypothesesGenerated { case_id, .. } => case_id,
            AnalysisEvent::StageCompleted { case_id, .. } => case_id,
            AnalysisEvent::ChainCompleted { case_id, .. } => case_id,
            AnalysisEvent::ChainCacheHit { case_id, .. } => case_id,
        }
    }
}
