// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0

//! Domain events for the learning bounded context.
//! Published through the learning EventBus trait so hosts can observe
//! feedback intake and strategy changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use coldtrail_core::domain::CaseId;

/// Learning domain events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LearningEvent {
    /// A verified outcome was accepted and stored
    OutcomeRecorded {
        case_id: CaseId,
        verified: bool,
        accuracy: u8,
        timestamp: DateTime<Utc>,
    },

    /// Learning metrics were recomputed over the outcome set
    MetricsComputed {
        total_cases: usize,
        verified_cases: usize,
        average_accuracy: u8,
        timestamp: DateTime<Utc>,
    },

    /// The improvement controller produced or refined a strategy
    StrategyAdjusted {
        confidence_threshold: u8,
        focus_areas: usize,
        learned_rules: usize,
        timestamp: DateTime<Utc>,
    },

    /// An analysis snapshot was graded against its verified outcome
    AccuracyEvaluated {
        case_id: CaseId,
        overall_accuracy: u8,
        timestamp: DateTime<Utc>,
    },
}

impl LearningEvent {
    /// Get the timestamp of the event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            LearningEvent::OutcomeRecorded { timestamp, .. } => *timestamp,
            LearningEvent::MetricsComputed { timestamp, .. } => *timestamp,
            LearningEvent::StrategyAdjusted { timestamp, .. } => *timestamp,
            LearningEvent::AccuracyEvaluated { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            LearningEvent::OutcomeRecorded { .. } => "outcome_recorded",
            LearningEvent::MetricsComputed { .. } => "metrics_computed",
            LearningEvent::StrategyAdjusted { .. } => "strategy_adjusted",
            LearningEvent::AccuracyEvaluated { .. } => "accuracy_evaluated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = LearningEvent::OutcomeRecorded {
            case_id: CaseId::new("case-1"),
            verified: true,
            accuracy: 85,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"outcome_recorded\""));

        let back: LearningEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event_type(), "outcome_recorded");
    }

    #[test]
    fn test_event_types() {
        let event = LearningEvent::StrategyAdjusted {
            confidence_threshold: 70,
            focus_areas: 1,
            learned_rules: 2,
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_type(), "strategy_adjusted");
    }
}
