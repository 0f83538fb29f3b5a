// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! Case Outcomes
//!
//! Human-verified ground truth for one analyzed case. An outcome is
//! created once by an investigator and only ever aggregated afterwards;
//! resubmitting for the same case id replaces the stored outcome while
//! keeping its original submission position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use coldtrail_core::domain::CaseId;

/// Correct/incorrect item ids for one analysis category.
/// An item belongs to exactly one of the two sets, never both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryFeedback {
    pub correct: Vec<String>,
    pub incorrect: Vec<String>,
}

impl CategoryFeedback {
    pub fn total(&self) -> usize {
        self.correct.len() + self.incorrect.len()
    }

    fn overlapping(&self) -> bool {
        self.correct.iter().any(|id| self.incorrect.contains(id))
    }
}

/// Verified counts for the pattern classifier's output on a case
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PatternFeedback {
    pub correct: u32,
    pub total: u32,
}

/// What actually happened to the case after verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActualOutcome {
    Solved,
    Cold,
    Ongoing,
    Unsolvable,
}

/// One human-verified outcome for an analyzed case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseOutcome {
    pub case_id: CaseId,
    /// Whether a human actually verified the analysis; unverified
    /// outcomes are stored but excluded from metrics
    pub verified: bool,
    /// Overall verified accuracy in [0,100]
    pub accuracy: u8,
    pub insights: CategoryFeedback,
    pub hypotheses: CategoryFeedback,
    pub anomalies: CategoryFeedback,
    pub pattern_feedback: Option<PatternFeedback>,
    pub actual_outcome: Option<ActualOutcome>,
    pub notes: Option<String>,
    pub verified_at: DateTime<Utc>,
}

impl CaseOutcome {
    /// Reject malformed submissions before anything is recorded
    pub fn validate(&self) -> Result<(), FeedbackError> {
        if self.case_id.as_str().is_empty() {
            return Err(FeedbackError::MissingCaseId);
        }
        if self.accuracy > 100 {
            return Err(FeedbackError::AccuracyOutOfRange(self.accuracy));
        }
        for (category, feedback) in [
            ("insights", &self.insights),
            ("hypotheses", &self.hypotheses),
            ("anomalies", &self.anomalies),
        ] {
            if feedback.overlapping() {
                return Err(FeedbackError::OverlappingFeedback(category.to_string()));
            }
        }
        if let Some(patterns) = self.pattern_feedback {
            if patterns.correct > patterns.total {
                return Err(FeedbackError::InvalidPatternFeedback {
                    correct: patterns.correct,
                    total: patterns.total,
                });
            }
        }
        Ok(())
    }
}

/// Why a feedback submission was rejected
#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("Case id must not be empty")]
    MissingCaseId,

    #[error("Accuracy {0} exceeds 100")]
    AccuracyOutOfRange(u8),

    #[error("Item listed as both correct and incorrect in {0}")]
    OverlappingFeedback(String),

    #[error("Pattern feedback has {correct} correct out of {total}")]
    InvalidPatternFeedback { correct: u32, total: u32 },
}
