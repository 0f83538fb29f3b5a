// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! Application Layer
//!
//! The learning services: feedback intake and metrics, accuracy
//! evaluation, the improvement controller, and the background strategy
//! refresher.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::LearningEvent;

pub mod accuracy_tracker;
pub mod feedback_service;
pub mod improvement_service;
pub mod strategy_refresher;

pub use accuracy_tracker::{AccuracyReport, AccuracyTracker, AnalysisSnapshot, CalibrationBucket};
pub use feedback_service::FeedbackService;
pub use improvement_service::ImprovementService;
pub use strategy_refresher::{StrategyRefresher, StrategyRefresherConfig};

/// Outbound event contract for the learning services. Implemented by the
/// host; tests capture events with a mock.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: LearningEvent) -> Result<()>;
}
