// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! Strategy Refresher - Background task for periodic strategy adjustment
//!
//! Recomputes the learning metrics and re-runs the improvement pass on a
//! fixed interval, so the tuned strategy keeps up with outcomes recorded
//! between analyses.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::application::{FeedbackService, ImprovementService};
use crate::domain::ImprovementStrategy;

/// Configuration for the strategy refresher
#[derive(Debug, Clone)]
pub struct StrategyRefresherConfig {
    /// How often to refresh the strategy (in seconds)
    pub interval_seconds: u64,

    /// Whether background refreshing is enabled
    pub enabled: bool,
}

impl Default for StrategyRefresherConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 900, // Refresh every 15 minutes
            enabled: true,
        }
    }
}

/// Strategy Refresher - Background task
pub struct StrategyRefresher {
    feedback: Arc<FeedbackService>,
    improvement: Arc<ImprovementService>,
    config: StrategyRefresherConfig,
    shutdown_token: tokio_util::sync::CancellationToken,
}

impl StrategyRefresher {
    pub fn new(
        feedback: Arc<FeedbackService>,
        improvement: Arc<ImprovementService>,
        config: StrategyRefresherConfig,
    ) -> Self {
        Self {
            feedback,
            improvement,
            config,
            shutdown_token: tokio_util::sync::CancellationToken::new(),
        }
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> tokio_util::sync::CancellationToken {
        self.shutdown_token.clone()
    }

    /// Start the refresher background task
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the refresh loop with graceful shutdown support
    async fn run(&self) {
        if !self.config.enabled {
            info!("Strategy refresher is disabled");
            return;
        }

        info!(
            interval_seconds = self.config.interval_seconds,
            "Starting strategy refresher background task"
        );

        let mut tick = interval(Duration::from_secs(self.config.interval_seconds));

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    debug!("Running strategy refresh cycle");

                    match self.refresh_cycle().await {
                        Ok(strategy) => {
                            info!(
                                confidence_threshold = strategy.confidence_threshold,
                                learned_rules = strategy.learned_rules.len(),
                                "Strategy refresh cycle completed"
                            );
                        }
                        Err(e) => {
                            warn!("Strategy refresh cycle failed: {}", e);
                        }
                    }
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping strategy refresher");
                    break;
                }
            }
        }

        info!("Strategy refresher background task stopped");
    }

    /// Execute a single refresh cycle
    async fn refresh_cycle(&self) -> Result<ImprovementStrategy> {
        let metrics = self.feedback.metrics().await?;
        self.improvement.strategy_for(&metrics).await
    }
}
