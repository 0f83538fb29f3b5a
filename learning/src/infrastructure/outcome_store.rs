// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! # OutcomeStore — Verified Outcome Storage
//!
//! Injected storage contract for case outcomes, keyed by case id.
//! Resubmission for a case id overwrites the stored outcome in place
//! while keeping its original submission position, so the improvement
//! trend stays in submission order even after corrections.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use coldtrail_core::domain::CaseId;

use crate::domain::CaseOutcome;

/// Storage contract for verified case outcomes
#[async_trait]
pub trait OutcomeStore: Send + Sync {
    /// Store an outcome, replacing any previous one for the same case id
    async fn record(&self, outcome: CaseOutcome) -> Result<()>;

    /// Fetch the stored outcome for a case
    async fn get(&self, case_id: &CaseId) -> Result<Option<CaseOutcome>>;

    /// All stored outcomes in submission order
    async fn all(&self) -> Result<Vec<CaseOutcome>>;

    /// Number of stored outcomes
    async fn len(&self) -> Result<usize>;
}

#[derive(Default)]
struct Outcomes {
    by_case: HashMap<CaseId, CaseOutcome>,
    /// First-seen submission order; overwrites never move an id
    order: Vec<CaseId>,
}

/// In-memory implementation of [`OutcomeStore`]
#[derive(Default)]
pub struct InMemoryOutcomeStore {
    inner: Arc<RwLock<Outcomes>>,
}

impl InMemoryOutcomeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OutcomeStore for InMemoryOutcomeStore {
    async fn record(&self, outcome: CaseOutcome) -> Result<()> {
        let mut outcomes = self.inner.write().await;
        if !outcomes.by_case.contains_key(&outcome.case_id) {
            outcomes.order.push(outcome.case_id.clone());
        }
        outcomes.by_case.insert(outcome.case_id.clone(), outcome);
        Ok(())
    }

    async fn get(&self, case_id: &CaseId) -> Result<Option<CaseOutcome>> {
        let outcomes = self.inner.read().await;
        Ok(outcomes.by_case.get(case_id).cloned())
    }

    async fn all(&self) -> Result<Vec<CaseOutcome>> {
        let outcomes = self.inner.read().await;
        Ok(outcomes
            .order
            .iter()
            .filter_map(|id| outcomes.by_case.get(id).cloned())
            .collect())
    }

    async fn len(&self) -> Result<usize> {
        let outcomes = self.inner.read().await;
        Ok(outcomes.by_case.len())
    }
}
