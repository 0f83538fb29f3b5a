// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! # ChainStore — Bounded Reasoning-Chain Cache
//!
//! A full reasoning chain costs one generation call per stage, so
//! completed chains are cached by case id. The store is an injected
//! dependency of the reasoning engine, never a module-level global, and
//! its policy is true LRU: `get` refreshes recency, and inserting into a
//! full cache evicts the least-recently-used entry.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use crate::domain::{CaseId, ReasoningChain};

/// Bounded cache contract for completed reasoning chains.
///
/// Implementations must be safe to share across concurrent analyses;
/// writes for different case ids never conflict. Two concurrent analyses
/// of the *same* case id may both run the pipeline and both store — the
/// later write wins, which is harmless because the pipeline is
/// deterministic for a fixed generator.
pub trait ChainStore: Send + Sync {
    /// Fetch a cached chain, refreshing its recency
    fn get(&self, case_id: &CaseId) -> Option<ReasoningChain>;

    /// Store a chain, evicting the least-recently-used entry when full
    fn put(&self, chain: ReasoningChain);

    /// Drop one entry; returns whether it was present
    fn evict(&self, case_id: &CaseId) -> bool;

    /// Number of cached chains
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Default chain capacity
pub const DEFAULT_CHAIN_CAPACITY: usize = 50;

/// In-memory LRU implementation of [`ChainStore`]
pub struct LruChainStore {
    inner: Mutex<LruCache<CaseId, ReasoningChain>>,
}

impl LruChainStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or_else(|| NonZeroUsize::new(DEFAULT_CHAIN_CAPACITY).unwrap());
        Self { inner: Mutex::new(LruCache::new(capacity)) }
    }
}

impl Default for LruChainStore {
    fn default() -> Self {
        Self::new(DEFAULT_CHAIN_CAPACITY)
    }
}

impl ChainStore for LruChainStore {
    fn get(&self, case_id: &CaseId) -> Option<ReasoningChain> {
        self.inner.lock().get(case_id).cloned()
    }

    fn put(&self, chain: ReasoningChain) {
        self.inner.lock().put(chain.case_id.clone(), chain);
    }

    fn evict(&self, case_id: &CaseId) -> bool {
        self.inner.lock().pop(case_id).is_some()
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }
}
