// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! Coldtrail Core
//!
//! Cross-record linkage for investigative case files: pairwise similarity
//! scoring, higher-order pattern classification, anomaly detection,
//! hypothesis generation, and a multi-stage chain-of-thought reasoning
//! pipeline over an injected text generator.
//!
//! # Architecture
//!
//! - **Layer:** Analysis Engine
//! - **Purpose:** Scores, classifies, and reasons over host-supplied cases

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::*;
pub use domain::*;
pub use infrastructure::*;
