// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure Layer
//!
//! Storage adapters for the learning services.

pub mod outcome_store;

pub use outcome_store::{InMemoryOutcomeStore, OutcomeStore};
