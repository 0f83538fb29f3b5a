// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! Application Layer
//!
//! The analysis engines and the facade that composes them.

pub mod anomaly_detector;
pub mod case_analyzer;
pub mod hypothesis_generator;
pub mod pattern_classifier;
pub mod reasoning_engine;
pub mod similarity_engine;

pub use anomaly_detector::AnomalyDetector;
pub use case_analyzer::{AnalysisReport, AnalyzerConfig, CaseAnalyzer};
pub use hypothesis_generator::HypothesisGenerator;
pub use pattern_classifier::PatternClassifier;
pub use reasoning_engine::ReasoningEngine;
pub use similarity_engine::{
    geographic_proximity, jurisdiction_proximity, temporal_proximity, SimilarityEngine,
};
