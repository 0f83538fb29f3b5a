// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! Text Generation
//!
//! Domain interface for the externally supplied text-generation function
//! the reasoning pipeline runs over. Keeps vendor APIs out of the engine;
//! adapters live in infrastructure/llm/.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Generation contract and its recoverable error type

use async_trait::async_trait;

/// Domain interface for text generators.
///
/// Failures are always recoverable from the pipeline's point of view: a
/// failed call degrades one stage to zero steps, it never aborts a chain.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate free text for a prompt, with optional system steering
    async fn generate(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<String, GenerationError>;

    /// Check whether the backing service is reachable
    async fn health_check(&self) -> Result<(), GenerationError>;

    /// Short provider name for logs and stage reports, e.g. "ollama"
    fn name(&self) -> &str;
}

/// Errors a text generator can report
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
