// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
// Ollama Text Generator Adapter
//
// Anti-Corruption Layer for Ollama local models. Supports air-gapped
// deployments: the reasoning pipeline can run against a local model with
// no external API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{GenerationError, TextGenerator};

pub struct OllamaGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaGenerator {
    pub fn new(endpoint: String, model: String) -> Self {
        Self { client: reqwest::Client::new(), endpoint, model }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<String, GenerationError> {
        // Ollama's /api/generate has no separate system field in the
        // non-streaming path we use; prepend it to the prompt instead.
        let full_prompt = match system {
            Some(system) => format!("{system}\n\n{prompt}"),
            None => prompt.to_string(),
        };

        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: full_prompt,
            stream: false,
        };

        let url = format!("{}/api/generate", self.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            return Err(if status == 404 {
                GenerationError::ModelNotFound(self.model.clone())
            } else {
                GenerationError::Provider(format!("HTTP {}: {}", status, error_text))
            });
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Provider(format!("Failed to parse response: {}", e)))?;

        Ok(ollama_response.response)
    }

    async fn health_check(&self) -> Result<(), GenerationError> {
        // Check if the Ollama server is running by listing models
        let url = format!("{}/api/tags", self.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(GenerationError::Network(format!("HTTP {}", response.status())))
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
