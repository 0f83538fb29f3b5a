// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! Generation adapters implementing the domain [`TextGenerator`] contract.
//!
//! [`TextGenerator`]: crate::domain::TextGenerator

pub mod ollama;

pub use ollama::OllamaGenerator;
