// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure Layer
//!
//! Chain cache, event bus, prompt templates, and generation adapters.

pub mod chain_cache;
pub mod event_bus;
pub mod llm;
pub mod prompts;

pub use chain_cache::{ChainStore, LruChainStore};
pub use event_bus::{EventBus, EventBusError, EventReceiver};
pub use llm::OllamaGenerator;
pub use prompts::{PromptContext, PromptLibrary};
