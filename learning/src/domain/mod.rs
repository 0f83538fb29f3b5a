// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! Domain Layer
//!
//! Value objects and events for the learning bounded context.

pub mod events;
pub mod metrics;
pub mod outcome;
pub mod strategy;

pub use events::*;
pub use metrics::*;
pub use outcome::*;
pub use strategy::*;
