// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! Domain Layer
//!
//! Value objects, contracts, and events shared by the analysis engines.

pub mod anomaly;
pub mod case;
pub mod events;
pub mod generation;
pub mod hypothesis;
pub mod pattern;
pub mod reasoning;
pub mod similarity;

pub use anomaly::*;
pub use case::*;
pub use events::*;
pub use generation::*;
pub use hypothesis::*;
pub use pattern::*;
pub use reasoning::*;
pub use similarity::*;
