// Copyright (c) 2026 Coldtrail Systems
// SPDX-License-Identifier: AGPL-3.0
//! Coldtrail Learning
//!
//! Verified-outcome feedback, accuracy tracking, and self-improvement
//! for the Coldtrail analysis engine.
//!
//! # Architecture
//!
//! - **Layer:** Learning & Feedback Layer
//! - **Purpose:** Turns human-verified case outcomes into metrics,
//!   calibration reports, and tuned analysis parameters

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::*;
pub use domain::*;
pub use infrastructure::*;
