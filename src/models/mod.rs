// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod record;
pub mod stats;

pub use record::{Progress, ProgressRecord, RecordView, Transition};
pub use stats::{GlobalStats, StepPopulation};
