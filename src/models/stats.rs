//! Event-wide statistics derived from every progress record.
//!
//! Nothing is cached: callers scan the store and aggregate on demand.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::ProgressRecord;

/// Number of participants currently standing on one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StepPopulation {
    pub step: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub count: usize,
}

/// Leaderboard counts over all participants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GlobalStats {
    /// Participants who finished every step
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub completed: usize,
    /// All participants
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total: usize,
    /// Population per step, in order of first appearance during the scan
    pub steps: Vec<StepPopulation>,
}

impl GlobalStats {
    /// Aggregate over records in store order.
    ///
    /// Completed records still count at their last step.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ProgressRecord>,
    {
        let mut stats = GlobalStats::default();

        for record in records {
            stats.total += 1;
            if record.completed {
                stats.completed += 1;
            }

            // Linear lookup keeps first-seen order; the list is at most step_count long.
            match stats.steps.iter_mut().find(|s| s.step == record.step) {
                Some(population) => population.count += 1,
                None => stats.steps.push(StepPopulation {
                    step: record.step,
                    count: 1,
                }),
            }
        }

        stats
    }

    /// Participants at `step`, 0 if nobody is there.
    pub fn count_at_step(&self, step: u32) -> usize {
        self.steps
            .iter()
            .find(|s| s.step == step)
            .map(|s| s.count)
            .unwrap_or(0)
    }
}
