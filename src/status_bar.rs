use std::fmt;

use crate::download::Outcome;

/// Counts what happened to the items of a run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatusBar {
    pub new: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl fmt::Display for StatusBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "New {} / Skipped {} / Failed {}",
            self.new, self.skipped, self.failed
        )
    }
}

impl StatusBar {
    pub fn register(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Downloaded => self.new += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
    }

    pub fn register_all(&mut self, outcomes: impl IntoIterator<Item = Outcome>) {
        for outcome in outcomes {
            self.register(outcome);
        }
    }
}
