use std::collections::BTreeSet;

use dalschema_core::Phase;

/// Options that control how a snapshot load behaves.
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Phases that run no query and contribute nothing to the snapshot.
    pub skip_phases: BTreeSet<Phase>,
}

impl LoaderOptions {
    pub fn skip(mut self, phase: Phase) -> Self {
        self.skip_phases.insert(phase);
        self
    }

    pub fn runs(&self, phase: Phase) -> bool {
        !self.skip_phases.contains(&phase)
    }
}
