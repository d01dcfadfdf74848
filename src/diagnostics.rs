//! Data-quality report returned alongside every successful resolution.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{ActeeId, Species, Verb};

const DIAGNOSTICS_TARGET: &str = "acteeperms::diagnostics";

/// Rows the resolver dropped or defaulted instead of failing the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// Actee rows whose own identifier is malformed.
    pub malformed_actee_ids: usize,
    /// Actee rows excluded because their parent reference is malformed.
    pub malformed_parent_refs: usize,
    /// Assignments whose actee reference is malformed.
    pub malformed_assignment_refs: usize,
    /// Actee rows skipped because they are purged.
    pub purged_actees: usize,
    /// Live actees whose parent is not live; they were treated as roots.
    pub dangling_parents: BTreeSet<ActeeId>,
    /// Assignments naming a well-formed actee that is not live.
    pub unmatched_assignments: usize,
    /// Granted `(species, verb)` pairs with no implication row.
    pub unresolvable_grants: BTreeSet<(Species, Verb)>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when nothing was dropped or defaulted.
    pub fn is_clean(&self) -> bool {
        self.malformed_actee_ids == 0
            && self.malformed_parent_refs == 0
            && self.malformed_assignment_refs == 0
            && self.dangling_parents.is_empty()
            && self.unmatched_assignments == 0
            && self.unresolvable_grants.is_empty()
    }

    /// Total rows excluded or defaulted because of malformed identifiers.
    pub fn malformed_total(&self) -> usize {
        self.malformed_actee_ids + self.malformed_parent_refs + self.malformed_assignment_refs
    }

    /// Emits one warning per non-empty category.
    pub(crate) fn report(&self) {
        if self.malformed_total() > 0 {
            tracing::warn!(
                target: DIAGNOSTICS_TARGET,
                actee_ids = self.malformed_actee_ids,
                parent_refs = self.malformed_parent_refs,
                assignment_refs = self.malformed_assignment_refs,
                "Excluded rows with malformed identifiers"
            );
        }
        if !self.dangling_parents.is_empty() {
            tracing::warn!(
                target: DIAGNOSTICS_TARGET,
                count = self.dangling_parents.len(),
                "Actees reference a parent that is not live, treating them as roots"
            );
        }
        if self.unmatched_assignments > 0 {
            tracing::warn!(
                target: DIAGNOSTICS_TARGET,
                count = self.unmatched_assignments,
                "Assignments target actees that are not live"
            );
        }
        if !self.unresolvable_grants.is_empty() {
            tracing::debug!(
                target: DIAGNOSTICS_TARGET,
                count = self.unresolvable_grants.len(),
                "Role grants without implication rows contribute no bits"
            );
        }
        if self.purged_actees > 0 {
            tracing::debug!(
                target: DIAGNOSTICS_TARGET,
                count = self.purged_actees,
                "Skipped purged actees"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purged_rows_do_not_dirty_the_report() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.purged_actees = 3;
        assert!(diagnostics.is_clean());

        diagnostics.malformed_parent_refs = 1;
        diagnostics.malformed_assignment_refs = 2;
        assert!(!diagnostics.is_clean());
        assert_eq!(diagnostics.malformed_total(), 3);
    }
}
