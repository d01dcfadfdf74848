//! Inheritance of direct permissions down the actee hierarchy.
//!
//! Each tree is walked one layer at a time. A node's set is its parent's
//! set (already complete, since the parent sits one layer up) OR-merged with
//! the node's own direct grants, so bits only ever travel from parent to
//! child and a node never loses what was granted on it directly. Every layer
//! below the root is one propagation step; a tree of depth `D` converges in
//! exactly `D` steps.
//!
//! Trees share nothing, so once there are enough of them they are processed
//! on the rayon pool and merged afterwards.

use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::Interrupt;
use crate::direct::{records_of, ActeeGrants, DirectPermissions, GrantSet, PermissionRecord};
use crate::error::ResolveResult;
use crate::forest::ActeeForest;
use crate::model::ActeeId;

/// Every permission record after inheritance, including rows whose permission
/// species differs from the actee's own.
#[derive(Debug, Clone, Default)]
pub struct PropagatedPermissions {
    by_actee: BTreeMap<ActeeId, ActeeGrants>,
    steps: usize,
}

struct TreeOutcome {
    grants: Vec<(ActeeId, ActeeGrants)>,
    steps: usize,
}

impl PropagatedPermissions {
    /// Propagates `direct` through `forest`, checking `interrupt` between steps.
    pub(crate) fn compute(
        forest: &ActeeForest,
        direct: &DirectPermissions,
        interrupt: &Interrupt,
        parallel_threshold: usize,
    ) -> ResolveResult<Self> {
        let roots = forest.roots();
        let outcomes = propagate_roots(roots, forest, direct, interrupt, parallel_threshold)?;

        let mut by_actee: BTreeMap<ActeeId, ActeeGrants> = BTreeMap::new();
        let mut steps = 0;
        for outcome in outcomes {
            steps = steps.max(outcome.steps);
            for (id, grants) in outcome.grants {
                match by_actee.get_mut(&id) {
                    Some(existing) => existing.merge(&grants.grants),
                    None => {
                        by_actee.insert(id, grants);
                    }
                }
            }
        }

        let propagated = Self { by_actee, steps };
        tracing::debug!(
            trees = roots.len(),
            steps,
            records = propagated.len(),
            "Propagated permissions through actee forest"
        );
        Ok(propagated)
    }

    /// Number of steps the deepest tree needed to converge.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Everything an actee holds after inheritance, keyed by actor and permission species.
    pub fn grants_on(&self, actee: &ActeeId) -> Option<&GrantSet> {
        self.by_actee.get(actee).map(|entry| &entry.grants)
    }

    pub fn len(&self) -> usize {
        self.by_actee.values().map(|entry| entry.grants.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_actee.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = PermissionRecord> + '_ {
        records_of(&self.by_actee)
    }
}

#[cfg(feature = "parallel")]
fn propagate_roots(
    roots: &[ActeeId],
    forest: &ActeeForest,
    direct: &DirectPermissions,
    interrupt: &Interrupt,
    parallel_threshold: usize,
) -> ResolveResult<Vec<TreeOutcome>> {
    if roots.len() >= parallel_threshold.max(1) {
        tracing::trace!(trees = roots.len(), "Propagating trees in parallel");
        roots
            .par_iter()
            .map(|&root| propagate_tree(root, forest, direct, interrupt))
            .collect()
    } else {
        roots
            .iter()
            .map(|&root| propagate_tree(root, forest, direct, interrupt))
            .collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn propagate_roots(
    roots: &[ActeeId],
    forest: &ActeeForest,
    direct: &DirectPermissions,
    interrupt: &Interrupt,
    _parallel_threshold: usize,
) -> ResolveResult<Vec<TreeOutcome>> {
    roots
        .iter()
        .map(|&root| propagate_tree(root, forest, direct, interrupt))
        .collect()
}

fn propagate_tree(
    root: ActeeId,
    forest: &ActeeForest,
    direct: &DirectPermissions,
    interrupt: &Interrupt,
) -> ResolveResult<TreeOutcome> {
    let layers = forest.layers(root);
    let mut resolved: BTreeMap<ActeeId, ActeeGrants> = BTreeMap::new();

    for (step, layer) in layers.iter().enumerate() {
        if step > 0 {
            interrupt.check(step - 1)?;
        }
        let mut added = 0usize;
        for id in layer {
            let Some(node) = forest.get(id) else {
                continue;
            };
            let mut entry = ActeeGrants::for_node(node);
            if let Some(parent) = node.parent.and_then(|p| resolved.get(&p)) {
                entry.merge(&parent.grants);
            }
            if let Some(own) = direct.grants_on(id) {
                entry.merge(own);
            }
            if !entry.grants.is_empty() {
                added += entry.grants.len();
                resolved.insert(*id, entry);
            }
        }
        tracing::trace!(%root, step, actees = layer.len(), records = added, "Propagation step");
    }

    Ok(TreeOutcome {
        grants: resolved.into_iter().collect(),
        steps: layers.len().saturating_sub(1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use crate::diagnostics::Diagnostics;
    use crate::expand::ImplicationClosure;
    use crate::model::{
        verb_bits, Actee, ActorId, AssignmentScope, ImplicationEntry, RoleAssignment, RoleId,
        RoleVerbGrant, Species,
    };
    use std::time::Instant;
    use uuid::Uuid;

    fn id(n: u128) -> String {
        Uuid::from_u128(n).to_string()
    }

    fn actee_id(n: u128) -> ActeeId {
        ActeeId::from_uuid(Uuid::from_u128(n))
    }

    fn run(actees: &[Actee], assignments: &[RoleAssignment], threshold: usize) -> PropagatedPermissions {
        let closure = ImplicationClosure::new(&[
            ImplicationEntry::own("project", "read", verb_bits::READ),
            ImplicationEntry::own("form", "read", verb_bits::READ),
            ImplicationEntry::own("form", "update", verb_bits::UPDATE),
        ]);
        let role_verbs = vec![
            RoleVerbGrant::new(RoleId(1), "project", "read"),
            RoleVerbGrant::new(RoleId(1), "form", "read"),
            RoleVerbGrant::new(RoleId(2), "form", "update"),
        ];
        let mut diagnostics = Diagnostics::new();
        let forest = ActeeForest::build(actees, &mut diagnostics).unwrap();
        let direct = DirectPermissions::compute(&forest, assignments, &role_verbs, &closure, &mut diagnostics);
        let interrupt = ResolverConfig::new().interrupt(Instant::now());
        PropagatedPermissions::compute(&forest, &direct, &interrupt, threshold).unwrap()
    }

    fn chain() -> Vec<Actee> {
        vec![
            Actee::new(id(1), "project"),
            Actee::new(id(2), "form").with_parent(id(1)),
            Actee::new(id(3), "form").with_parent(id(2)),
            Actee::new(id(4), "form").with_parent(id(3)),
        ]
    }

    #[test]
    fn bits_travel_all_the_way_down() {
        let assignments = vec![RoleAssignment::new(ActorId(5), RoleId(1), AssignmentScope::specific(id(1)))];
        let propagated = run(&chain(), &assignments, usize::MAX);

        let leaf = propagated.grants_on(&actee_id(4)).unwrap();
        assert_eq!(leaf[&(ActorId(5), Species::from("form"))], verb_bits::READ);
        assert_eq!(leaf[&(ActorId(5), Species::from("project"))], verb_bits::READ);
        assert_eq!(propagated.steps(), 3);
    }

    #[test]
    fn grants_never_move_up() {
        let assignments = vec![RoleAssignment::new(ActorId(5), RoleId(2), AssignmentScope::specific(id(3)))];
        let propagated = run(&chain(), &assignments, usize::MAX);

        assert!(propagated.grants_on(&actee_id(1)).is_none());
        assert!(propagated.grants_on(&actee_id(2)).is_none());
        assert!(propagated.grants_on(&actee_id(3)).is_some());
        assert!(propagated.grants_on(&actee_id(4)).is_some());
    }

    #[test]
    fn child_keeps_own_grants_alongside_inherited() {
        let assignments = vec![
            RoleAssignment::new(ActorId(5), RoleId(1), AssignmentScope::specific(id(1))),
            RoleAssignment::new(ActorId(5), RoleId(2), AssignmentScope::specific(id(3))),
        ];
        let propagated = run(&chain(), &assignments, usize::MAX);

        let mid = propagated.grants_on(&actee_id(3)).unwrap();
        assert_eq!(
            mid[&(ActorId(5), Species::from("form"))],
            verb_bits::READ | verb_bits::UPDATE
        );
        let above = propagated.grants_on(&actee_id(2)).unwrap();
        assert_eq!(above[&(ActorId(5), Species::from("form"))], verb_bits::READ);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let mut actees = Vec::new();
        let mut assignments = Vec::new();
        for tree in 0..8u128 {
            let root = 100 * (tree + 1);
            actees.push(Actee::new(id(root), "project"));
            actees.push(Actee::new(id(root + 1), "form").with_parent(id(root)));
            actees.push(Actee::new(id(root + 2), "form").with_parent(id(root + 1)));
            assignments.push(RoleAssignment::new(
                ActorId(tree as u64),
                RoleId(1),
                AssignmentScope::specific(id(root)),
            ));
        }
        assignments.push(RoleAssignment::new(ActorId(99), RoleId(2), AssignmentScope::AllActees));

        let sequential = run(&actees, &assignments, usize::MAX);
        let parallel = run(&actees, &assignments, 1);
        assert_eq!(
            sequential.records().collect::<Vec<_>>(),
            parallel.records().collect::<Vec<_>>()
        );
        assert_eq!(sequential.steps(), parallel.steps());
    }

    #[test]
    fn interrupt_is_checked_between_steps() {
        let actees = chain();
        let mut diagnostics = Diagnostics::new();
        let forest = ActeeForest::build(&actees, &mut diagnostics).unwrap();
        let direct = DirectPermissions::default();
        let token = crate::config::CancelToken::new();
        token.cancel();
        let interrupt = ResolverConfig::new()
            .with_cancel_token(token)
            .interrupt(Instant::now());

        let err = PropagatedPermissions::compute(&forest, &direct, &interrupt, usize::MAX).unwrap_err();
        assert!(matches!(err, crate::ResolveError::Cancelled { steps: 0 }));
    }
}
