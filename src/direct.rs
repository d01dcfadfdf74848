//! Direct permissions: what each actor holds on each actee before inheritance.

use std::collections::{BTreeMap, HashMap};

use crate::diagnostics::Diagnostics;
use crate::expand::ImplicationClosure;
use crate::forest::{ActeeForest, ActeeNode};
use crate::model::{
    ActeeId, ActorId, AssignmentScope, PermissionBits, RoleAssignment, RoleId, RoleVerbGrant,
    Species,
};

/// Bits per `(actor, permission species)` on a single actee, already OR-reduced.
pub type GrantSet = BTreeMap<(ActorId, Species), PermissionBits>;

/// One permission row, direct or inherited.
///
/// `permission_species` may differ from `actee_species`: such rows only exist
/// to carry bits down to descendants of that species.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PermissionRecord {
    pub actor_id: ActorId,
    pub actee_id: ActeeId,
    pub actee_species: Species,
    pub parent_actee_id: Option<ActeeId>,
    pub permission_species: Species,
    pub permission_bits: PermissionBits,
}

/// Rows recorded before any inheritance is applied.
pub type DirectPermissionRecord = PermissionRecord;

#[derive(Debug, Clone)]
pub(crate) struct ActeeGrants {
    pub(crate) species: Species,
    pub(crate) parent: Option<ActeeId>,
    pub(crate) grants: GrantSet,
}

impl ActeeGrants {
    pub(crate) fn for_node(node: &ActeeNode) -> Self {
        Self {
            species: node.species.clone(),
            parent: node.parent,
            grants: GrantSet::new(),
        }
    }

    pub(crate) fn merge(&mut self, grants: &GrantSet) {
        for (key, bits) in grants {
            *self.grants.entry(key.clone()).or_default() |= *bits;
        }
    }
}

/// Flattens per-actee grants into records, ordered by actee, actor, then permission species.
pub(crate) fn records_of(
    by_actee: &BTreeMap<ActeeId, ActeeGrants>,
) -> impl Iterator<Item = PermissionRecord> + '_ {
    by_actee.iter().flat_map(|(&actee_id, entry)| {
        entry
            .grants
            .iter()
            .map(move |(&(actor_id, ref permission_species), &permission_bits)| {
                PermissionRecord {
                    actor_id,
                    actee_id,
                    actee_species: entry.species.clone(),
                    parent_actee_id: entry.parent,
                    permission_species: permission_species.clone(),
                    permission_bits,
                }
            })
    })
}

/// Direct permission records grouped by actee.
#[derive(Debug, Clone, Default)]
pub struct DirectPermissions {
    by_actee: BTreeMap<ActeeId, ActeeGrants>,
}

impl DirectPermissions {
    /// Joins assignments with their roles' grants, expanded through `closure`,
    /// over every live actee they reach.
    pub fn compute(
        forest: &ActeeForest,
        assignments: &[RoleAssignment],
        role_verbs: &[RoleVerbGrant],
        closure: &ImplicationClosure,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let role_bits = expand_roles(role_verbs, closure, diagnostics);
        let mut by_actee: BTreeMap<ActeeId, ActeeGrants> = BTreeMap::new();

        for assignment in assignments {
            let targets: Vec<ActeeId> = match &assignment.scope {
                AssignmentScope::AllActees => forest.iter().map(|node| node.id).collect(),
                AssignmentScope::Specific(raw) => match ActeeId::parse(raw) {
                    None => {
                        diagnostics.malformed_assignment_refs += 1;
                        continue;
                    }
                    Some(id) if !forest.contains(&id) => {
                        diagnostics.unmatched_assignments += 1;
                        continue;
                    }
                    Some(id) => vec![id],
                },
            };

            let Some(species_bits) = role_bits.get(&assignment.role_id) else {
                continue;
            };

            for target in targets {
                let Some(node) = forest.get(&target) else {
                    continue;
                };
                let entry = by_actee
                    .entry(target)
                    .or_insert_with(|| ActeeGrants::for_node(node));
                for (species, bits) in species_bits {
                    *entry
                        .grants
                        .entry((assignment.actor_id, species.clone()))
                        .or_default() |= *bits;
                }
            }
        }

        let direct = Self { by_actee };
        tracing::debug!(
            actees = direct.by_actee.len(),
            records = direct.len(),
            "Computed direct permissions"
        );
        direct
    }

    /// Grants made directly on `actee`, if any.
    pub fn grants_on(&self, actee: &ActeeId) -> Option<&GrantSet> {
        self.by_actee.get(actee).map(|entry| &entry.grants)
    }

    /// Number of `(actor, actee, permission species)` records.
    pub fn len(&self) -> usize {
        self.by_actee.values().map(|entry| entry.grants.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_actee.is_empty()
    }

    /// All records, ordered by actee, then actor, then permission species.
    pub fn records(&self) -> impl Iterator<Item = DirectPermissionRecord> + '_ {
        records_of(&self.by_actee)
    }
}

/// Per role, the OR of every granted verb's implied bits, keyed by the grant's species.
fn expand_roles(
    role_verbs: &[RoleVerbGrant],
    closure: &ImplicationClosure,
    diagnostics: &mut Diagnostics,
) -> HashMap<RoleId, BTreeMap<Species, PermissionBits>> {
    let mut role_bits: HashMap<RoleId, BTreeMap<Species, PermissionBits>> = HashMap::new();
    for grant in role_verbs {
        let bits = closure.expand(&grant.species, &grant.verb, &grant.species);
        if bits.is_empty() {
            diagnostics
                .unresolvable_grants
                .insert((grant.species.clone(), grant.verb.clone()));
            continue;
        }
        *role_bits
            .entry(grant.role_id)
            .or_default()
            .entry(grant.species.clone())
            .or_default() |= bits;
    }
    role_bits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{verb_bits, Actee, ImplicationEntry, Verb};
    use uuid::Uuid;

    fn id(n: u128) -> String {
        Uuid::from_u128(n).to_string()
    }

    fn actee_id(n: u128) -> ActeeId {
        ActeeId::from_uuid(Uuid::from_u128(n))
    }

    fn fixture() -> (ActeeForest, ImplicationClosure) {
        let actees = vec![
            Actee::new(id(1), "project"),
            Actee::new(id(2), "form").with_parent(id(1)),
            Actee::new(id(3), "form").with_parent(id(1)),
        ];
        let closure = ImplicationClosure::new(&[
            ImplicationEntry::own("project", "read", verb_bits::READ),
            ImplicationEntry::own("form", "read", verb_bits::READ),
            ImplicationEntry::own("form", "update", verb_bits::UPDATE),
        ]);
        let forest = ActeeForest::build(&actees, &mut Diagnostics::new()).unwrap();
        (forest, closure)
    }

    #[test]
    fn groups_bits_by_actor_actee_and_species() {
        let (forest, closure) = fixture();
        let role_verbs = vec![
            RoleVerbGrant::new(RoleId(10), "project", "read"),
            RoleVerbGrant::new(RoleId(10), "form", "read"),
            RoleVerbGrant::new(RoleId(10), "form", "update"),
        ];
        let assignments = vec![RoleAssignment::new(ActorId(7), RoleId(10), AssignmentScope::specific(id(1)))];
        let mut diagnostics = Diagnostics::new();
        let direct = DirectPermissions::compute(&forest, &assignments, &role_verbs, &closure, &mut diagnostics);

        let grants = direct.grants_on(&actee_id(1)).unwrap();
        assert_eq!(grants.len(), 2);
        assert_eq!(grants[&(ActorId(7), Species::from("project"))], verb_bits::READ);
        assert_eq!(grants[&(ActorId(7), Species::from("form"))], verb_bits::READ | verb_bits::UPDATE);
        assert!(direct.grants_on(&actee_id(2)).is_none());

        let records: Vec<_> = direct.records().collect();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.actee_species == Species::from("project")));
        assert!(records.iter().all(|r| r.parent_actee_id.is_none()));
        assert!(diagnostics.is_clean());
    }

    #[test]
    fn wildcard_reaches_every_live_actee() {
        let (forest, closure) = fixture();
        let role_verbs = vec![RoleVerbGrant::new(RoleId(10), "form", "read")];
        let assignments = vec![RoleAssignment::new(ActorId(7), RoleId(10), AssignmentScope::AllActees)];
        let direct =
            DirectPermissions::compute(&forest, &assignments, &role_verbs, &closure, &mut Diagnostics::new());

        assert_eq!(direct.len(), 3);
        let record = direct
            .records()
            .find(|r| r.actee_id == actee_id(3))
            .unwrap();
        assert_eq!(record.parent_actee_id, Some(actee_id(1)));
        assert_eq!(record.actee_species, Species::from("form"));
    }

    #[test]
    fn duplicate_assignments_do_not_double_count() {
        let (forest, closure) = fixture();
        let role_verbs = vec![RoleVerbGrant::new(RoleId(10), "form", "read")];
        let assignment = RoleAssignment::new(ActorId(7), RoleId(10), AssignmentScope::specific(id(2)));
        let assignments = vec![assignment.clone(), assignment];
        let direct =
            DirectPermissions::compute(&forest, &assignments, &role_verbs, &closure, &mut Diagnostics::new());
        assert_eq!(direct.len(), 1);
        assert_eq!(direct.records().next().unwrap().permission_bits, verb_bits::READ);
    }

    #[test]
    fn bad_references_are_reported_not_fatal() {
        let (forest, closure) = fixture();
        let role_verbs = vec![
            RoleVerbGrant::new(RoleId(10), "form", "read"),
            RoleVerbGrant::new(RoleId(10), "form", "teleport"),
        ];
        let assignments = vec![
            RoleAssignment::new(ActorId(7), RoleId(10), AssignmentScope::specific("nope")),
            RoleAssignment::new(ActorId(7), RoleId(10), AssignmentScope::specific(id(42))),
            RoleAssignment::new(ActorId(8), RoleId(99), AssignmentScope::specific(id(2))),
        ];
        let mut diagnostics = Diagnostics::new();
        let direct = DirectPermissions::compute(&forest, &assignments, &role_verbs, &closure, &mut diagnostics);

        assert!(direct.is_empty());
        assert_eq!(diagnostics.malformed_assignment_refs, 1);
        assert_eq!(diagnostics.unmatched_assignments, 1);
        assert!(diagnostics
            .unresolvable_grants
            .contains(&(Species::from("form"), Verb::from("teleport"))));
    }
}
