//! The final answer: one bit-mask per actor and actee.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::model::{ActeeId, ActorId, PermissionBits, Species};
use crate::propagate::PropagatedPermissions;

/// Everything an actor may do on one actee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectivePermission {
    pub actor_id: ActorId,
    pub actee_id: ActeeId,
    pub actee_species: Species,
    pub permission_bits: PermissionBits,
}

/// Effective permissions keyed by `(actor, actee)`, queryable from either side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectivePermissions {
    entries: BTreeMap<(ActorId, ActeeId), EffectivePermission>,
    actors_by_actee: BTreeMap<ActeeId, BTreeSet<ActorId>>,
}

impl EffectivePermissions {
    /// Keeps rows whose permission species matches the actee's own species and
    /// ORs them per `(actor, actee)`.
    pub fn reduce(propagated: &PropagatedPermissions) -> Self {
        let mut reduced = Self::default();
        let mut discarded = 0usize;
        for record in propagated.records() {
            if record.permission_species != record.actee_species {
                discarded += 1;
                continue;
            }
            reduced.insert(EffectivePermission {
                actor_id: record.actor_id,
                actee_id: record.actee_id,
                actee_species: record.actee_species,
                permission_bits: record.permission_bits,
            });
        }
        tracing::debug!(
            effective = reduced.len(),
            discarded,
            "Reduced propagated permissions"
        );
        reduced
    }

    fn insert(&mut self, permission: EffectivePermission) {
        let bits = permission.permission_bits;
        self.actors_by_actee
            .entry(permission.actee_id)
            .or_default()
            .insert(permission.actor_id);
        self.entries
            .entry((permission.actor_id, permission.actee_id))
            .and_modify(|existing| existing.permission_bits |= bits)
            .or_insert(permission);
    }

    pub fn get(&self, actor: ActorId, actee: ActeeId) -> Option<&EffectivePermission> {
        self.entries.get(&(actor, actee))
    }

    /// Bits `actor` holds on `actee`; empty when it holds nothing.
    pub fn bits(&self, actor: ActorId, actee: ActeeId) -> PermissionBits {
        self.get(actor, actee)
            .map(|p| p.permission_bits)
            .unwrap_or_default()
    }

    /// Every actee `actor` holds something on, in actee order.
    pub fn permissions_of(&self, actor: ActorId) -> impl Iterator<Item = &EffectivePermission> {
        let lower = (actor, ActeeId::from_uuid(Uuid::from_u128(0)));
        let upper = (actor, ActeeId::from_uuid(Uuid::from_u128(u128::MAX)));
        self.entries.range(lower..=upper).map(|(_, p)| p)
    }

    /// Every actor holding something on `actee`, in actor order.
    pub fn permissions_on(&self, actee: ActeeId) -> impl Iterator<Item = &EffectivePermission> {
        self.actors_by_actee
            .get(&actee)
            .into_iter()
            .flatten()
            .filter_map(move |&actor| self.entries.get(&(actor, actee)))
    }

    /// All entries ordered by actor, then actee.
    pub fn iter(&self) -> impl Iterator<Item = &EffectivePermission> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decides whether `actor` holds every bit of `required` on `actee`.
    pub fn check(&self, actor: ActorId, actee: ActeeId, required: PermissionBits) -> AccessDecision {
        let held = self.bits(actor, actee);
        if held.contains(required) {
            tracing::trace!(%actor, %actee, %required, "Access granted");
            return AccessDecision::Granted { held };
        }
        let missing = held.missing(required);
        let reason = if held.is_empty() {
            format!("actor {actor} holds no permissions on {actee}")
        } else {
            format!("actor {actor} lacks {missing} on {actee}")
        };
        tracing::trace!(%actor, %actee, %required, %missing, "Access denied");
        AccessDecision::Denied {
            held,
            missing,
            reason,
        }
    }
}

impl<'a> IntoIterator for &'a EffectivePermissions {
    type Item = &'a EffectivePermission;
    type IntoIter = std::collections::btree_map::Values<'a, (ActorId, ActeeId), EffectivePermission>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

/// Outcome of [`EffectivePermissions::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Every required bit is held.
    Granted { held: PermissionBits },
    /// At least one required bit is missing.
    Denied {
        held: PermissionBits,
        missing: PermissionBits,
        reason: String,
    },
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }

    pub fn held(&self) -> PermissionBits {
        match self {
            Self::Granted { held } | Self::Denied { held, .. } => *held,
        }
    }
}

impl fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Granted { held } => write!(f, "[GRANTED] holding {}", held),
            Self::Denied { reason, .. } => write!(f, "[DENIED] - {}", reason),
        }
    }
}
