//! Verb implication lookup.

use std::collections::HashMap;

use crate::model::{ImplicationEntry, PermissionBits, Species, Verb};

/// Index over the precomputed implication closure, keyed by `(species, verb)`.
#[derive(Debug, Clone, Default)]
pub struct ImplicationClosure {
    entries: HashMap<(Species, Verb), Vec<ImplicationEntry>>,
}

impl ImplicationClosure {
    pub fn new<'a>(entries: impl IntoIterator<Item = &'a ImplicationEntry>) -> Self {
        let mut index: HashMap<(Species, Verb), Vec<ImplicationEntry>> = HashMap::new();
        for entry in entries {
            index
                .entry((entry.species.clone(), entry.verb.clone()))
                .or_default()
                .push(entry.clone());
        }
        Self { entries: index }
    }

    /// Number of distinct `(species, verb)` keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bits implied by holding `verb` on `species`, evaluated for a grant made
    /// on `grant_species`.
    ///
    /// Rows restricted to another implied species are ignored. Returns
    /// [`PermissionBits::EMPTY`] when nothing matches; callers treat that as the
    /// grant contributing nothing.
    pub fn expand(&self, species: &Species, verb: &Verb, grant_species: &Species) -> PermissionBits {
        let Some(rows) = self.entries.get(&(species.clone(), verb.clone())) else {
            return PermissionBits::EMPTY;
        };
        rows.iter()
            .filter(|row| {
                row.implied_species
                    .as_ref()
                    .is_none_or(|implied| implied == grant_species)
            })
            .fold(PermissionBits::EMPTY, |acc, row| acc | row.granted_bits())
    }
}
