//! The validated actee hierarchy.
//!
//! Building the forest is where identifier hygiene happens: purged rows,
//! malformed ids and rows pointing at malformed parents never make it in,
//! and a parent that is not live is cut so its child becomes a root.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use crate::diagnostics::Diagnostics;
use crate::error::{ResolveError, ResolveResult};
use crate::model::{Actee, ActeeId, Species};

/// A live actee with its parent link resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActeeNode {
    pub id: ActeeId,
    pub species: Species,
    pub parent: Option<ActeeId>,
    /// Number of parent hops to the root of this node's tree.
    pub depth: usize,
}

/// Live actees arranged as a forest.
#[derive(Debug, Clone, Default)]
pub struct ActeeForest {
    nodes: BTreeMap<ActeeId, ActeeNode>,
    children: HashMap<ActeeId, Vec<ActeeId>>,
    roots: Vec<ActeeId>,
    max_depth: usize,
}

impl ActeeForest {
    /// Validates `actees` and links them into a forest.
    ///
    /// Fails on duplicate live identifiers and on parent cycles; every other
    /// defect is recorded in `diagnostics` and the row is dropped or re-rooted.
    pub fn build(actees: &[Actee], diagnostics: &mut Diagnostics) -> ResolveResult<Self> {
        let mut declared: BTreeMap<ActeeId, (Species, Option<ActeeId>)> = BTreeMap::new();
        // Every non-purged well-formed id, including rows excluded further down.
        let mut seen: BTreeSet<ActeeId> = BTreeSet::new();

        for row in actees {
            if row.purged {
                diagnostics.purged_actees += 1;
                continue;
            }
            let Some(id) = ActeeId::parse(&row.id) else {
                tracing::trace!(id = %row.id, "Skipping actee with malformed id");
                diagnostics.malformed_actee_ids += 1;
                continue;
            };
            if !seen.insert(id) {
                return Err(ResolveError::DuplicateActee { actee: id });
            }
            let parent = match row.parent.as_deref() {
                None => None,
                Some(raw) => match ActeeId::parse(raw) {
                    Some(parent) => Some(parent),
                    None => {
                        tracing::trace!(%id, parent = %raw, "Skipping actee with malformed parent");
                        diagnostics.malformed_parent_refs += 1;
                        continue;
                    }
                },
            };
            declared.insert(id, (row.species.clone(), parent));
        }

        let mut nodes = BTreeMap::new();
        let mut children: HashMap<ActeeId, Vec<ActeeId>> = HashMap::new();
        let mut roots = Vec::new();

        for (&id, (species, parent)) in &declared {
            let parent = match parent {
                Some(p) if declared.contains_key(p) => Some(*p),
                Some(_) => {
                    diagnostics.dangling_parents.insert(id);
                    None
                }
                None => None,
            };
            match parent {
                Some(p) => children.entry(p).or_default().push(id),
                None => roots.push(id),
            }
            nodes.insert(
                id,
                ActeeNode {
                    id,
                    species: species.clone(),
                    parent,
                    depth: 0,
                },
            );
        }

        let mut forest = Self {
            nodes,
            children,
            roots,
            max_depth: 0,
        };
        forest.assign_depths()?;
        Ok(forest)
    }

    /// Breadth-first from every root. Any node left unvisited hangs off a cycle.
    fn assign_depths(&mut self) -> ResolveResult<()> {
        let mut queue: VecDeque<(ActeeId, usize)> = self.roots.iter().map(|&r| (r, 0)).collect();
        let mut visited = BTreeSet::new();

        while let Some((id, depth)) = queue.pop_front() {
            visited.insert(id);
            if let Some(node) = self.nodes.get_mut(&id) {
                node.depth = depth;
            }
            self.max_depth = self.max_depth.max(depth);
            for &child in self.children(id) {
                queue.push_back((child, depth + 1));
            }
        }

        if visited.len() == self.nodes.len() {
            return Ok(());
        }

        let start = self
            .nodes
            .keys()
            .copied()
            .find(|id| !visited.contains(id));
        match start.and_then(|start| self.cycle_member(start)) {
            Some(actee) => Err(ResolveError::CycleDetected { actee }),
            None => Ok(()),
        }
    }

    /// Walks parent links from `start` and returns the smallest id on the cycle it runs into.
    fn cycle_member(&self, start: ActeeId) -> Option<ActeeId> {
        let mut seen = BTreeSet::new();
        let mut current = start;
        while seen.insert(current) {
            current = self.nodes.get(&current)?.parent?;
        }
        let mut smallest = current;
        let mut walk = self.nodes.get(&current)?.parent?;
        while walk != current {
            smallest = smallest.min(walk);
            walk = self.nodes.get(&walk)?.parent?;
        }
        Some(smallest)
    }

    pub fn get(&self, id: &ActeeId) -> Option<&ActeeNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &ActeeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Live actees in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &ActeeNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Roots of every tree, in identifier order.
    pub fn roots(&self) -> &[ActeeId] {
        &self.roots
    }

    /// Direct children of `id`, in identifier order.
    pub fn children(&self, id: ActeeId) -> &[ActeeId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Height of the tallest tree, counted in parent hops.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: ActeeId) -> Ancestors<'_> {
        Ancestors {
            forest: self,
            next: self.nodes.get(&id).and_then(|node| node.parent),
        }
    }

    /// Every node of the tree rooted at `root`, grouped by depth below it.
    pub fn layers(&self, root: ActeeId) -> Vec<Vec<ActeeId>> {
        let mut layers = Vec::new();
        if !self.contains(&root) {
            return layers;
        }
        let mut frontier = vec![root];
        while !frontier.is_empty() {
            let next: Vec<ActeeId> = frontier
                .iter()
                .flat_map(|&id| self.children(id).iter().copied())
                .collect();
            layers.push(frontier);
            frontier = next;
        }
        layers
    }
}

/// Iterator over the ancestors of an actee.
pub struct Ancestors<'a> {
    forest: &'a ActeeForest,
    next: Option<ActeeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a ActeeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.forest.nodes.get(&self.next?)?;
        self.next = node.parent;
        Some(node)
    }
}
