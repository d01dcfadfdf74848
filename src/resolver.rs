use std::time::Instant;

use serde::Serialize;

use crate::config::ResolverConfig;
use crate::diagnostics::Diagnostics;
use crate::direct::DirectPermissions;
use crate::error::{ResolveError, ResolveResult};
use crate::expand::ImplicationClosure;
use crate::forest::ActeeForest;
use crate::model::Snapshot;
use crate::propagate::PropagatedPermissions;
use crate::reduce::EffectivePermissions;
use crate::source::SnapshotSource;

/// Sizes observed during one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveStats {
    pub live_actees: usize,
    pub roots: usize,
    /// Height of the tallest tree, in parent hops.
    pub max_depth: usize,
    pub propagation_steps: usize,
    pub direct_records: usize,
    pub propagated_records: usize,
    pub effective_records: usize,
}

/// Output of a successful run.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub permissions: EffectivePermissions,
    pub diagnostics: Diagnostics,
    pub stats: ResolveStats,
}

/// Runs expand, direct, propagate and reduce over a snapshot.
///
/// A resolver holds no state between runs; the same snapshot always yields
/// the same [`EffectivePermissions`].
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Computes effective permissions for every actor and actee in `snapshot`.
    ///
    /// Cycles and duplicate actee ids abort the run, as do cancellation and the
    /// deadline. Everything else that is wrong with the input ends up in
    /// [`Resolution::diagnostics`].
    #[tracing::instrument(skip_all)]
    pub fn resolve(&self, snapshot: &Snapshot) -> ResolveResult<Resolution> {
        let started = Instant::now();
        let interrupt = self.config.interrupt(started);
        tracing::debug!(
            actees = snapshot.actees.len(),
            assignments = snapshot.assignments.len(),
            role_verbs = snapshot.role_verbs.len(),
            implications = snapshot.implications.len(),
            "Resolving permissions"
        );

        let mut diagnostics = Diagnostics::new();
        let forest = ActeeForest::build(&snapshot.actees, &mut diagnostics)?;
        let closure = ImplicationClosure::new(&snapshot.implications);
        let direct = DirectPermissions::compute(
            &forest,
            &snapshot.assignments,
            &snapshot.role_verbs,
            &closure,
            &mut diagnostics,
        );

        interrupt.check(0)?;
        let propagated = PropagatedPermissions::compute(
            &forest,
            &direct,
            &interrupt,
            self.config.parallel_threshold(),
        )?;
        let permissions = EffectivePermissions::reduce(&propagated);

        let stats = ResolveStats {
            live_actees: forest.len(),
            roots: forest.roots().len(),
            max_depth: forest.max_depth(),
            propagation_steps: propagated.steps(),
            direct_records: direct.len(),
            propagated_records: propagated.len(),
            effective_records: permissions.len(),
        };
        diagnostics.report();
        tracing::debug!(
            elapsed_us = started.elapsed().as_micros() as u64,
            effective = stats.effective_records,
            steps = stats.propagation_steps,
            "Resolved permissions"
        );

        Ok(Resolution {
            permissions,
            diagnostics,
            stats,
        })
    }

    /// Runs only the propagation pass, honouring this resolver's deadline and
    /// cancellation token. Useful for inspecting the records the reducer discards.
    pub fn propagate(
        &self,
        forest: &ActeeForest,
        direct: &DirectPermissions,
    ) -> ResolveResult<PropagatedPermissions> {
        let interrupt = self.config.interrupt(Instant::now());
        interrupt.check(0)?;
        PropagatedPermissions::compute(forest, direct, &interrupt, self.config.parallel_threshold())
    }

    /// Loads a snapshot from `source` and resolves it.
    pub async fn resolve_from<S>(&self, source: &S) -> ResolveResult<Resolution>
    where
        S: SnapshotSource + ?Sized,
    {
        let snapshot = source.load().await.map_err(ResolveError::Source)?;
        self.resolve(&snapshot)
    }
}

/// Resolves `snapshot` with the default configuration.
pub fn resolve(snapshot: &Snapshot) -> ResolveResult<Resolution> {
    Resolver::default().resolve(snapshot)
}
