use async_trait::async_trait;

use crate::error::SourceError;
use crate::model::Snapshot;

/// Where a resolver gets its input from.
///
/// Implement this over whatever store holds actees, assignments, role verbs
/// and the implication closure. The resolver only ever reads the returned
/// snapshot.
///
/// ```rust
/// # use acteeperms::*;
/// # use uuid::Uuid;
/// let root = Uuid::from_u128(1).to_string();
/// let snapshot = Snapshot {
///     actees: vec![Actee::new(root.clone(), "project")],
///     assignments: vec![RoleAssignment::new(
///         ActorId(1),
///         RoleId(1),
///         AssignmentScope::Specific(root.clone()),
///     )],
///     role_verbs: vec![RoleVerbGrant::new(RoleId(1), "project", "read")],
///     implications: vec![ImplicationEntry::own("project", "read", verb_bits::READ)],
/// };
/// let source = InMemorySource::new(snapshot);
///
/// # tokio_test::block_on(async {
/// let resolution = Resolver::default().resolve_from(&source).await.unwrap();
/// assert_eq!(resolution.permissions.len(), 1);
/// # });
/// ```
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Loads a consistent snapshot of every input table.
    async fn load(&self) -> Result<Snapshot, SourceError>;
}

/// A source that hands out a snapshot it already holds.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    snapshot: Snapshot,
}

impl InMemorySource {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

#[async_trait]
impl SnapshotSource for InMemorySource {
    async fn load(&self) -> Result<Snapshot, SourceError> {
        Ok(self.snapshot.clone())
    }
}

// Lets a boxed source be passed wherever a concrete one is expected.
#[async_trait]
impl SnapshotSource for Box<dyn SnapshotSource> {
    async fn load(&self) -> Result<Snapshot, SourceError> {
        (**self).load().await
    }
}
