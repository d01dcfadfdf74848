use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use acteeperms::*;
use async_trait::async_trait;
use uuid::Uuid;

fn id(n: u128) -> String {
    Uuid::from_u128(n).to_string()
}

fn snapshot() -> Snapshot {
    Snapshot {
        actees: vec![
            Actee::new(id(1), "project"),
            Actee::new(id(2), "form").with_parent(id(1)),
        ],
        assignments: vec![RoleAssignment::new(
            ActorId(1),
            RoleId(1),
            AssignmentScope::specific(id(1)),
        )],
        role_verbs: vec![
            RoleVerbGrant::new(RoleId(1), "project", "read"),
            RoleVerbGrant::new(RoleId(1), "form", "update"),
        ],
        implications: vec![
            ImplicationEntry::own("project", "read", verb_bits::READ),
            ImplicationEntry::own("form", "update", verb_bits::UPDATE),
        ],
    }
}

/// Serves a snapshot from a JSON document, counting how often it was read.
struct JsonSource {
    document: String,
    loads: AtomicUsize,
}

#[async_trait]
impl SnapshotSource for JsonSource {
    async fn load(&self) -> Result<Snapshot, SourceError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(serde_json::from_str(&self.document)?)
    }
}

struct Unavailable;

#[async_trait]
impl SnapshotSource for Unavailable {
    async fn load(&self) -> Result<Snapshot, SourceError> {
        Err("permission store unavailable".into())
    }
}

#[tokio::test]
async fn resolves_from_in_memory_source() {
    let source = InMemorySource::new(snapshot());
    let resolution = Resolver::default().resolve_from(&source).await.unwrap();

    let form = ActeeId::parse(&id(2)).unwrap();
    assert_eq!(resolution.permissions.bits(ActorId(1), form), verb_bits::UPDATE);
    assert_eq!(source.snapshot().actees.len(), 2);
}

#[tokio::test]
async fn each_run_loads_a_fresh_snapshot() {
    let source = JsonSource {
        document: r#"{ "actees": [], "assignments": [] }"#.to_string(),
        loads: AtomicUsize::new(0),
    };
    let resolver = Resolver::default();

    let (first, second) = tokio::join!(resolver.resolve_from(&source), resolver.resolve_from(&source));
    assert!(first.unwrap().permissions.is_empty());
    assert!(second.unwrap().permissions.is_empty());
    assert_eq!(source.loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn source_failure_is_reported_as_source_error() {
    let err = Resolver::default()
        .resolve_from(&Unavailable)
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::Source(_)));
    assert_eq!(
        err.to_string(),
        "failed to load snapshot: permission store unavailable"
    );
    assert!(!err.is_invariant_violation());
}

#[tokio::test]
async fn malformed_document_is_a_source_error() {
    let source = JsonSource {
        document: "{ not json".to_string(),
        loads: AtomicUsize::new(0),
    };
    let err = Resolver::default().resolve_from(&source).await.unwrap_err();
    assert!(matches!(err, ResolveError::Source(_)));
}

#[tokio::test]
async fn boxed_sources_resolve_in_spawned_tasks() {
    let resolver = Arc::new(Resolver::default());
    let sources: Vec<Box<dyn SnapshotSource>> = vec![
        Box::new(InMemorySource::new(snapshot())),
        Box::new(Unavailable),
    ];

    let mut handles = Vec::new();
    for source in sources {
        let resolver = Arc::clone(&resolver);
        handles.push(tokio::spawn(async move { resolver.resolve_from(&source).await }));
    }

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }
    assert_eq!(outcomes[0].as_ref().unwrap().permissions.len(), 2);
    assert!(outcomes[1].is_err());
}
