//! # Folder Tree Example
//!
//! This example resolves permissions over a small project hierarchy: a
//! project holding forms, each holding submissions. A project manager is
//! assigned on the project and inherits everything below it, a data
//! collector is assigned on a single form, and an auditor holds a wildcard
//! role that only lists forms and reads projects.
//!
//! To run this example:
//! ```
//! cargo run --example folder_tree
//! ```

use acteeperms::*;
use uuid::Uuid;

pub const MANAGER: ActorId = ActorId(1);
pub const COLLECTOR: ActorId = ActorId(2);
pub const AUDITOR: ActorId = ActorId(3);

pub const PROJECT_MANAGER: RoleId = RoleId(10);
pub const DATA_COLLECTOR: RoleId = RoleId(11);
pub const AUDITOR_ROLE: RoleId = RoleId(12);

pub fn project_id() -> Uuid {
    Uuid::from_u128(0x11111111111141118111111111111111)
}

pub fn survey_form_id() -> Uuid {
    Uuid::from_u128(0x22222222222242228222222222222222)
}

pub fn census_form_id() -> Uuid {
    Uuid::from_u128(0x33333333333343338333333333333333)
}

pub fn submission_id() -> Uuid {
    Uuid::from_u128(0x44444444444444448444444444444444)
}

pub fn build_snapshot() -> Snapshot {
    let project = project_id().to_string();
    let survey = survey_form_id().to_string();
    let census = census_form_id().to_string();
    let submission = submission_id().to_string();

    let actees = vec![
        Actee::new(project.clone(), "project"),
        Actee::new(survey.clone(), "form").with_parent(project.clone()),
        Actee::new(census.clone(), "form").with_parent(project.clone()),
        Actee::new(submission, "submission").with_parent(survey.clone()),
        // A form that was deleted; it must not show up anywhere.
        Actee::new(Uuid::new_v4().to_string(), "form")
            .with_parent(project.clone())
            .purged(),
    ];

    let assignments = vec![
        RoleAssignment::new(MANAGER, PROJECT_MANAGER, AssignmentScope::Specific(project)),
        RoleAssignment::new(COLLECTOR, DATA_COLLECTOR, AssignmentScope::Specific(survey)),
        RoleAssignment::new(AUDITOR, AUDITOR_ROLE, AssignmentScope::AllActees),
    ];

    let role_verbs = vec![
        RoleVerbGrant::new(PROJECT_MANAGER, "project", "read"),
        RoleVerbGrant::new(PROJECT_MANAGER, "project", "update"),
        RoleVerbGrant::new(PROJECT_MANAGER, "form", "read"),
        RoleVerbGrant::new(PROJECT_MANAGER, "form", "update"),
        RoleVerbGrant::new(PROJECT_MANAGER, "submission", "read"),
        RoleVerbGrant::new(PROJECT_MANAGER, "submission", "update"),
        RoleVerbGrant::new(DATA_COLLECTOR, "form", "read"),
        RoleVerbGrant::new(DATA_COLLECTOR, "submission", "create"),
        RoleVerbGrant::new(AUDITOR_ROLE, "project", "read"),
        RoleVerbGrant::new(AUDITOR_ROLE, "form", "list"),
    ];

    let mut implications = Vec::new();
    for species in ["project", "form", "submission"] {
        for verb in ["create", "read", "update", "list"] {
            if let Some(bits) = verb_bits::by_name(verb) {
                implications.push(ImplicationEntry::own(species, verb, bits));
            }
        }
    }
    for verb in ["read_open", "list_open"] {
        if let Some(bits) = verb_bits::for_species("form", verb) {
            implications.push(ImplicationEntry::own("form", verb, bits));
        }
    }
    implications.push(ImplicationEntry::implies(
        "form",
        "read",
        verb_bits::READ,
        "form",
        form_bits::READ_OPEN,
    ));
    implications.push(ImplicationEntry::implies(
        "form",
        "list",
        verb_bits::LIST,
        "form",
        form_bits::LIST_OPEN,
    ));

    Snapshot {
        actees,
        assignments,
        role_verbs,
        implications,
    }
}

fn describe(actor: ActorId) -> &'static str {
    match actor {
        MANAGER => "manager",
        COLLECTOR => "collector",
        AUDITOR => "auditor",
        _ => "unknown",
    }
}

#[allow(dead_code)]
fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Folder Tree Example ===\n");

    let resolution = match resolve(&build_snapshot()) {
        Ok(resolution) => resolution,
        Err(err) => {
            eprintln!("resolution failed: {err}");
            return;
        }
    };

    println!("Effective permissions:");
    for permission in &resolution.permissions {
        println!(
            "  {:<9} on {} ({:<10}) = {}",
            describe(permission.actor_id),
            permission.actee_id,
            permission.actee_species,
            permission.permission_bits
        );
    }
    println!();

    let submission = ActeeId::from_uuid(submission_id());
    let census = ActeeId::from_uuid(census_form_id());
    let checks = [
        (MANAGER, submission, verb_bits::UPDATE),
        (COLLECTOR, submission, verb_bits::CREATE),
        (COLLECTOR, census, verb_bits::READ),
        (AUDITOR, census, verb_bits::LIST),
        (AUDITOR, census, verb_bits::READ),
    ];
    println!("Access checks:");
    for (actor, actee, required) in checks {
        let decision = resolution.permissions.check(actor, actee, required);
        println!("  {:<9} {} on {}: {}", describe(actor), required, actee, decision);
    }
    println!();

    println!("Stats: {:?}", resolution.stats);
    println!("Diagnostics clean: {}", resolution.diagnostics.is_clean());
}
