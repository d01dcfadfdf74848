//! Resolves, for every actor and every protected object ("actee"), the
//! permission bits the actor effectively holds.
//!
//! # Overview
//!
//! The input is a read-only [`Snapshot`] of four tables:
//!
//!  - [`Actee`]s: protected objects tagged with a [`Species`], arranged in a
//!    forest through optional parent links.
//!  - [`RoleAssignment`]s: an actor holds a role either on one actee or, through
//!    [`AssignmentScope::AllActees`], on every actee.
//!  - [`RoleVerbGrant`]s: which verbs a role grants, per species.
//!  - [`ImplicationEntry`]s: the precomputed verb implication closure, mapping a
//!    granted verb to the bits it implies.
//!
//! A [`Resolver`] turns that into [`EffectivePermissions`] in four passes:
//!
//! 1. **Expand** ([`ImplicationClosure`]): each granted verb becomes the OR of
//!    the bits it implies.
//! 2. **Direct** ([`DirectPermissions`]): assignments are joined with their
//!    roles' grants over every live actee they reach, one bit-mask per actor,
//!    actee and permission species.
//! 3. **Propagate** ([`PropagatedPermissions`]): every actee inherits the
//!    records of all its ancestors, strictly downward.
//! 4. **Reduce** ([`EffectivePermissions`]): only records whose permission
//!    species matches the actee's own species are kept, OR-ed per actor and
//!    actee.
//!
//! Every aggregation is a bitwise OR, so neither row order nor the parallel
//! fan-out over independent trees changes the result.
//!
//! ```rust
//! # use acteeperms::*;
//! # use uuid::Uuid;
//! let folder = Uuid::from_u128(1).to_string();
//! let file = Uuid::from_u128(2).to_string();
//! let (viewer, editor) = (RoleId(1), RoleId(2));
//! let (x, y) = (ActorId(10), ActorId(20));
//!
//! let snapshot = Snapshot {
//!     actees: vec![
//!         Actee::new(folder.clone(), "folder"),
//!         Actee::new(file.clone(), "file").with_parent(folder.clone()),
//!     ],
//!     assignments: vec![
//!         RoleAssignment::new(x, viewer, AssignmentScope::Specific(folder.clone())),
//!         RoleAssignment::new(y, editor, AssignmentScope::Specific(file.clone())),
//!     ],
//!     role_verbs: vec![
//!         RoleVerbGrant::new(viewer, "folder", "read"),
//!         RoleVerbGrant::new(viewer, "file", "read"),
//!         RoleVerbGrant::new(editor, "file", "write"),
//!     ],
//!     implications: vec![
//!         ImplicationEntry::own("folder", "read", PermissionBits(1)),
//!         ImplicationEntry::own("file", "read", PermissionBits(1)),
//!         ImplicationEntry::own("file", "write", PermissionBits(2)),
//!     ],
//! };
//!
//! let resolution = resolve(&snapshot).unwrap();
//! let permissions = &resolution.permissions;
//! let folder = ActeeId::parse(&folder).unwrap();
//! let file = ActeeId::parse(&file).unwrap();
//!
//! // X reads the folder, and the file inherits it.
//! assert_eq!(permissions.bits(x, folder), PermissionBits(1));
//! assert_eq!(permissions.bits(x, file), PermissionBits(1));
//!
//! // Y's grant on the file stays on the file.
//! assert_eq!(permissions.bits(y, file), PermissionBits(2));
//! assert!(permissions.get(y, folder).is_none());
//! ```
//!
//! ## Data quality
//!
//! Purged actees, malformed identifiers and rows that reference them are left
//! out; an actee whose parent is not live becomes a root. These are reported
//! in [`Diagnostics`] and logged under the `acteeperms::diagnostics` target.
//! Only a parent cycle or a duplicated actee id fails the run, see
//! [`ResolveError`].
//!
//! ## Interrupting a run
//!
//! [`ResolverConfig`] takes a deadline and a [`CancelToken`]; both are checked
//! between propagation steps.

mod config;
mod diagnostics;
mod direct;
mod error;
mod expand;
mod forest;
mod model;
mod propagate;
mod reduce;
mod resolver;
mod source;

pub use config::{CancelToken, ResolverConfig, DEFAULT_PARALLEL_THRESHOLD};
pub use diagnostics::Diagnostics;
pub use direct::{DirectPermissionRecord, DirectPermissions, GrantSet, PermissionRecord};
pub use error::{ResolveError, ResolveResult, SourceError};
pub use expand::ImplicationClosure;
pub use forest::{ActeeForest, ActeeNode, Ancestors};
pub use model::{
    form_bits, verb_bits, Actee, ActeeId, ActorId, AssignmentScope, ImplicationEntry, PermissionBits,
    RoleAssignment, RoleId, RoleVerbGrant, Snapshot, Species, Verb, WILDCARD_ACTEE,
};
pub use propagate::PropagatedPermissions;
pub use reduce::{AccessDecision, EffectivePermission, EffectivePermissions};
pub use resolver::{resolve, Resolution, ResolveStats, Resolver};
pub use source::{InMemorySource, SnapshotSource};
