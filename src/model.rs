//! Input records and identifier types.
//!
//! Everything here is a plain, read-only view over a snapshot handed in by an
//! external store. Actee identifiers stay textual at this layer because the
//! store may hold rows whose ids are not well-formed; the resolver parses
//! them and reports what it had to drop.

use std::borrow::Cow;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Literal the store uses for an assignment that applies to every actee.
pub const WILDCARD_ACTEE: &str = "*";

/// Identifier of a live, well-formed actee.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActeeId(Uuid);

impl ActeeId {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Length of the hyphenated textual form.
    const TEXT_LEN: usize = 36;

    /// Parses a textual identifier, returning `None` when it is malformed.
    ///
    /// Only the bare hyphenated form is accepted; surrounding whitespace,
    /// braces, `urn:uuid:` prefixes and the simple form are malformed. Hex
    /// digits match in either case, so `ABC...` and `abc...` name the same actee.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() != Self::TEXT_LEN {
            return None;
        }
        Uuid::try_parse(raw).ok().map(Self)
    }
}

impl fmt::Display for ActeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for ActeeId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

macro_rules! impl_integer_id {
    ($t:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $t(pub u64);

        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<u64> for $t {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

impl_integer_id!(ActorId, "Identifier of the subject receiving a role.");
impl_integer_id!(RoleId, "Identifier of a role.");

macro_rules! impl_name {
    ($t:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(Cow<'static, str>);

        impl $t {
            pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
                Self(name.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&'static str> for $t {
            fn from(value: &'static str) -> Self {
                Self::new(value)
            }
        }
    };
}

impl_name!(
    Species,
    "Type tag shared by actees and the verbs that act on them (e.g. `form`, `project`)."
);
impl_name!(Verb, "Named permission action (e.g. `read`, `update`).");

/// A set of permission bits.
///
/// Combined with bitwise OR, which makes every aggregation in the resolver
/// independent of the order rows are visited in.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PermissionBits(pub u64);

impl PermissionBits {
    pub const EMPTY: Self = Self(0);

    /// Every bit corresponding to a positive power of two in a signed 64-bit
    /// integer. This is what a verb without a bit position grants.
    pub const ALL: Self = Self(i64::MAX as u64);

    /// Highest bit position a verb may occupy.
    pub const MAX_POSITION: u8 = 62;

    /// Bits for a verb at `position`, or `None` when the position is out of range.
    pub fn at_position(position: u8) -> Option<Self> {
        (position <= Self::MAX_POSITION).then(|| Self(1 << position))
    }

    /// Bits for a verb declared with an optional position; no position means [`Self::ALL`].
    pub fn for_verb_position(position: Option<u8>) -> Option<Self> {
        match position {
            Some(p) => Self::at_position(p),
            None => Some(Self::ALL),
        }
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every bit in `other` is also set in `self`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Bits set in `required` but not in `self`.
    pub fn missing(self, required: Self) -> Self {
        Self(required.0 & !self.0)
    }
}

impl BitOr for PermissionBits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PermissionBits {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for PermissionBits {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for PermissionBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#b}", self.0)
    }
}

/// Bit positions of the standard verbs.
pub mod verb_bits {
    use super::PermissionBits;

    pub const CREATE: PermissionBits = PermissionBits(1 << 0);
    pub const READ: PermissionBits = PermissionBits(1 << 1);
    pub const UPDATE: PermissionBits = PermissionBits(1 << 2);
    pub const DELETE: PermissionBits = PermissionBits(1 << 3);
    pub const LIST: PermissionBits = PermissionBits(1 << 4);
    pub const RESTORE: PermissionBits = PermissionBits(1 << 5);
    pub const END: PermissionBits = PermissionBits(1 << 6);
    pub const INVALIDATE: PermissionBits = PermissionBits(1 << 7);
    pub const RESET: PermissionBits = PermissionBits(1 << 8);
    pub const RUN: PermissionBits = PermissionBits(1 << 9);
    pub const SET: PermissionBits = PermissionBits(1 << 10);

    /// Looks up the bits of a standard verb by name.
    pub fn by_name(verb: &str) -> Option<PermissionBits> {
        let bits = match verb {
            "create" => CREATE,
            "read" => READ,
            "update" => UPDATE,
            "delete" => DELETE,
            "list" => LIST,
            "restore" => RESTORE,
            "end" => END,
            "invalidate" => INVALIDATE,
            "reset" => RESET,
            "run" => RUN,
            "set" => SET,
            _ => return None,
        };
        Some(bits)
    }

    /// Looks up the bits of `verb` as declared for `species`, falling back to
    /// the standard verbs.
    pub fn for_species(species: &str, verb: &str) -> Option<PermissionBits> {
        match species {
            "form" => super::form_bits::by_name(verb).or_else(|| by_name(verb)),
            _ => by_name(verb),
        }
    }
}

/// Verbs only the `form` species declares. Their positions reuse bits that
/// mean something else on other species.
pub mod form_bits {
    use super::PermissionBits;

    /// Read a form while it is open; implied by `form.read`.
    pub const READ_OPEN: PermissionBits = PermissionBits(1 << 6);
    /// List a form while it is open; implied by `form.list`.
    pub const LIST_OPEN: PermissionBits = PermissionBits(1 << 7);

    pub fn by_name(verb: &str) -> Option<PermissionBits> {
        match verb {
            "read_open" => Some(READ_OPEN),
            "list_open" => Some(LIST_OPEN),
            _ => None,
        }
    }
}

/// A protected object as stored, before identifier validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actee {
    pub id: String,
    pub species: Species,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub purged: bool,
}

impl Actee {
    pub fn new(id: impl Into<String>, species: impl Into<Species>) -> Self {
        Self {
            id: id.into(),
            species: species.into(),
            parent: None,
            purged: false,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn purged(mut self) -> Self {
        self.purged = true;
        self
    }
}

/// Which actees an assignment applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssignmentScope {
    /// Applies to every live actee.
    AllActees,
    /// Applies to exactly one actee, if it is live.
    Specific(String),
}

impl AssignmentScope {
    pub fn specific(id: impl fmt::Display) -> Self {
        Self::Specific(id.to_string())
    }
}

impl From<String> for AssignmentScope {
    fn from(value: String) -> Self {
        if value == WILDCARD_ACTEE {
            Self::AllActees
        } else {
            Self::Specific(value)
        }
    }
}

impl From<AssignmentScope> for String {
    fn from(value: AssignmentScope) -> Self {
        match value {
            AssignmentScope::AllActees => WILDCARD_ACTEE.to_string(),
            AssignmentScope::Specific(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub actor_id: ActorId,
    pub role_id: RoleId,
    pub scope: AssignmentScope,
}

impl RoleAssignment {
    pub fn new(actor_id: ActorId, role_id: RoleId, scope: AssignmentScope) -> Self {
        Self {
            actor_id,
            role_id,
            scope,
        }
    }
}

/// A verb a role grants, scoped to one species.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleVerbGrant {
    pub role_id: RoleId,
    pub species: Species,
    pub verb: Verb,
}

impl RoleVerbGrant {
    pub fn new(role_id: RoleId, species: impl Into<Species>, verb: impl Into<Verb>) -> Self {
        Self {
            role_id,
            species: species.into(),
            verb: verb.into(),
        }
    }
}

/// One row of the precomputed verb implication closure.
///
/// Holding `verb` on `species` grants `implied_bits`, or `bits` when no
/// implied value is recorded. A non-null `implied_species` restricts the row
/// to grants made on that species.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplicationEntry {
    pub species: Species,
    pub verb: Verb,
    pub bits: PermissionBits,
    #[serde(default)]
    pub implied_species: Option<Species>,
    #[serde(default)]
    pub implied_bits: Option<PermissionBits>,
}

impl ImplicationEntry {
    /// The un-expanded row every verb carries for itself.
    pub fn own(species: impl Into<Species>, verb: impl Into<Verb>, bits: PermissionBits) -> Self {
        Self {
            species: species.into(),
            verb: verb.into(),
            bits,
            implied_species: None,
            implied_bits: None,
        }
    }

    /// A row stating that `verb` on `species` also grants `implied_bits` on `implied_species`.
    pub fn implies(
        species: impl Into<Species>,
        verb: impl Into<Verb>,
        bits: PermissionBits,
        implied_species: impl Into<Species>,
        implied_bits: PermissionBits,
    ) -> Self {
        Self {
            species: species.into(),
            verb: verb.into(),
            bits,
            implied_species: Some(implied_species.into()),
            implied_bits: Some(implied_bits),
        }
    }

    /// Bits this row contributes.
    pub fn granted_bits(&self) -> PermissionBits {
        self.implied_bits.unwrap_or(self.bits)
    }
}

/// The complete read-only input of one resolution run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub actees: Vec<Actee>,
    #[serde(default)]
    pub assignments: Vec<RoleAssignment>,
    #[serde(default)]
    pub role_verbs: Vec<RoleVerbGrant>,
    #[serde(default)]
    pub implications: Vec<ImplicationEntry>,
}
