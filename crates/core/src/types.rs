//! Domain types for the respool resource pool.

use crate::error::{PoolError, PoolResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Identifier of a pooled resource, unique within one pool.
///
/// Displays as the bare integer so journal lines read `... ID: 7`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub u64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ResourceId {
    fn from(id: u64) -> Self {
        ResourceId(id)
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    Idle,
    InUse,
    UnderMaintenance,
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceState::Idle => "idle",
            ResourceState::InUse => "in use",
            ResourceState::UnderMaintenance => "under maintenance",
        })
    }
}

/// A requested state change. The pool names the move; the table in
/// [`ResourceState::apply`] decides whether it is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Allocate,
    /// Checked release: only `InUse` (or an already `Idle` resource) may
    /// return to `Idle`.
    Release,
    /// Unchecked release: any state is forced back to `Idle`.
    ForceRelease,
    BeginMaintenance,
    EndMaintenance,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Transition::Allocate => "allocate",
            Transition::Release => "release",
            Transition::ForceRelease => "force release",
            Transition::BeginMaintenance => "begin maintenance",
            Transition::EndMaintenance => "end maintenance",
        })
    }
}

impl ResourceState {
    /// The transition table. Returns the target state, or `None` if the
    /// move is illegal from `self`.
    ///
    /// ```text
    /// Idle             --Allocate-------->  InUse
    /// InUse            --Release--------->  Idle
    /// Idle             --Release--------->  Idle   (idempotent)
    /// *                --ForceRelease---->  Idle
    /// Idle             --BeginMaintenance-> UnderMaintenance
    /// UnderMaintenance --EndMaintenance--> Idle
    /// ```
    pub const fn apply(self, transition: Transition) -> Option<ResourceState> {
        use ResourceState::*;
        use Transition::*;

        match (self, transition) {
            (Idle, Allocate) => Some(InUse),
            (InUse | Idle, Release) => Some(Idle),
            (_, ForceRelease) => Some(Idle),
            (Idle, BeginMaintenance) => Some(UnderMaintenance),
            (UnderMaintenance, EndMaintenance) => Some(Idle),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_idle(self) -> bool {
        matches!(self, ResourceState::Idle)
    }
}

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// A pooled resource. Created `Idle`; its state only moves through
/// [`Resource::transition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    id: ResourceId,
    state: ResourceState,
}

impl Resource {
    pub fn new(id: ResourceId) -> Self {
        Self {
            id,
            state: ResourceState::Idle,
        }
    }

    #[inline]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    #[inline]
    pub fn state(&self) -> ResourceState {
        self.state
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    /// Checks `transition` against the table and, if legal, applies it.
    /// On rejection the state is left untouched.
    pub fn transition(&mut self, transition: Transition) -> PoolResult<ResourceState> {
        let next = self.check(transition)?;
        self.state = next;
        Ok(next)
    }

    /// Same check as [`transition`](Self::transition) without mutating.
    /// Lets the pool journal a move before committing it.
    pub fn check(&self, transition: Transition) -> PoolResult<ResourceState> {
        self.state
            .apply(transition)
            .ok_or(PoolError::InvalidTransition {
                id: self.id,
                from: self.state,
                transition,
            })
    }
}

// ---------------------------------------------------------------------------
// Journal entries
// ---------------------------------------------------------------------------

const ALLOCATED_PREFIX: &str = "Allocated resource ID: ";
const RELEASED_PREFIX: &str = "Released resource ID: ";

/// One committed transaction, as it appears in the journal.
///
/// `Display` yields the journal line without its trailing newline;
/// `FromStr` parses it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "event", content = "resource_id", rename_all = "snake_case")]
pub enum JournalEntry {
    Allocated(ResourceId),
    Released(ResourceId),
}

impl JournalEntry {
    pub fn resource_id(&self) -> ResourceId {
        match *self {
            JournalEntry::Allocated(id) | JournalEntry::Released(id) => id,
        }
    }

    /// True for a non-empty line that stops inside an entry's fixed prefix,
    /// i.e. what a write interrupted before the ID leaves behind.
    pub fn is_torn_fragment(line: &str) -> bool {
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        !line.is_empty()
            && (ALLOCATED_PREFIX.starts_with(line) || RELEASED_PREFIX.starts_with(line))
    }
}

impl fmt::Display for JournalEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JournalEntry::Allocated(id) => write!(f, "{ALLOCATED_PREFIX}{id}"),
            JournalEntry::Released(id) => write!(f, "{RELEASED_PREFIX}{id}"),
        }
    }
}

impl FromStr for JournalEntry {
    type Err = PoolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        let invalid = || PoolError::InvalidJournalLine(line.to_string());

        let (ctor, digits): (fn(ResourceId) -> JournalEntry, &str) =
            if let Some(rest) = line.strip_prefix(ALLOCATED_PREFIX) {
                (JournalEntry::Allocated, rest)
            } else if let Some(rest) = line.strip_prefix(RELEASED_PREFIX) {
                (JournalEntry::Released, rest)
            } else {
                return Err(invalid());
            };

        let id = digits.parse::<u64>().map_err(|_| invalid())?;
        Ok(ctor(ResourceId(id)))
    }
}
