//! Core types for state handlers.

use crate::state::merge::{shallow_merge, shallow_merge_value};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// A value that can be held by a [`StateHandler`](crate::StateHandler).
///
/// `merge` is a one-level merge: fields present in the partial overwrite the
/// matching fields of `self`, fields absent from the partial are kept. Nested
/// values are replaced wholesale.
///
/// Equality is deep value equality; it drives distinct-until-changed
/// suppression on snapshot streams.
pub trait StateValue:
    Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// A subset of this value's fields.
    type Partial: Send + 'static;

    /// Produce a new value with `partial` merged over `self`.
    fn merge(&self, partial: Self::Partial) -> Self;
}

impl StateValue for Map<String, Value> {
    type Partial = Map<String, Value>;

    fn merge(&self, partial: Self::Partial) -> Self {
        shallow_merge(self, partial)
    }
}

impl StateValue for Value {
    type Partial = Value;

    fn merge(&self, partial: Self::Partial) -> Self {
        shallow_merge_value(self, partial)
    }
}

/// Human-readable label attached to an update.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ActionName(pub String);

impl ActionName {
    /// Label of the seed accumulator.
    pub const INIT: &'static str = "init";

    /// Label used when the caller gives none.
    pub const CHANGE: &'static str = "change";

    pub fn init() -> Self {
        ActionName(Self::INIT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ActionName {
    fn default() -> Self {
        ActionName(Self::CHANGE.to_string())
    }
}

impl fmt::Debug for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Action({})", self.0)
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActionName {
    fn from(s: &str) -> Self {
        ActionName(s.to_string())
    }
}

impl From<String> for ActionName {
    fn from(s: String) -> Self {
        ActionName(s)
    }
}

/// The running accumulator of the update pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct Accumulated<S> {
    /// Action that produced `state`.
    pub action_name: ActionName,
    /// Full merged state.
    pub state: S,
}

impl<S> Accumulated<S> {
    /// The seed accumulator: `{ action_name: "init", state: initial }`.
    pub fn seed(initial: S) -> Self {
        Self {
            action_name: ActionName::init(),
            state: initial,
        }
    }
}

/// How a replacement should be mirrored to the devtools connector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Reinit {
    /// Leave the connector alone.
    No,
    /// Call `init(state)` on the connector after broadcasting.
    Yes,
}

/// A unit of work on the update queue.
pub(crate) enum Command<S: StateValue> {
    /// Merge a partial update into the running state.
    Merge {
        partial: S::Partial,
        action_name: ActionName,
    },
    /// Replace the running state wholesale (devtools replay).
    Replace { state: S, reinit: Reinit },
    /// Re-publish whatever the running state is when this command runs.
    Commit,
}

impl<S: StateValue> fmt::Debug for Command<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Merge { action_name, .. } => write!(f, "Merge({})", action_name),
            Command::Replace { reinit, .. } => write!(f, "Replace(reinit={:?})", reinit),
            Command::Commit => write!(f, "Commit"),
        }
    }
}
