//! State handlers and their supporting pieces.
//!
//! A handler folds partial updates into a running state, one update at a
//! time and in call order, and publishes each result as a full snapshot.

mod handler;
pub mod merge;
mod singleton;

pub use handler::{StateHandler, StateHandlerBuilder, StateHandlerOptions, StateSubscriptionHandler};
pub use merge::{fold_updates, shallow_merge, shallow_merge_value};
pub use singleton::{make_state_singleton, StateSingleton};
