//! # Status Quo
//!
//! Observable application state for component-based UIs.
//!
//! ## Core Concepts
//!
//! - **Handlers**: Own a state value and fold partial updates into it, in call order
//! - **Snapshots**: Every update is published as a full state to all subscribers
//! - **Singletons**: One lazily built handler shared by every consumer
//! - **Bindings**: Re-render on each snapshot, tear down on unmount
//! - **Devtools**: Optional time-travel extension that can reset, commit and jump
//!
//! ## Example
//!
//! ```ignore
//! use serde_json::json;
//! use status_quo::StateHandler;
//!
//! let handler = StateHandler::new(json!({"a": 1, "b": 2}));
//!
//! let sub = handler.observe().subscribe(|state| println!("{state}"));
//! handler.set_state(json!({"a": 3})); // prints {"a":3,"b":2}
//! handler.set_state(json!({"a": 3})); // unchanged, suppressed
//!
//! sub.unsubscribe();
//! ```

pub mod bindings;
pub mod devtools;
pub mod error;
pub mod state;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use bindings::StateBinding;
pub use devtools::{
    ChannelConnector, ChannelExtension, ConnectOptions, ConnectorEvent, DevToolsConnector,
    DevToolsExtension, DevToolsFeatures, DevToolsMessage, DevToolsOptions, DispatchCommand,
    MessagePayload, UninstalledExtension,
};
pub use error::{Result, StateError};
pub use state::{
    fold_updates, make_state_singleton, shallow_merge, StateHandler, StateHandlerBuilder,
    StateHandlerOptions, StateSingleton, StateSubscriptionHandler,
};
pub use subscriptions::{
    Broadcaster, Observable, ObservableOptions, SnapshotReceiver, Subscription, SubscriptionId,
};
pub use types::{Accumulated, ActionName, StateValue};
