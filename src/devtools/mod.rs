//! Time-travel devtools integration.
//!
//! The extension is an injected capability: a handler built with a
//! [`DevToolsExtension`] and enabled [`DevToolsOptions`] connects once at
//! construction, mirrors every merged update with `send`, and replays
//! inbound `DISPATCH` messages:
//! - `RESET` re-emits the initial state and re-initializes the extension
//! - `COMMIT` re-emits the current state and re-initializes the extension
//! - `JUMP_TO_STATE` / `JUMP_TO_ACTION` emit the message's serialized state

mod connector;
mod types;

pub use connector::{
    with_dev_tools, ChannelConnector, ChannelExtension, ConnectorEvent, DevToolsConnector,
    DevToolsExtension, MessageHandler, UninstalledExtension,
};
pub use types::{
    ConnectOptions, DevToolsFeatures, DevToolsMessage, DevToolsOptions, DispatchCommand,
    MessagePayload,
};
