//! Connection to a time-travel devtools extension.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::types::{ConnectOptions, DevToolsMessage};
use crate::error::Result;

/// Callback receiving inbound devtools messages.
pub type MessageHandler = Arc<dyn Fn(&DevToolsMessage) -> Result<()> + Send + Sync>;

/// An open connection to the devtools extension.
pub trait DevToolsConnector: Send + Sync {
    /// Reset the extension's history to `state`.
    fn init(&self, state: &Value);

    /// Record that `action` produced `state`.
    fn send(&self, action: &str, state: &Value);

    /// Register a handler for inbound messages.
    fn subscribe(&self, handler: MessageHandler);
}

/// The host capability that opens connections.
pub trait DevToolsExtension: Send + Sync {
    /// Open a connection. `None` means the extension is not installed.
    fn connect(&self, options: &ConnectOptions) -> Option<Arc<dyn DevToolsConnector>>;
}

/// Connect to the devtools extension and seed it with `initial`.
///
/// A missing host (`extension` is `None`) degrades silently. A host whose
/// extension is not installed logs an error. Either way no connector is
/// returned and the handler runs without devtools.
pub fn with_dev_tools<S: Serialize>(
    initial: &S,
    extension: Option<&dyn DevToolsExtension>,
    options: &ConnectOptions,
) -> Option<Arc<dyn DevToolsConnector>> {
    let Some(extension) = extension else {
        tracing::debug!(name = %options.name, "no devtools host, continuing without devtools");
        return None;
    };

    let Some(connector) = extension.connect(options) else {
        tracing::error!(name = %options.name, "Devtools extension is not installed");
        return None;
    };

    match serde_json::to_value(initial) {
        Ok(state) => connector.init(&state),
        Err(e) => tracing::warn!(name = %options.name, error = %e, "could not serialize initial state"),
    }

    tracing::debug!(name = %options.name, instance_id = %options.instance_id, "devtools connected");
    Some(connector)
}

/// Outbound call recorded by a [`ChannelConnector`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConnectorEvent {
    Init { state: Value },
    Send { action: String, state: Value },
}

/// In-process connector that forwards outbound calls into a channel and
/// lets the owner inject inbound messages.
///
/// Bridges handlers to an external devtools transport, and doubles as a
/// connector for tests.
pub struct ChannelConnector {
    events: Sender<ConnectorEvent>,
    handlers: RwLock<Vec<MessageHandler>>,
    /// Options of the last `connect` call.
    connected_as: Mutex<Option<ConnectOptions>>,
}

impl ChannelConnector {
    /// Create a connector and the receiving end of its outbound events.
    pub fn new() -> (Arc<Self>, Receiver<ConnectorEvent>) {
        let (events, receiver) = unbounded();
        let connector = Arc::new(Self {
            events,
            handlers: RwLock::new(Vec::new()),
            connected_as: Mutex::new(None),
        });
        (connector, receiver)
    }

    /// Deliver an inbound message to every handler.
    ///
    /// All handlers run; the first error is returned.
    pub fn dispatch(&self, message: &DevToolsMessage) -> Result<()> {
        let handlers: Vec<MessageHandler> = self.handlers.read().iter().cloned().collect();

        let mut first_error = None;
        for handler in handlers {
            if let Err(e) = handler(message) {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Parse and deliver a raw JSON message.
    pub fn dispatch_json(&self, raw: &str) -> Result<()> {
        let message = DevToolsMessage::from_json(raw)?;
        self.dispatch(&message)
    }

    /// Get handler count.
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Options the connector was last connected with.
    pub fn connected_as(&self) -> Option<ConnectOptions> {
        self.connected_as.lock().clone()
    }

    fn emit(&self, event: ConnectorEvent) {
        // Receiver gone means nobody is watching.
        let _ = self.events.send(event);
    }
}

impl DevToolsConnector for ChannelConnector {
    fn init(&self, state: &Value) {
        self.emit(ConnectorEvent::Init {
            state: state.clone(),
        });
    }

    fn send(&self, action: &str, state: &Value) {
        self.emit(ConnectorEvent::Send {
            action: action.to_string(),
            state: state.clone(),
        });
    }

    fn subscribe(&self, handler: MessageHandler) {
        self.handlers.write().push(handler);
    }
}

/// Extension that always connects to the same [`ChannelConnector`].
pub struct ChannelExtension {
    connector: Arc<ChannelConnector>,
}

impl ChannelExtension {
    pub fn new(connector: Arc<ChannelConnector>) -> Self {
        Self { connector }
    }
}

impl DevToolsExtension for ChannelExtension {
    fn connect(&self, options: &ConnectOptions) -> Option<Arc<dyn DevToolsConnector>> {
        *self.connector.connected_as.lock() = Some(options.clone());
        let connector: Arc<dyn DevToolsConnector> = self.connector.clone();
        Some(connector)
    }
}

/// A host that supports devtools but has no extension installed.
#[derive(Clone, Copy, Debug, Default)]
pub struct UninstalledExtension;

impl DevToolsExtension for UninstalledExtension {
    fn connect(&self, _options: &ConnectOptions) -> Option<Arc<dyn DevToolsConnector>> {
        None
    }
}
