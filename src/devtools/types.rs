//! Devtools configuration and wire messages.

use crate::error::{Result, StateError};
use serde::{Deserialize, Serialize};

/// Devtools settings for one handler.
///
/// Deserializes from `{"enabled": true, "namespace": "Todos"}`; missing
/// fields take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DevToolsOptions {
    /// Connect to the devtools extension at construction.
    /// Default: false
    pub enabled: bool,

    /// Display name of the handler's instance in the extension.
    /// Default: "Store"
    pub namespace: String,
}

impl Default for DevToolsOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            namespace: "Store".to_string(),
        }
    }
}

impl DevToolsOptions {
    /// Enabled, under `namespace`.
    pub fn enabled(namespace: impl Into<String>) -> Self {
        Self {
            enabled: true,
            namespace: namespace.into(),
        }
    }

    /// Namespace lowercased with spaces replaced by dashes.
    pub fn instance_id(&self) -> String {
        self.namespace.to_lowercase().replace(' ', "-")
    }
}

/// Feature switches announced to the extension.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevToolsFeatures {
    /// Start/pause recording of dispatched actions.
    pub pause: bool,
    /// Lock/unlock dispatching actions and side effects.
    pub lock: bool,
    /// Persist states on page reload.
    pub persist: bool,
    /// Export history of actions to a file.
    pub export: bool,
    /// Import history of actions from a file.
    pub import: String,
    /// Jump back and forth (time travelling).
    pub jump: bool,
    /// Skip (cancel) actions.
    pub skip: bool,
    /// Drag and drop actions in the history list.
    pub reorder: bool,
    /// Dispatch custom actions from the extension.
    pub dispatch: bool,
    /// Generate tests for selected actions.
    pub test: bool,
}

impl Default for DevToolsFeatures {
    fn default() -> Self {
        Self {
            pause: true,
            lock: true,
            // Action creators are not bound to a handler across reloads.
            persist: false,
            export: true,
            import: "custom".to_string(),
            jump: true,
            skip: true,
            reorder: true,
            // Only meaningful for reducer-driven stores.
            dispatch: false,
            test: false,
        }
    }
}

/// Options passed to [`DevToolsExtension::connect`](super::DevToolsExtension::connect).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOptions {
    pub name: String,
    pub instance_id: String,
    /// Names of the handler's actions.
    pub action_creators: Vec<String>,
    pub features: DevToolsFeatures,
}

impl ConnectOptions {
    pub fn from_options(options: &DevToolsOptions, action_creators: Vec<String>) -> Self {
        Self {
            name: options.namespace.clone(),
            instance_id: options.instance_id(),
            action_creators,
            features: DevToolsFeatures::default(),
        }
    }
}

/// Inner payload of an inbound devtools message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "actionId", default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<u64>,
}

/// A message sent by the devtools extension to a handler.
///
/// Shape: `{type, payload: {type, actionId}, state, id, source}`, where
/// `state` is a serialized JSON string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevToolsMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<MessagePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Dispatch commands the handler reacts to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchCommand {
    /// Go back to the initial state.
    Reset,
    /// Make the current state the new baseline.
    Commit,
    /// Replace the state with the message's serialized state.
    JumpToState,
    /// Same as `JumpToState`.
    JumpToAction,
    /// Anything else; ignored.
    Other(String),
}

impl DispatchCommand {
    fn parse(kind: &str) -> Self {
        match kind {
            "RESET" => DispatchCommand::Reset,
            "COMMIT" => DispatchCommand::Commit,
            "JUMP_TO_STATE" => DispatchCommand::JumpToState,
            "JUMP_TO_ACTION" => DispatchCommand::JumpToAction,
            other => DispatchCommand::Other(other.to_string()),
        }
    }
}

impl DevToolsMessage {
    pub const DISPATCH: &'static str = "DISPATCH";

    /// Parse a raw JSON message.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| StateError::InvalidMessage(e.to_string()))
    }

    /// A `DISPATCH` message with the given payload type.
    pub fn dispatch(kind: impl Into<String>) -> Self {
        Self {
            kind: Self::DISPATCH.to_string(),
            payload: Some(MessagePayload {
                kind: kind.into(),
                action_id: None,
            }),
            source: Some("@devtools-extension".to_string()),
            ..Default::default()
        }
    }

    /// A `JUMP_TO_STATE` dispatch carrying `state` (serialized JSON).
    pub fn jump_to_state(state: impl Into<String>) -> Self {
        Self {
            state: Some(state.into()),
            ..Self::dispatch("JUMP_TO_STATE")
        }
    }

    /// The dispatch command, or `None` for non-dispatch messages.
    pub fn command(&self) -> Option<DispatchCommand> {
        if self.kind != Self::DISPATCH {
            return None;
        }
        let kind = self.payload.as_ref().map(|p| p.kind.as_str()).unwrap_or("");
        Some(DispatchCommand::parse(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_partial_json() {
        let options: DevToolsOptions = serde_json::from_str(r#"{"enabled": true}"#).unwrap();
        assert!(options.enabled);
        assert_eq!(options.namespace, "Store");

        let options: DevToolsOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, DevToolsOptions::default());
    }

    #[test]
    fn test_instance_id() {
        let options = DevToolsOptions::enabled("My Todo List");
        assert_eq!(options.instance_id(), "my-todo-list");
    }

    #[test]
    fn test_parse_extension_message() {
        let raw = r#"{
            "type": "DISPATCH",
            "payload": {"type": "JUMP_TO_ACTION", "actionId": 3},
            "state": "{\"a\":1}",
            "id": "store",
            "source": "@devtools-extension"
        }"#;

        let message = DevToolsMessage::from_json(raw).unwrap();
        assert_eq!(message.command(), Some(DispatchCommand::JumpToAction));
        assert_eq!(message.payload.as_ref().unwrap().action_id, Some(3));
        assert_eq!(message.state.as_deref(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_minimal_message() {
        let message =
            DevToolsMessage::from_json(r#"{"type":"DISPATCH","payload":{"type":"RESET"}}"#).unwrap();
        assert_eq!(message.command(), Some(DispatchCommand::Reset));
    }

    #[test]
    fn test_non_dispatch_has_no_command() {
        let message = DevToolsMessage {
            kind: "START".to_string(),
            ..Default::default()
        };
        assert_eq!(message.command(), None);
    }

    #[test]
    fn test_invalid_message() {
        let result = DevToolsMessage::from_json("not json");
        assert!(matches!(result, Err(StateError::InvalidMessage(_))));
    }

    #[test]
    fn test_feature_defaults() {
        let features = DevToolsFeatures::default();
        assert!(features.jump);
        assert!(!features.persist);
        assert!(!features.dispatch);
        assert_eq!(features.import, "custom");
    }
}
