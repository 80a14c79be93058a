//! The state handler: merge, publish, replay.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::merge::merge_step;
use crate::devtools::{
    with_dev_tools, ConnectOptions, DevToolsConnector, DevToolsExtension, DevToolsMessage,
    DevToolsOptions, DispatchCommand,
};
use crate::error::{Result, StateError};
use crate::subscriptions::{Broadcaster, Observable, ObservableOptions, Subscription};
use crate::types::{Accumulated, ActionName, Command, Reinit, StateValue};

/// Handler configuration.
///
/// Deserializes from `{"devTools": {"enabled": true, "namespace": "Todos"}}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StateHandlerOptions {
    pub dev_tools: DevToolsOptions,
}

/// A handler with its own action surface.
///
/// Types implementing this own a [`StateHandler`] and expose actions that
/// call [`StateHandler::set_state`]. Bindings and singletons work on this
/// trait.
pub trait StateSubscriptionHandler: Send + Sync + 'static {
    type State: StateValue;
    type Actions;

    /// The composed merge-and-publish machinery.
    fn state_handler(&self) -> &StateHandler<Self::State>;

    /// This handler's actions.
    fn actions(&self) -> Self::Actions;

    fn initial_state(&self) -> Self::State {
        self.state_handler().initial_state()
    }

    fn state(&self) -> Self::State {
        self.state_handler().state()
    }

    /// Snapshot stream with default options.
    fn observable(&self) -> Observable<Self::State> {
        self.state_handler().observe()
    }

    fn destroy(&self) {
        self.state_handler().destroy()
    }
}

/// Builder for [`StateHandler`].
pub struct StateHandlerBuilder<S: StateValue> {
    initial_state: S,
    options: StateHandlerOptions,
    extension: Option<Arc<dyn DevToolsExtension>>,
    action_creators: Vec<String>,
}

impl<S: StateValue> StateHandlerBuilder<S> {
    pub fn options(mut self, options: StateHandlerOptions) -> Self {
        self.options = options;
        self
    }

    /// Shorthand for enabling devtools under `namespace`.
    pub fn dev_tools(mut self, namespace: impl Into<String>) -> Self {
        self.options.dev_tools = DevToolsOptions::enabled(namespace);
        self
    }

    /// Host capability used to connect when devtools are enabled.
    pub fn dev_tools_extension(mut self, extension: Arc<dyn DevToolsExtension>) -> Self {
        self.extension = Some(extension);
        self
    }

    /// Action names announced to the devtools extension.
    pub fn action_creators<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.action_creators = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> StateHandler<S> {
        let dev_tools = &self.options.dev_tools;
        let connector = if dev_tools.enabled {
            let connect = ConnectOptions::from_options(dev_tools, self.action_creators);
            with_dev_tools(&self.initial_state, self.extension.as_deref(), &connect)
        } else {
            None
        };

        let (queue_tx, queue_rx) = unbounded();
        let inner = Arc::new(Inner {
            namespace: dev_tools.namespace.clone(),
            initial_state: self.initial_state.clone(),
            accumulator: Mutex::new(Accumulated::seed(self.initial_state.clone())),
            state: Broadcaster::new(self.initial_state),
            queue_tx,
            queue_rx,
            draining: AtomicBool::new(false),
            dev_tools: connector,
            subscriptions: Mutex::new(Vec::new()),
        });

        if let Some(connector) = &inner.dev_tools {
            let weak = Arc::downgrade(&inner);
            connector.subscribe(Arc::new(move |message: &DevToolsMessage| {
                match weak.upgrade() {
                    Some(inner) => inner.handle_dev_tools_message(message),
                    None => Ok(()),
                }
            }));
        }

        StateHandler { inner }
    }
}

/// Owns a state value and publishes every change as a full snapshot.
///
/// `set_state` merges a partial update into the running state; updates are
/// applied strictly in call order. Each merged state goes to the devtools
/// connector (if any) and is then broadcast to subscribers.
///
/// Cloning is cheap and yields a handle to the same state.
pub struct StateHandler<S: StateValue> {
    inner: Arc<Inner<S>>,
}

impl<S: StateValue> Clone for StateHandler<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: StateValue + fmt::Debug> fmt::Debug for StateHandler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateHandler")
            .field("namespace", &self.inner.namespace)
            .field("state", &self.inner.state.value())
            .field("dev_tools", &self.inner.dev_tools.is_some())
            .finish()
    }
}

impl<S: StateValue> StateHandler<S> {
    /// Handler without devtools.
    pub fn new(initial_state: S) -> Self {
        Self::builder(initial_state).build()
    }

    pub fn builder(initial_state: S) -> StateHandlerBuilder<S> {
        StateHandlerBuilder {
            initial_state,
            options: StateHandlerOptions::default(),
            extension: None,
            action_creators: Vec::new(),
        }
    }

    /// The value fixed at construction.
    pub fn initial_state(&self) -> S {
        self.inner.initial_state.clone()
    }

    /// The latest published snapshot.
    pub fn state(&self) -> S {
        self.inner.state.value()
    }

    /// Name of the action that produced the running state.
    pub fn last_action(&self) -> ActionName {
        self.inner.accumulator.lock().action_name.clone()
    }

    /// Merge `partial` under the default action name, `"change"`.
    pub fn set_state(&self, partial: S::Partial) {
        self.set_state_as(partial, ActionName::default());
    }

    /// Merge `partial` under `action_name`.
    ///
    /// Called from inside a listener, the update is queued and applied once
    /// the current broadcast has finished.
    pub fn set_state_as(&self, partial: S::Partial, action_name: impl Into<ActionName>) {
        self.inner.enqueue(Command::Merge {
            partial,
            action_name: action_name.into(),
        });
    }

    /// Snapshot stream. Subscribers get the latest snapshot first.
    pub fn observable(&self, options: ObservableOptions) -> Observable<S> {
        let stream = Observable::from_broadcaster(&self.inner.state);
        if options.use_distinct_until_changed {
            stream.distinct_until_changed()
        } else {
            stream
        }
    }

    /// Snapshot stream with adjacent duplicates suppressed.
    pub fn observe(&self) -> Observable<S> {
        self.observable(ObservableOptions::default())
    }

    /// Stream of one named field, emitted only when its value changes.
    ///
    /// A field missing from the serialized state reads as `null`.
    pub fn observable_item(&self, key: &str) -> Observable<Value> {
        let key = key.to_string();
        Observable::from_broadcaster(&self.inner.state)
            .map(move |state: &S| {
                serde_json::to_value(state)
                    .ok()
                    .and_then(|value| value.get(&key).cloned())
                    .unwrap_or(Value::Null)
            })
            .distinct_until_changed()
    }

    /// Stream of a derived value, emitted only when it changes.
    pub fn select<T, F>(&self, selector: F) -> Observable<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        Observable::from_broadcaster(&self.inner.state)
            .map(selector)
            .distinct_until_changed()
    }

    /// Keep `subscription` alive until [`destroy`](Self::destroy).
    pub fn track(&self, subscription: Subscription) {
        self.inner.subscriptions.lock().push(subscription);
    }

    /// Release every tracked subscription.
    pub fn destroy(&self) {
        let tracked = std::mem::take(&mut *self.inner.subscriptions.lock());
        tracing::debug!(
            namespace = %self.inner.namespace,
            count = tracked.len(),
            "releasing tracked subscriptions"
        );
        for subscription in tracked {
            subscription.unsubscribe();
        }
    }

    pub fn has_dev_tools(&self) -> bool {
        self.inner.dev_tools.is_some()
    }

    /// Replay an inbound devtools message.
    ///
    /// Connected handlers receive messages automatically; this entry point
    /// serves hosts that forward messages themselves.
    pub fn handle_dev_tools_message(&self, message: &DevToolsMessage) -> Result<()> {
        if self.inner.dev_tools.is_none() {
            return Err(StateError::DevToolsUnavailable);
        }
        self.inner.handle_dev_tools_message(message)
    }

    /// Number of snapshot subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.subscriber_count()
    }
}

struct Inner<S: StateValue> {
    namespace: String,
    initial_state: S,
    /// Running fold of all updates.
    accumulator: Mutex<Accumulated<S>>,
    /// Published snapshots.
    state: Arc<Broadcaster<S>>,
    queue_tx: Sender<Command<S>>,
    queue_rx: Receiver<Command<S>>,
    /// Set while one caller is applying queued commands.
    draining: AtomicBool,
    dev_tools: Option<Arc<dyn DevToolsConnector>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

/// Clears the draining flag even if a listener panics.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: StateValue> Inner<S> {
    fn enqueue(&self, command: Command<S>) {
        tracing::trace!(namespace = %self.namespace, ?command, "queued");
        // The receiver lives as long as `self`.
        let _ = self.queue_tx.send(command);
        self.drain();
    }

    /// Apply queued commands until the queue is empty.
    ///
    /// Only one caller drains at a time; a nested or concurrent call returns
    /// at once and leaves its command to the active drainer.
    fn drain(&self) {
        while !self.queue_rx.is_empty() {
            if self
                .draining
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }
            let _guard = DrainGuard(&self.draining);
            while let Ok(command) = self.queue_rx.try_recv() {
                self.apply(command);
            }
        }
    }

    fn apply(&self, command: Command<S>) {
        match command {
            Command::Merge {
                partial,
                action_name,
            } => {
                let next = {
                    let mut accumulator = self.accumulator.lock();
                    let next = merge_step(&accumulator, partial, action_name);
                    *accumulator = next.clone();
                    next
                };
                tracing::debug!(
                    namespace = %self.namespace,
                    action = %next.action_name,
                    "state updated"
                );

                if let Some(connector) = &self.dev_tools {
                    if let Some(value) = self.to_json(&next.state) {
                        connector.send(next.action_name.as_str(), &value);
                    }
                }
                self.state.next(next.state);
            }

            Command::Replace { state, reinit } => self.replace(state, reinit),

            Command::Commit => {
                // Current as of now, after any merges queued ahead of the commit.
                let current = self.accumulator.lock().state.clone();
                self.replace(current, Reinit::Yes);
            }
        }
    }

    fn replace(&self, state: S, reinit: Reinit) {
        self.accumulator.lock().state = state.clone();
        tracing::debug!(namespace = %self.namespace, ?reinit, "state replaced");

        self.state.next(state.clone());
        if reinit == Reinit::Yes {
            if let Some(connector) = &self.dev_tools {
                if let Some(value) = self.to_json(&state) {
                    connector.init(&value);
                }
            }
        }
    }

    fn handle_dev_tools_message(&self, message: &DevToolsMessage) -> Result<()> {
        let Some(command) = message.command() else {
            tracing::trace!(namespace = %self.namespace, kind = %message.kind, "ignoring message");
            return Ok(());
        };

        match command {
            DispatchCommand::Reset => self.enqueue(Command::Replace {
                state: self.initial_state.clone(),
                reinit: Reinit::Yes,
            }),
            DispatchCommand::Commit => self.enqueue(Command::Commit),
            DispatchCommand::JumpToState | DispatchCommand::JumpToAction => {
                let state = self.decode_jump(message).map_err(|e| {
                    tracing::error!(namespace = %self.namespace, error = %e, "cannot jump to state");
                    e
                })?;
                self.enqueue(Command::Replace {
                    state,
                    reinit: Reinit::No,
                });
            }
            DispatchCommand::Other(kind) => {
                tracing::debug!(namespace = %self.namespace, %kind, "ignoring dispatch");
            }
        }
        Ok(())
    }

    fn decode_jump(&self, message: &DevToolsMessage) -> Result<S> {
        let raw = message.state.as_deref().ok_or(StateError::MissingJumpState)?;
        serde_json::from_str(raw).map_err(|e| StateError::Deserialization(e.to_string()))
    }

    fn to_json(&self, state: &S) -> Option<Value> {
        match encode(state) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(namespace = %self.namespace, error = %e, "could not serialize state");
                None
            }
        }
    }
}

/// Encode a state for the devtools connector.
fn encode<S: Serialize>(state: &S) -> Result<Value> {
    Ok(serde_json::to_value(state)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devtools::{ChannelConnector, ChannelExtension, ConnectorEvent};
    use serde_json::json;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct TestState {
        test: String,
        test2: String,
    }

    #[derive(Default)]
    struct TestPartial {
        test: Option<String>,
        test2: Option<String>,
    }

    impl TestPartial {
        fn test(value: &str) -> Self {
            Self {
                test: Some(value.to_string()),
                ..Default::default()
            }
        }
    }

    impl StateValue for TestState {
        type Partial = TestPartial;

        fn merge(&self, partial: TestPartial) -> Self {
            Self {
                test: partial.test.unwrap_or_else(|| self.test.clone()),
                test2: partial.test2.unwrap_or_else(|| self.test2.clone()),
            }
        }
    }

    fn initial() -> TestState {
        TestState {
            test: "testValue".to_string(),
            test2: "testValue2".to_string(),
        }
    }

    fn record<T: Clone + Send + Sync + 'static>(
        observable: &Observable<T>,
    ) -> (Arc<Mutex<Vec<T>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = observable.subscribe(move |value: &T| sink.lock().push(value.clone()));
        (seen, sub)
    }

    #[test]
    fn test_initial_and_current_state() {
        let handler = StateHandler::new(initial());
        assert_eq!(handler.initial_state(), initial());
        assert_eq!(handler.state(), initial());
        assert_eq!(handler.last_action().as_str(), "init");
    }

    #[test]
    fn test_set_state_merges_first_level() {
        let handler = StateHandler::new(initial());
        handler.set_state(TestPartial::test("change"));

        let expected = TestState {
            test: "change".to_string(),
            test2: "testValue2".to_string(),
        };
        assert_eq!(handler.state(), expected);
        assert_eq!(handler.initial_state(), initial());
        assert_eq!(handler.last_action().as_str(), "change");
    }

    #[test]
    fn test_subscriber_called_only_on_change() {
        let handler = StateHandler::new(initial());
        let (seen, _sub) = record(&handler.observe());

        handler.set_state(TestPartial::test("test"));
        handler.set_state(TestPartial::test("test2"));
        handler.set_state(TestPartial::test("test2"));
        handler.set_state(TestPartial::test("test2"));

        // initial, "test", "test2"
        assert_eq!(seen.lock().len(), 3);
    }

    #[test]
    fn test_without_dedup_every_update_emits() {
        let handler = StateHandler::new(initial());
        let (seen, _sub) = record(&handler.observable(ObservableOptions::all()));

        handler.set_state(TestPartial::test("same"));
        handler.set_state(TestPartial::test("same"));

        assert_eq!(seen.lock().len(), 3);
    }

    #[test]
    fn test_destroy_releases_tracked_subscriptions() {
        let handler = StateHandler::new(initial());
        let other = Broadcaster::new(0);
        let (seen, sub) = record(&Observable::from_broadcaster(&other));
        handler.track(sub);

        other.next(1);
        handler.destroy();
        other.next(2);
        other.next(3);

        assert_eq!(*seen.lock(), vec![0, 1]);
        assert_eq!(other.subscriber_count(), 0);
    }

    #[test]
    fn test_reentrant_set_state_is_fifo() {
        let handler = StateHandler::new(json!({"count": 0, "log": []}));
        let (seen, _sub) = record(&handler.observable(ObservableOptions::all()));

        let inner = handler.clone();
        let _follow_up = handler.observe().subscribe(move |state: &Value| {
            if state["count"] == 1 {
                inner.set_state_as(json!({"count": 2}), "follow-up");
            }
        });

        handler.set_state(json!({"count": 1}));
        handler.set_state(json!({"count": 3}));

        let counts: Vec<Value> = seen.lock().iter().map(|s| s["count"].clone()).collect();
        assert_eq!(counts, vec![json!(0), json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_observable_item_emits_on_field_change() {
        let handler = StateHandler::new(json!({"a": 1, "b": 2}));
        let (seen, _sub) = record(&handler.observable_item("a"));

        handler.set_state(json!({"b": 3}));
        handler.set_state(json!({"a": 5}));
        handler.set_state(json!({"b": 4}));

        assert_eq!(*seen.lock(), vec![json!(1), json!(5)]);
    }

    #[test]
    fn test_select_typed_field() {
        let handler = StateHandler::new(initial());
        let (seen, _sub) = record(&handler.select(|s: &TestState| s.test2.clone()));

        handler.set_state(TestPartial::test("x"));
        handler.set_state(TestPartial {
            test2: Some("y".to_string()),
            ..Default::default()
        });

        assert_eq!(*seen.lock(), vec!["testValue2".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_dev_tools_receive_every_update() {
        let (connector, events) = ChannelConnector::new();
        let handler = StateHandler::builder(json!({"a": 1}))
            .dev_tools("Test")
            .dev_tools_extension(Arc::new(ChannelExtension::new(connector)))
            .build();

        handler.set_state_as(json!({"a": 2}), "bump");

        assert_eq!(
            events.try_iter().collect::<Vec<_>>(),
            vec![
                ConnectorEvent::Init {
                    state: json!({"a": 1})
                },
                ConnectorEvent::Send {
                    action: "bump".to_string(),
                    state: json!({"a": 2})
                },
            ]
        );
    }

    #[test]
    fn test_dev_tools_disabled_ignores_extension() {
        let (connector, events) = ChannelConnector::new();
        let handler = StateHandler::builder(json!({}))
            .dev_tools_extension(Arc::new(ChannelExtension::new(Arc::clone(&connector))))
            .build();

        assert!(!handler.has_dev_tools());
        assert!(events.try_recv().is_err());
        assert_eq!(connector.handler_count(), 0);
    }

    #[test]
    fn test_handle_message_without_dev_tools() {
        let handler = StateHandler::new(json!({}));
        let result = handler.handle_dev_tools_message(&DevToolsMessage::dispatch("RESET"));
        assert!(matches!(result, Err(StateError::DevToolsUnavailable)));
    }

    #[test]
    fn test_encode_failure_is_serialization_error() {
        let mut unencodable = std::collections::HashMap::new();
        unencodable.insert((1u8, 2u8), "tuple keys have no JSON form");

        assert!(matches!(
            encode(&unencodable),
            Err(StateError::Serialization(_))
        ));
        assert_eq!(encode(&json!({"a": 1})).unwrap(), json!({"a": 1}));
    }
}
