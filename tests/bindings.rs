//! Singleton and render-binding lifecycle tests.

use parking_lot::Mutex;
use serde_json::{json, Value};
use status_quo::{
    make_state_singleton, StateBinding, StateHandler, StateSubscriptionHandler, Subscription,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Counter {
    state: StateHandler<Value>,
    destroyed: AtomicUsize,
}

#[derive(Clone)]
struct CounterActions {
    state: StateHandler<Value>,
}

impl CounterActions {
    fn increment(&self) {
        let n = self.state.state()["count"].as_i64().unwrap_or(0);
        self.state.set_state_as(json!({ "count": n + 1 }), "increment");
    }
}

impl Counter {
    fn new() -> Self {
        Self {
            state: StateHandler::new(json!({"count": 0, "label": "clicks"})),
            destroyed: AtomicUsize::new(0),
        }
    }
}

impl StateSubscriptionHandler for Counter {
    type State = Value;
    type Actions = CounterActions;

    fn state_handler(&self) -> &StateHandler<Value> {
        &self.state
    }

    fn actions(&self) -> CounterActions {
        CounterActions {
            state: self.state.clone(),
        }
    }

    fn destroy(&self) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        self.state.destroy();
    }
}

fn renders() -> (Arc<Mutex<Vec<Value>>>, impl Fn(&Value) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |state: &Value| sink.lock().push(state.clone()))
}

#[test]
fn test_binding_renders_each_snapshot() {
    let (seen, render) = renders();
    let binding = StateBinding::from_factory(Counter::new, render);

    assert_eq!(binding.state(), json!({"count": 0, "label": "clicks"}));
    assert_eq!(binding.render_count(), 1);

    binding.actions().increment();
    binding.actions().increment();

    assert_eq!(binding.state()["count"], 2);
    assert_eq!(binding.render_count(), 3);
    assert_eq!(seen.lock().last().unwrap()["count"], 2);
}

#[test]
fn test_unmount_unsubscribes_and_destroys() {
    let (seen, render) = renders();
    let binding = StateBinding::from_factory(Counter::new, render);
    let handler = Arc::clone(binding.handler());
    let actions = binding.actions().clone();

    binding.unmount();

    assert_eq!(handler.destroyed.load(Ordering::SeqCst), 1);
    assert_eq!(handler.state_handler().subscriber_count(), 0);

    actions.increment();
    assert_eq!(seen.lock().len(), 1);
    assert_eq!(handler.state()["count"], 1);
}

#[test]
fn test_drop_tears_down_once() {
    let handler = Arc::new(Counter::new());
    {
        let _binding = StateBinding::mount(Arc::clone(&handler), |_: &Value| {});
        assert_eq!(handler.state_handler().subscriber_count(), 1);
    }
    assert_eq!(handler.destroyed.load(Ordering::SeqCst), 1);
    assert_eq!(handler.state_handler().subscriber_count(), 0);
}

#[test]
fn test_unmount_releases_handler_tracked_subscriptions() {
    let upstream = StateHandler::new(json!({"tick": 0}));
    let handler = Arc::new(Counter::new());

    let mirror = handler.actions();
    let sub: Subscription = upstream.observe().subscribe(move |_: &Value| mirror.increment());
    handler.state_handler().track(sub);

    let binding = StateBinding::mount(Arc::clone(&handler), |_: &Value| {});
    upstream.set_state(json!({"tick": 1}));
    assert_eq!(binding.state()["count"], 2);

    binding.unmount();
    upstream.set_state(json!({"tick": 2}));
    assert_eq!(handler.state()["count"], 2);
    assert_eq!(upstream.subscriber_count(), 0);
}

#[test]
fn test_singleton_bindings_share_instance() {
    let singleton = make_state_singleton(Counter::new);

    let (first_seen, first_render) = renders();
    let (second_seen, second_render) = renders();
    let first = StateBinding::from_singleton(&singleton, first_render);
    let second = StateBinding::from_singleton(&singleton, second_render);

    assert!(Arc::ptr_eq(first.handler(), second.handler()));

    first.actions().increment();

    assert_eq!(first.state()["count"], 1);
    assert_eq!(second.state()["count"], 1);
    assert_eq!(first_seen.lock().len(), 2);
    assert_eq!(second_seen.lock().len(), 2);

    // One consumer leaving does not stop the other.
    first.unmount();
    second.actions().increment();
    assert_eq!(second.state()["count"], 2);
    assert_eq!(first_seen.lock().len(), 2);
}

#[test]
fn test_singleton_survives_remount() {
    let singleton = make_state_singleton(Counter::new);

    let binding = StateBinding::from_singleton(&singleton, |_: &Value| {});
    binding.actions().increment();
    binding.unmount();

    let binding = StateBinding::from_singleton(&singleton, |_: &Value| {});
    assert_eq!(binding.state()["count"], 1);
    binding.actions().increment();
    assert_eq!(binding.state()["count"], 2);
    assert_eq!(singleton.get_instance().destroyed.load(Ordering::SeqCst), 1);
}
