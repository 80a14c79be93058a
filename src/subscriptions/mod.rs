//! Snapshot streams and their subscriptions.
//!
//! A [`Broadcaster`] holds the latest value and fans every new value out to
//! its listeners synchronously. An [`Observable`] wraps a broadcaster with
//! per-subscriber operators:
//! - `map` to project a field or derived value
//! - `distinct_until_changed` to drop adjacent duplicates
//! - `subscribe_channel` to receive into a channel instead of a callback
//!
//! # Example
//!
//! ```ignore
//! let broadcaster = Broadcaster::new(0);
//! let observable = Observable::from_broadcaster(&broadcaster).distinct_until_changed();
//!
//! let sub = observable.subscribe(|value| println!("got {value}"));
//! broadcaster.next(1); // prints "got 1"
//! broadcaster.next(1); // suppressed
//! sub.unsubscribe();
//! ```

mod broadcaster;
mod observable;
mod types;

pub use broadcaster::Broadcaster;
pub use observable::Observable;
pub use types::{Listener, ObservableOptions, SnapshotReceiver, Subscription, SubscriptionId};
