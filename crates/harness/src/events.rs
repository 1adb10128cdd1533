//! Named browser events and timeout-bounded waits on them.
//!
//! The browser backend delivers events from its own task through an
//! [`EventSink`]; the runner consumes them with [`EventWaiter::wait`].
//!
//! # Design
//!
//! Delivery and waiting race freely. An event that arrives before anyone waits
//! for it is kept as a pending occurrence, so a later wait returns immediately
//! instead of running into its timeout. An event that arrives while a wait is
//! registered completes that waiter directly through a oneshot channel.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

struct WaiterEntry {
	id: u64,
	name: String,
	complete_tx: oneshot::Sender<()>,
}

#[derive(Default)]
struct WaiterState {
	subscribed: HashSet<String>,
	pending: HashMap<String, usize>,
	waiters: Vec<WaiterEntry>,
	next_waiter_id: u64,
}

/// Event subscription set plus the waits registered against it.
#[derive(Default)]
pub struct EventWaiter {
	state: Mutex<WaiterState>,
}

impl EventWaiter {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds names to the subscription set. Events outside the set are dropped.
	pub fn subscribe<I, S>(&self, names: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut state = self.state.lock();
		state.subscribed.extend(names.into_iter().map(Into::into));
	}

	pub fn is_subscribed(&self, name: &str) -> bool {
		self.state.lock().subscribed.contains(name)
	}

	/// Delivers one occurrence of `name`.
	///
	/// The oldest registered waiter for `name` receives it; with no live waiter
	/// the occurrence is kept until the next [`wait`](Self::wait).
	pub fn emit(&self, name: &str) {
		let mut state = self.state.lock();
		if !state.subscribed.contains(name) {
			tracing::trace!(event = name, "dropping unsubscribed browser event");
			return;
		}

		while let Some(pos) = state.waiters.iter().position(|w| w.name == name) {
			let entry = state.waiters.remove(pos);
			if entry.complete_tx.send(()).is_ok() {
				tracing::debug!(event = name, waiter = entry.id, "browser event delivered to waiter");
				return;
			}
		}

		*state.pending.entry(name.to_string()).or_default() += 1;
		tracing::debug!(event = name, "browser event queued");
	}

	/// Waits up to `timeout` for one occurrence of `name`, consuming it.
	///
	/// Returns `false` on timeout, or immediately when `name` was never
	/// subscribed since such an event can never be delivered.
	pub async fn wait(&self, name: &str, timeout: Duration) -> bool {
		let (id, mut rx) = {
			let mut state = self.state.lock();
			if !state.subscribed.contains(name) {
				tracing::warn!(event = name, "waiting on an event that was never subscribed");
				return false;
			}
			if let Some(count) = state.pending.get_mut(name) {
				if *count > 0 {
					*count -= 1;
					return true;
				}
			}

			let (complete_tx, complete_rx) = oneshot::channel();
			let id = state.next_waiter_id;
			state.next_waiter_id += 1;
			state.waiters.push(WaiterEntry {
				id,
				name: name.to_string(),
				complete_tx,
			});
			(id, complete_rx)
		};

		match tokio::time::timeout(timeout, &mut rx).await {
			Ok(result) => result.is_ok(),
			Err(_) => {
				let mut state = self.state.lock();
				match state.waiters.iter().position(|w| w.id == id) {
					Some(pos) => {
						state.waiters.remove(pos);
						tracing::debug!(event = name, timeout_ms = timeout.as_millis() as u64, "timed out waiting for browser event");
						false
					}
					// Delivered between the timeout firing and taking the lock.
					None => rx.try_recv().is_ok(),
				}
			}
		}
	}

	/// Number of undelivered occurrences of `name`.
	pub fn pending(&self, name: &str) -> usize {
		self.state.lock().pending.get(name).copied().unwrap_or(0)
	}

	#[cfg(test)]
	fn waiter_count(&self) -> usize {
		self.state.lock().waiters.len()
	}
}

/// Cloneable delivery handle given to browser backends.
#[derive(Clone)]
pub struct EventSink {
	waiter: Arc<EventWaiter>,
}

impl EventSink {
	pub fn new(waiter: Arc<EventWaiter>) -> Self {
		Self { waiter }
	}

	pub fn emit(&self, name: &str) {
		self.waiter.emit(name);
	}
}

impl std::fmt::Debug for EventSink {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EventSink").finish_non_exhaustive()
	}
}
