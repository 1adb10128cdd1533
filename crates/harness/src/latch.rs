//! One-shot termination signal shared between a server session and the runner.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Single-use gate raised when a content session terminates.
///
/// A fresh latch is created for every content request, so a waiter can never
/// observe the termination of an earlier session. Clones share the same gate.
///
/// # Example
///
/// ```ignore
/// let latch = TerminationLatch::new();
/// let remote = latch.clone();
/// tokio::spawn(async move { remote.signal(); });
/// assert!(latch.wait(Duration::from_secs(1)).await);
/// ```
#[derive(Clone, Debug)]
pub struct TerminationLatch {
	tx: Arc<watch::Sender<bool>>,
}

impl TerminationLatch {
	pub fn new() -> Self {
		let (tx, _) = watch::channel(false);
		Self { tx: Arc::new(tx) }
	}

	/// Raises the latch. Returns `true` only for the call that raised it;
	/// later calls are no-ops.
	pub fn signal(&self) -> bool {
		self.tx.send_if_modified(|signaled| {
			if *signaled {
				false
			} else {
				*signaled = true;
				true
			}
		})
	}

	pub fn is_signaled(&self) -> bool {
		*self.tx.borrow()
	}

	/// Waits until the latch is raised or `timeout` elapses.
	///
	/// Returns immediately with `true` when the latch is already raised.
	pub async fn wait(&self, timeout: Duration) -> bool {
		let mut rx = self.tx.subscribe();
		match tokio::time::timeout(timeout, rx.wait_for(|signaled| *signaled)).await {
			Ok(Ok(_)) => true,
			Ok(Err(_)) | Err(_) => false,
		}
	}
}

impl Default for TerminationLatch {
	fn default() -> Self {
		Self::new()
	}
}
