// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process wait/notify registry keyed by an opaque string.
//!
//! Any number of tasks may [`NotificationHub::wait`] on the same key; a
//! single [`NotificationHub::broadcast`] wakes all of them with the same
//! value, exactly once each. The hub never buffers: a broadcast with no
//! registered waiters is dropped, so callers that may have missed the
//! event must check their authoritative state before registering a wait.
//!
//! Each waiter gets a stable token at registration and is removed by that
//! token, never by position. Broadcast swaps the key's waiter set out under
//! the lock and delivers to the copy after releasing it, so a slow receiver
//! can never block new registrations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use parlance_core::ParlanceError;

/// Keyed one-shot broadcast hub.
///
/// `T` is the delivered value; it is cloned once per waiter.
pub struct NotificationHub<T> {
    next_token: AtomicU64,
    waiters: Mutex<HashMap<String, HashMap<u64, oneshot::Sender<T>>>>,
}

impl<T> Default for NotificationHub<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NotificationHub<T>
where
    T: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            next_token: AtomicU64::new(0),
            waiters: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a fresh one-shot receiver under `key` and suspends until a
    /// value is broadcast for the key or `cancel` fires.
    ///
    /// On cancellation the receiver is deregistered and the call fails with
    /// [`ParlanceError::Cancelled`] -- distinguishable from delivery.
    pub async fn wait(&self, key: &str, cancel: CancellationToken) -> Result<T, ParlanceError> {
        let (tx, rx) = oneshot::channel();
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        {
            let mut waiters = self.waiters.lock().expect("hub lock poisoned");
            waiters.entry(key.to_string()).or_default().insert(token, tx);
        }
        trace!(key, token, "waiter registered");

        tokio::select! {
            value = rx => match value {
                Ok(value) => Ok(value),
                // The sender was dropped without a send: the hub itself went
                // away. Waiters removed by broadcast always get a value.
                Err(_) => Err(ParlanceError::Internal(
                    "notification channel closed without delivery".to_string(),
                )),
            },
            () = cancel.cancelled() => {
                self.deregister(key, token);
                trace!(key, token, "waiter cancelled");
                Err(ParlanceError::Cancelled)
            }
        }
    }

    /// Delivers `value` to every waiter currently registered under `key`,
    /// then clears the key. Returns the number of waiters reached.
    ///
    /// With zero waiters the value is dropped -- at-most-once, no queuing.
    pub fn broadcast(&self, key: &str, value: T) -> usize {
        // Swap the waiter set out under the lock; send after releasing it.
        let receivers = {
            let mut waiters = self.waiters.lock().expect("hub lock poisoned");
            waiters.remove(key)
        };

        let Some(receivers) = receivers else {
            return 0;
        };

        let mut delivered = 0;
        for (_, tx) in receivers {
            // A send can only fail when the waiter was cancelled between the
            // swap above and this send; its receiver is already gone.
            if tx.send(value.clone()).is_ok() {
                delivered += 1;
            }
        }
        trace!(key, delivered, "broadcast delivered");
        delivered
    }

    /// Number of waiters currently registered under `key`.
    pub fn waiter_count(&self, key: &str) -> usize {
        let waiters = self.waiters.lock().expect("hub lock poisoned");
        waiters.get(key).map_or(0, HashMap::len)
    }

    fn deregister(&self, key: &str, token: u64) {
        let mut waiters = self.waiters.lock().expect("hub lock poisoned");
        if let Some(receivers) = waiters.get_mut(key) {
            receivers.remove(&token);
            if receivers.is_empty() {
                waiters.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn hub() -> Arc<NotificationHub<String>> {
        Arc::new(NotificationHub::new())
    }

    #[tokio::test]
    async fn broadcast_reaches_every_registered_waiter_once() {
        let hub = hub();
        let mut handles = Vec::new();
        for _ in 0..3 {
            let hub = hub.clone();
            handles.push(tokio::spawn(async move {
                hub.wait("turn-1", CancellationToken::new()).await
            }));
        }

        // Let all three register before broadcasting.
        while hub.waiter_count("turn-1") < 3 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        assert_eq!(hub.broadcast("turn-1", "done".to_string()), 3);

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "done");
        }
        assert_eq!(hub.waiter_count("turn-1"), 0);
    }

    #[tokio::test]
    async fn waiter_registered_after_broadcast_receives_nothing() {
        let hub = hub();
        assert_eq!(hub.broadcast("turn-2", "done".to_string()), 0);

        // No buffering: a later wait must not observe the earlier value.
        let cancel = CancellationToken::new();
        let late = {
            let hub = hub.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { hub.wait("turn-2", cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();

        assert!(matches!(
            late.await.unwrap(),
            Err(ParlanceError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn broadcast_with_zero_waiters_is_a_noop() {
        let hub = hub();
        assert_eq!(hub.broadcast("nobody", "dropped".to_string()), 0);
        assert_eq!(hub.waiter_count("nobody"), 0);
    }

    #[tokio::test]
    async fn cancelled_waiter_is_deregistered() {
        let hub = hub();
        let cancel = CancellationToken::new();
        let waiter = {
            let hub = hub.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { hub.wait("turn-3", cancel).await })
        };
        while hub.waiter_count("turn-3") < 1 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        cancel.cancel();
        assert!(matches!(
            waiter.await.unwrap(),
            Err(ParlanceError::Cancelled)
        ));

        // The slot is gone: a later broadcast attempts no delivery to it.
        assert_eq!(hub.waiter_count("turn-3"), 0);
        assert_eq!(hub.broadcast("turn-3", "late".to_string()), 0);
    }

    #[tokio::test]
    async fn cancelling_one_waiter_leaves_the_other_reachable() {
        let hub = hub();
        let cancel_a = CancellationToken::new();
        let a = {
            let hub = hub.clone();
            let cancel = cancel_a.clone();
            tokio::spawn(async move { hub.wait("turn-4", cancel).await })
        };
        let b = {
            let hub = hub.clone();
            tokio::spawn(async move { hub.wait("turn-4", CancellationToken::new()).await })
        };
        while hub.waiter_count("turn-4") < 2 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        cancel_a.cancel();
        assert!(matches!(a.await.unwrap(), Err(ParlanceError::Cancelled)));

        assert_eq!(hub.broadcast("turn-4", "done".to_string()), 1);
        assert_eq!(b.await.unwrap().unwrap(), "done");
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let hub = hub();
        let a = {
            let hub = hub.clone();
            tokio::spawn(async move { hub.wait("turn-a", CancellationToken::new()).await })
        };
        let b = {
            let hub = hub.clone();
            tokio::spawn(async move { hub.wait("turn-b", CancellationToken::new()).await })
        };
        while hub.waiter_count("turn-a") < 1 || hub.waiter_count("turn-b") < 1 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        assert_eq!(hub.broadcast("turn-a", "for-a".to_string()), 1);
        assert_eq!(a.await.unwrap().unwrap(), "for-a");

        assert_eq!(hub.broadcast("turn-b", "for-b".to_string()), 1);
        assert_eq!(b.await.unwrap().unwrap(), "for-b");
    }
}
