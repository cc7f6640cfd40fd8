//! Request/response correlation broker
//!
//! Allocates monotonically increasing message ids and pairs each with a
//! single-resolution waiter. Entries are removed on completion, on caller
//! cancellation (response-wait timeout), and wholesale on connection
//! teardown, so no waiter can leak across a session.

use crate::client::frames::ResultFrame;
use std::collections::HashMap;
use tokio::sync::oneshot;

/// Correlates in-flight requests with their `type=result` frames.
///
/// Owned exclusively by the connection actor; ids stay unique for the
/// actor's lifetime, so an id is never reused while a response could still
/// arrive.
#[derive(Debug, Default)]
pub(crate) struct RequestBroker {
    next_id: u64,
    pending: HashMap<u64, oneshot::Sender<ResultFrame>>,
}

impl RequestBroker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Allocate the next message id without registering a waiter
    /// (subscriptions acknowledge through [`register`](Self::register)d ids,
    /// so this is for id-only consumers).
    pub(crate) fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Allocate an id and register a waiter for its result frame
    pub(crate) fn register(&mut self) -> (u64, oneshot::Receiver<ResultFrame>) {
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        (id, rx)
    }

    /// Resolve the waiter for `frame.id`, exactly once
    ///
    /// Returns false when no waiter is registered (cancelled, already
    /// resolved, or never ours).
    pub(crate) fn complete(&mut self, frame: ResultFrame) -> bool {
        match self.pending.remove(&frame.id) {
            Some(tx) => tx.send(frame).is_ok(),
            None => false,
        }
    }

    /// Drop the waiter for a request the caller gave up on
    pub(crate) fn cancel(&mut self, id: u64) {
        self.pending.remove(&id);
    }

    /// Tear down every waiter; receivers observe a closed channel
    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }

    /// Number of in-flight requests
    #[cfg(test)]
    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_frame(id: u64, success: bool) -> ResultFrame {
        ResultFrame {
            id,
            success,
            result: None,
            error: None,
        }
    }

    #[test]
    fn ids_are_monotonic() {
        let mut broker = RequestBroker::new();
        let (a, _rx_a) = broker.register();
        let (b, _rx_b) = broker.register();
        assert!(b > a);
    }

    #[tokio::test]
    async fn completes_exactly_once() {
        let mut broker = RequestBroker::new();
        let (id, rx) = broker.register();

        assert!(broker.complete(result_frame(id, true)));
        // A duplicate result frame finds no waiter.
        assert!(!broker.complete(result_frame(id, true)));

        let frame = rx.await.unwrap();
        assert_eq!(frame.id, id);
        assert!(frame.success);
    }

    #[tokio::test]
    async fn cancel_removes_waiter() {
        let mut broker = RequestBroker::new();
        let (id, rx) = broker.register();
        broker.cancel(id);

        assert_eq!(broker.pending_count(), 0);
        assert!(!broker.complete(result_frame(id, true)));
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn clear_closes_all_waiters() {
        let mut broker = RequestBroker::new();
        let (_, rx1) = broker.register();
        let (_, rx2) = broker.register();

        broker.clear();
        assert!(rx1.await.is_err());
        assert!(rx2.await.is_err());
    }

    #[test]
    fn unknown_result_is_ignored() {
        let mut broker = RequestBroker::new();
        assert!(!broker.complete(result_frame(999, false)));
    }
}
