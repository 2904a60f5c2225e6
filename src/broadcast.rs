//! Subscriber registry and non-blocking fan-out for session updates.
//!
//! Every subscriber owns a single-slot outbox. Delivery is try-send only: a
//! subscriber whose slot is still full when the next payload arrives is
//! evicted instead of awaited, so a slow consumer can never stall a mutation.
//! Live subscribers that keep up observe every payload in emission order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

/// Opaque rendered bytes handed to subscribers.
pub type Payload = Vec<u8>;

/// Outbox depth. One slot: at-most-one-buffered, drop-on-lag delivery.
const OUTBOX_DEPTH: usize = 1;

/// Per-session subscriber sets, keyed by session id.
///
/// The registry is plain data. It lives inside the session store's mutex so
/// a mutation can capture the subscriber set under the same lock that
/// serialized the mutation.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    topics: HashMap<String, HashMap<u64, mpsc::Sender<Payload>>>,
    next_id: u64,
}

impl Registry {
    /// Registers a new subscriber for `session` and returns its outbox.
    pub(crate) fn add(&mut self, session: &str) -> (u64, mpsc::Receiver<Payload>) {
        let id = self.next_id;
        self.next_id += 1;
        let (tx, rx) = mpsc::channel(OUTBOX_DEPTH);
        self.topics.entry(session.to_string()).or_default().insert(id, tx);
        debug!(session, subscriber = id, "subscriber registered");
        (id, rx)
    }

    /// Removes a subscriber. Idempotent: removing an unknown id is a no-op.
    ///
    /// Dropping the last sender closes the subscriber's outbox, which the
    /// read side observes as end-of-stream once drained.
    pub(crate) fn remove(&mut self, session: &str, id: u64) {
        if let Some(set) = self.topics.get_mut(session) {
            if set.remove(&id).is_some() {
                debug!(session, subscriber = id, "subscriber removed");
            }
            if set.is_empty() {
                self.topics.remove(session);
            }
        }
    }

    /// Captures the current subscriber senders for `session`.
    pub(crate) fn senders(&self, session: &str) -> Vec<(u64, mpsc::Sender<Payload>)> {
        self.topics
            .get(session)
            .map(|set| set.iter().map(|(id, tx)| (*id, tx.clone())).collect())
            .unwrap_or_default()
    }

    /// Number of live subscribers for `session`.
    pub(crate) fn subscriber_count(&self, session: &str) -> usize {
        self.topics.get(session).map_or(0, HashMap::len)
    }
}

/// Delivers `payload` to each captured sender without blocking.
///
/// Returns the ids whose outbox was full or already closed; the caller
/// removes those from the registry. Called outside any lock. A sender whose
/// subscriber was concurrently torn down fails with `Closed`, which lands on
/// the same eviction path.
#[instrument(skip(senders, payload), fields(subscribers = senders.len()))]
pub(crate) fn fan_out(senders: &[(u64, mpsc::Sender<Payload>)], payload: &Payload) -> Vec<u64> {
    let mut evicted = Vec::new();
    for (id, tx) in senders {
        if tx.try_send(payload.clone()).is_err() {
            debug!(subscriber = id, "outbox full or closed, evicting");
            evicted.push(*id);
        }
    }
    evicted
}

type Teardown = Box<dyn FnOnce() + Send>;

/// Once-guarded teardown shared between the cancellation watcher, the
/// subscription handle, and its `Drop` impl. Whichever side fires first runs
/// the teardown; every later call is a no-op.
#[derive(Clone)]
pub(crate) struct Unsubscriber {
    slot: Arc<Mutex<Option<Teardown>>>,
}

impl Unsubscriber {
    pub(crate) fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(Box::new(teardown)))),
        }
    }

    /// Runs the teardown exactly once.
    pub(crate) fn unsubscribe(&self) {
        let teardown = self.slot.lock().unwrap().take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }
}

impl std::fmt::Debug for Unsubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscriber").finish_non_exhaustive()
    }
}

/// Read side of one subscriber.
///
/// Payloads arrive via [`Subscription::recv`]; `None` is terminal and means
/// the subscriber was unsubscribed or evicted. Dropping the handle
/// unsubscribes and stops the cancellation watcher.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<Payload>,
    unsub: Unsubscriber,
    // Dropped with the handle; the watcher selects on its closure.
    _closed: oneshot::Sender<()>,
}

impl Subscription {
    pub(crate) fn new(
        rx: mpsc::Receiver<Payload>,
        unsub: Unsubscriber,
        closed: oneshot::Sender<()>,
    ) -> Self {
        Self {
            rx,
            unsub,
            _closed: closed,
        }
    }

    /// Waits for the next payload. Returns `None` once the outbox is closed
    /// and drained; no further payloads will arrive.
    pub async fn recv(&mut self) -> Option<Payload> {
        self.rx.recv().await
    }

    /// Tears the subscriber down. Idempotent, and safe to race with the
    /// cancellation watcher or a concurrent eviction.
    pub fn unsubscribe(&self) {
        self.unsub.unsubscribe();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsub.unsubscribe();
    }
}

/// Spawns the watcher that binds a subscriber's lifetime to an external
/// cancellation signal. The watcher exits when the signal fires or when the
/// subscription handle is dropped, whichever comes first.
pub(crate) fn spawn_cancel_watcher(
    cancel: impl Future<Output = ()> + Send + 'static,
    closed: oneshot::Receiver<()>,
    unsub: Unsubscriber,
) {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel => unsub.unsubscribe(),
            _ = closed => {}
        }
    });
}
