//! Topic-keyed publish/subscribe with at most one subscriber per topic.
//!
//! The broker knows nothing about transports. The server turns a
//! [`Subscription`] into an SSE stream, but polling or websocket adapters
//! would consume it the same way.

use std::collections::HashMap;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

/// Publishes messages to a single live subscriber per topic.
#[derive(Debug)]
pub struct ProgressBroker<K, T> {
    topics: Mutex<HashMap<K, mpsc::UnboundedSender<T>>>,
}

impl<K, T> Default for ProgressBroker<K, T> {
    fn default() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, T> ProgressBroker<K, T>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn topics(&self) -> MutexGuard<'_, HashMap<K, mpsc::UnboundedSender<T>>> {
        self.topics.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Attaches a subscriber to `topic`, replacing any previous one.
    ///
    /// `initial` is queued before anything published afterwards, so a late
    /// subscriber sees the current state first.
    pub fn subscribe(&self, topic: K, initial: Option<T>) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(message) = initial {
            // The receiver is alive, this cannot fail.
            let _ = tx.send(message);
        }
        self.topics().insert(topic, tx);
        Subscription { rx }
    }

    /// Pushes a message to the topic's subscriber.
    ///
    /// Returns false when nobody is listening. A subscriber whose receiving
    /// end has gone away is dropped from the topic.
    pub fn publish(&self, topic: &K, message: T) -> bool {
        let mut topics = self.topics();
        let Some(tx) = topics.get(topic) else {
            return false;
        };
        if tx.send(message).is_ok() {
            true
        } else {
            topics.remove(topic);
            false
        }
    }

    /// Ends the topic's subscription. The subscriber drains what was already
    /// queued and then sees end-of-stream.
    pub fn close(&self, topic: &K) -> bool {
        self.topics().remove(topic).is_some()
    }

}

/// Receiving end of a topic subscription.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// A subscription that is already finished (unknown topic).
    pub fn closed() -> Self {
        let (_, rx) = mpsc::unbounded_channel();
        Self { rx }
    }

    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}
