//! Event fan-out to management-side listeners.

use crate::compat::Mutex;
use crossbeam_channel::{unbounded, Receiver, Sender, TrySendError};

/// Broadcasts events to every live subscriber.
///
/// Subscribers whose receiver has been dropped are pruned on the next post.
#[derive(Debug)]
pub struct Notifier<E> {
    senders: Mutex<Vec<Sender<E>>>,
}

impl<E: Clone> Notifier<E> {
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> Receiver<E> {
        let (tx, rx) = unbounded();
        self.senders.lock().push(tx);
        rx
    }

    pub fn post(&self, event: E) {
        self.senders
            .lock()
            .retain(|tx| !matches!(tx.try_send(event.clone()), Err(TrySendError::Disconnected(_))));
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders.lock().len()
    }
}

impl<E: Clone> Default for Notifier<E> {
    fn default() -> Self {
        Self::new()
    }
}
