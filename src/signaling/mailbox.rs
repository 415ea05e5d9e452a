//! Per-user FIFO queues of pending signaling messages.
//!
//! A mailbox is created on first enqueue and handed over whole on drain, so
//! every message is delivered by exactly one drain.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Notify;

use crate::signaling::SignalingMessage;

#[derive(Default)]
pub struct MailboxStore {
    boxes: DashMap<String, Vec<SignalingMessage>>,
    waiters: DashMap<String, Arc<Notify>>,
}

impl MailboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the recipient's mailbox and wake any waiting reader.
    pub fn push(&self, recipient: &str, msg: SignalingMessage) {
        tracing::debug!(
            recipient = %recipient,
            room_id = %msg.room_id,
            msg_type = msg.type_name(),
            "Message enqueued"
        );

        self.boxes
            .entry(recipient.to_string())
            .or_default()
            .push(msg);

        if let Some(notify) = self.waiters.get(recipient) {
            notify.notify_waiters();
        }
    }

    /// Swap the mailbox out and return its contents in enqueue order.
    pub fn drain(&self, recipient: &str) -> Vec<SignalingMessage> {
        self.boxes
            .remove(recipient)
            .map(|(_, messages)| messages)
            .unwrap_or_default()
    }

    /// Drain, waiting up to `max_wait` for the first message to arrive.
    pub async fn wait_and_drain(&self, recipient: &str, max_wait: Duration) -> Vec<SignalingMessage> {
        let waiter = self.waiter(recipient);
        let notify = &waiter.notify;
        let deadline = tokio::time::Instant::now() + max_wait;

        loop {
            let notified = notify.notified();
            tokio::pin!(notified);
            // Register before checking so a push between drain and await still wakes us.
            notified.as_mut().enable();

            let messages = self.drain(recipient);
            if !messages.is_empty() {
                return messages;
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Vec::new();
            }
        }
    }

    pub fn pending(&self, recipient: &str) -> usize {
        self.boxes.get(recipient).map(|b| b.len()).unwrap_or(0)
    }

    /// Whether a reader is currently waiting on the recipient's mailbox.
    pub fn has_waiter(&self, recipient: &str) -> bool {
        self.waiters.contains_key(recipient)
    }

    fn waiter<'a>(&'a self, recipient: &'a str) -> WaiterGuard<'a> {
        let notify = self
            .waiters
            .entry(recipient.to_string())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone();
        WaiterGuard {
            waiters: &self.waiters,
            recipient,
            notify,
        }
    }
}

/// Shares the recipient's `Notify` for one wait. The last guard out removes
/// the entry, including when the waiting task is cancelled.
struct WaiterGuard<'a> {
    waiters: &'a DashMap<String, Arc<Notify>>,
    recipient: &'a str,
    notify: Arc<Notify>,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        // Clones are only taken under the shard lock, so the count is stable here.
        // One reference is the map's own, the other is ours.
        self.waiters.remove_if(self.recipient, |_, notify| {
            Arc::ptr_eq(notify, &self.notify) && Arc::strong_count(notify) <= 2
        });
    }
}
