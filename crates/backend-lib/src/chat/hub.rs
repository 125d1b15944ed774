// ============================
// crates/backend-lib/src/chat/hub.rs
// ============================
//! Broadcast coordinator for the single chat room.
//!
//! The message log and the connection registry live behind one mutex. Every
//! operation that touches either of them (append, register, unregister,
//! snapshot) runs inside that lock, which gives two guarantees:
//!
//! - every registered connection sees published messages in log order, and
//! - a joining connection receives a replay that ends exactly where its live
//!   feed begins, with no gap and no duplicate.
//!
//! Network writes never happen under the lock. Fan-out only enqueues onto each
//! connection's bounded outbound queue with `try_send`; the per-connection
//! writer task does the actual socket write. A queue that is closed or full
//! marks its connection dead and it is unregistered before the lock is
//! released.
use std::sync::Arc;

use chat_common::{ChatMessage, MessageId};
use metrics::{counter, gauge};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::log::MessageLog;
use super::registry::{Connection, ConnectionId, ConnectionRegistry, Identity};
use crate::metrics as keys;

/// Default depth of a connection's outbound queue
pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;

#[derive(Debug, Default)]
struct HubState {
    log: MessageLog,
    registry: ConnectionRegistry,
}

/// What a session gets back from [`ChatHub::join`]
#[derive(Debug)]
pub struct Subscription {
    pub id: ConnectionId,
    pub identity: Identity,
    /// Log contents at the moment of registration, oldest first
    pub replay: Vec<ChatMessage>,
    /// Every message published after `replay` was taken
    pub receiver: mpsc::Receiver<ChatMessage>,
}

/// Handle to the chat room. Cheap to clone; all clones share one room.
#[derive(Clone, Debug)]
pub struct ChatHub {
    state: Arc<Mutex<HubState>>,
    outbound_buffer: usize,
}

impl Default for ChatHub {
    fn default() -> Self {
        Self::new(DEFAULT_OUTBOUND_BUFFER)
    }
}

impl ChatHub {
    pub fn new(outbound_buffer: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState::default())),
            outbound_buffer: outbound_buffer.max(1),
        }
    }

    /// Register a new connection for `identity` and hand back the replay
    /// together with the live feed.
    pub fn join(&self, identity: Identity) -> Subscription {
        let (tx, rx) = mpsc::channel(self.outbound_buffer);
        let id = Uuid::new_v4();

        let (replay, active) = {
            let mut state = self.state.lock();
            let replay = state.log.snapshot();
            state
                .registry
                .register(Connection::new(id, identity.clone(), tx));
            (replay, state.registry.len())
        };

        counter!(keys::WS_CONNECTION).increment(1);
        gauge!(keys::WS_ACTIVE).set(active as f64);
        info!(connection_id = %id, user = %identity, replayed = replay.len(), "connection joined");

        Subscription {
            id,
            identity,
            replay,
            receiver: rx,
        }
    }

    /// Append a message and queue it for every registered connection,
    /// the author's own included.
    pub fn publish(&self, identity: &str, body: String) -> ChatMessage {
        let (message, evicted, active) = {
            let mut state = self.state.lock();
            let message = state.log.append(identity, body);

            let mut dead = Vec::new();
            state.registry.for_each(|conn| {
                if let Err(err) = conn.offer(&message) {
                    debug!(connection_id = %conn.id, user = %conn.identity, error = %err, "delivery failed");
                    dead.push(conn.id);
                }
            });

            let evicted: Vec<Connection> = dead
                .into_iter()
                .filter_map(|id| state.registry.unregister(id))
                .collect();
            (message, evicted, state.registry.len())
        };

        counter!(keys::CHAT_PUBLISHED).increment(1);
        debug!(message_id = message.id, user = %message.user, "message published");

        if !evicted.is_empty() {
            counter!(keys::WS_EVICTED).increment(evicted.len() as u64);
            gauge!(keys::WS_ACTIVE).set(active as f64);
            for conn in &evicted {
                warn!(connection_id = %conn.id, user = %conn.identity, "dropping dead connection");
            }
        }

        message
    }

    /// Unregister a connection. Returns `false` if it was already gone,
    /// e.g. evicted by a failed delivery.
    pub fn leave(&self, id: ConnectionId) -> bool {
        let (removed, active) = {
            let mut state = self.state.lock();
            let removed = state.registry.unregister(id);
            (removed, state.registry.len())
        };

        match removed {
            Some(conn) => {
                gauge!(keys::WS_ACTIVE).set(active as f64);
                info!(connection_id = %id, user = %conn.identity, "connection left");
                true
            },
            None => false,
        }
    }

    /// Delete a message from the log. Live viewers are not notified.
    pub fn remove(&self, id: MessageId) -> bool {
        let removed = self.state.lock().log.remove_by_id(id);
        if removed {
            counter!(keys::CHAT_DELETED).increment(1);
            info!(message_id = id, "message deleted");
        }
        removed
    }

    /// Current log contents, oldest first
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.state.lock().log.snapshot()
    }

    pub fn messages_by(&self, identity: &str) -> usize {
        self.state.lock().log.count_by_author(identity)
    }

    pub fn message_count(&self) -> usize {
        self.state.lock().log.len()
    }

    pub fn connection_count(&self) -> usize {
        self.state.lock().registry.len()
    }

    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.state.lock().registry.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::Receiver<ChatMessage>) -> Vec<ChatMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn contents(messages: &[ChatMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn test_publish_reaches_every_connection_in_order() {
        let hub = ChatHub::default();
        let mut alice = hub.join("alice".to_string());
        let mut bob = hub.join("bob".to_string());

        for body in ["one", "two", "three"] {
            hub.publish("alice", body.to_string());
        }

        let seen_by_alice = drain(&mut alice.receiver);
        let seen_by_bob = drain(&mut bob.receiver);
        assert_eq!(contents(&seen_by_alice), vec!["one", "two", "three"]);
        assert_eq!(seen_by_alice, seen_by_bob);
    }

    #[test]
    fn test_publisher_receives_self_echo() {
        let hub = ChatHub::default();
        let mut alice = hub.join("alice".to_string());

        let sent = hub.publish("alice", "hello".to_string());
        assert_eq!(drain(&mut alice.receiver), vec![sent]);
    }

    #[test]
    fn test_join_replays_history_without_duplicates() {
        let hub = ChatHub::default();
        let mut client1 = hub.join("client1".to_string());
        assert!(client1.replay.is_empty());

        hub.publish("client1", "hello".to_string());
        let mut client2 = hub.join("client2".to_string());

        assert_eq!(client2.replay.len(), 1);
        assert_eq!(client2.replay[0].id, 1);
        assert_eq!(client2.replay[0].user, "client1");
        assert_eq!(client2.replay[0].content, "hello");
        // Message 1 arrived via replay only
        assert!(drain(&mut client2.receiver).is_empty());
        assert_eq!(drain(&mut client1.receiver).len(), 1);

        hub.publish("client2", "welcome".to_string());
        let live = drain(&mut client2.receiver);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id, 2);
    }

    #[test]
    fn test_failed_delivery_evicts_only_dead_connection() {
        let hub = ChatHub::default();
        let mut alive = hub.join("alice".to_string());
        let dead = hub.join("bob".to_string());
        let dead_id = dead.id;
        drop(dead.receiver);

        let msg = hub.publish("alice", "still here?".to_string());
        assert_eq!(drain(&mut alive.receiver), vec![msg]);
        assert!(!hub.is_connected(dead_id));
        assert!(hub.is_connected(alive.id));
        assert_eq!(hub.connection_count(), 1);

        // The session's own cleanup finds nothing left to remove
        assert!(!hub.leave(dead_id));
    }

    #[test]
    fn test_full_queue_evicts_slow_connection() {
        let hub = ChatHub::new(2);
        let slow = hub.join("slow".to_string());

        hub.publish("alice", "1".to_string());
        hub.publish("alice", "2".to_string());
        assert!(hub.is_connected(slow.id));

        hub.publish("alice", "3".to_string());
        assert!(!hub.is_connected(slow.id));
        assert_eq!(hub.message_count(), 3);
    }

    #[test]
    fn test_leave_is_idempotent() {
        let hub = ChatHub::default();
        let sub = hub.join("alice".to_string());

        assert!(hub.leave(sub.id));
        assert!(!hub.leave(sub.id));
        assert_eq!(hub.connection_count(), 0);
    }

    #[test]
    fn test_no_delivery_after_leave() {
        let hub = ChatHub::default();
        let mut sub = hub.join("alice".to_string());
        hub.leave(sub.id);

        hub.publish("bob", "anyone?".to_string());
        // Sender was dropped with the registry entry
        assert!(matches!(
            sub.receiver.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_remove_existing_and_missing() {
        let hub = ChatHub::default();
        hub.publish("alice", "a".to_string());
        hub.publish("alice", "b".to_string());
        hub.publish("alice", "c".to_string());

        assert!(hub.remove(2));
        let ids: Vec<MessageId> = hub.snapshot().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 3]);

        let before = hub.snapshot();
        assert!(!hub.remove(2));
        assert!(!hub.remove(42));
        assert_eq!(hub.snapshot(), before);
    }

    #[test]
    fn test_remove_missing_on_fresh_log() {
        let hub = ChatHub::default();
        hub.publish("alice", "only".to_string());
        assert!(!hub.remove(2));
        assert_eq!(hub.message_count(), 1);
    }

    #[test]
    fn test_remove_is_not_broadcast_but_affects_replay() {
        let hub = ChatHub::default();
        let mut viewer = hub.join("viewer".to_string());
        hub.publish("alice", "oops".to_string());
        hub.publish("alice", "fine".to_string());
        drain(&mut viewer.receiver);

        assert!(hub.remove(1));
        assert!(drain(&mut viewer.receiver).is_empty());

        let late = hub.join("late".to_string());
        assert_eq!(contents(&late.replay), vec!["fine"]);
    }

    #[test]
    fn test_messages_by_counts_author() {
        let hub = ChatHub::default();
        hub.publish("alice", "a".to_string());
        hub.publish("bob", "b".to_string());
        hub.publish("alice", "c".to_string());

        assert_eq!(hub.messages_by("alice"), 2);
        assert_eq!(hub.messages_by("bob"), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_publishers_share_one_order() {
        let hub = ChatHub::new(1024);
        let mut observer1 = hub.join("observer1".to_string());
        let mut observer2 = hub.join("observer2".to_string());

        let mut tasks = Vec::new();
        for author in ["A", "B"] {
            let hub = hub.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..100 {
                    hub.publish(author, format!("{author}{i}"));
                    tokio::task::yield_now().await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let seen1 = drain(&mut observer1.receiver);
        let seen2 = drain(&mut observer2.receiver);
        assert_eq!(seen1.len(), 200);
        assert_eq!(seen1, seen2);
        assert_eq!(seen1, hub.snapshot());
        assert!(seen1.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_join_during_publishing_has_no_gaps_or_duplicates() {
        let hub = ChatHub::new(4096);
        let publisher = {
            let hub = hub.clone();
            tokio::spawn(async move {
                for i in 0..500 {
                    hub.publish("alice", i.to_string());
                    tokio::task::yield_now().await;
                }
            })
        };

        tokio::task::yield_now().await;
        let mut late = hub.join("late".to_string());
        publisher.await.unwrap();

        let mut seen = late.replay.clone();
        seen.extend(drain(&mut late.receiver));
        let ids: Vec<MessageId> = seen.iter().map(|m| m.id).collect();
        let expected: Vec<MessageId> = (1..=500).collect();
        assert_eq!(ids, expected);
    }
}
