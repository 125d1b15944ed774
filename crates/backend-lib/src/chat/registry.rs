//! Registry of live connections.
use std::collections::HashMap;

use chat_common::ChatMessage;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

pub type ConnectionId = Uuid;

/// Authenticated user name, resolved once at admission
pub type Identity = String;

/// A registered connection: its owner and the queue its writer task drains
#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub identity: Identity,
    outbound: mpsc::Sender<ChatMessage>,
}

impl Connection {
    pub fn new(id: ConnectionId, identity: Identity, outbound: mpsc::Sender<ChatMessage>) -> Self {
        Self {
            id,
            identity,
            outbound,
        }
    }

    /// Queue a message without waiting. Fails if the writer has gone away
    /// or has fallen a full buffer behind.
    pub fn offer(&self, message: &ChatMessage) -> Result<(), TrySendError<ChatMessage>> {
        self.outbound.try_send(message.clone())
    }
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, connection: Connection) {
        self.connections.insert(connection.id, connection);
    }

    /// Remove a connection. Removing an absent connection returns `None`.
    pub fn unregister(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    /// Visit every registered connection once.
    pub fn for_each<F: FnMut(&Connection)>(&self, mut f: F) {
        for connection in self.connections.values() {
            f(connection);
        }
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
