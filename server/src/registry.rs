//! Connection registry for the game server
//!
//! This module tracks every live connection, including:
//! - Client number allocation (smallest free number, reused after disconnects)
//! - Registration on accept and removal on disconnect
//! - Lookup by peer address
//! - Best-effort broadcast to all or all-but-some connections
//!
//! The registry is the only state shared between connection tasks. A single
//! lock guards it; it is never held while sending or across an `.await`.

use crate::handshake::SERVER_CLIENT_NUMBER;
use crate::session::Outbox;
use log::{info, warn};
use parking_lot::Mutex;
use shared::Message;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Registry entry for one live connection
///
/// Holds what other tasks need to reach the connection: its client number,
/// peer address and outbox. The connection's `Session` stays with its own
/// task.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    /// Unique for the lifetime of the server, unlike the client number
    pub id: u64,
    /// Small number identifying the client to the game protocol
    pub client_number: u8,
    /// Peer address of the transport
    pub addr: SocketAddr,
    /// Sending side of the connection
    pub outbox: Outbox,
}

/// Set of live connections
///
/// Client numbers are unique among registered connections and bounded by
/// the configured capacity.
pub struct ConnectionRegistry {
    connections: Mutex<Vec<ConnectionHandle>>,
    next_id: AtomicU64,
    max_clients: usize,
}

impl ConnectionRegistry {
    /// Creates an empty registry admitting at most `max_clients` connections
    ///
    /// Client numbers are a single byte on the wire and 255 speaks for the
    /// server, so capacity is capped at 255.
    pub fn new(max_clients: usize) -> Self {
        Self {
            connections: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            max_clients: max_clients.min(SERVER_CLIENT_NUMBER as usize),
        }
    }

    /// Allocates a client number and registers a new connection
    ///
    /// Allocation and insertion happen under one lock acquisition, so two
    /// accepts can never be handed the same number. Returns `None` when every
    /// number below the capacity is taken.
    pub fn register(&self, addr: SocketAddr, outbox: Outbox) -> Option<ConnectionHandle> {
        let mut connections = self.connections.lock();
        let client_number = Self::first_free(&connections, self.max_clients)?;

        let handle = ConnectionHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            client_number,
            addr,
            outbox,
        };
        connections.push(handle.clone());
        info!("Client {} connected from {}", client_number, addr);

        Some(handle)
    }

    /// Adds an already-built handle
    ///
    /// Returns false, leaving the registry unchanged, if the handle's client
    /// number is in use.
    pub fn add(&self, handle: ConnectionHandle) -> bool {
        let mut connections = self.connections.lock();
        if connections
            .iter()
            .any(|c| c.client_number == handle.client_number)
        {
            return false;
        }
        connections.push(handle);
        true
    }

    /// Removes a connection and closes its transport
    ///
    /// Matching is by the handle's unique id, so a stale handle cannot remove
    /// a newer connection that reused its client number. Returns true if the
    /// connection was still registered.
    pub fn remove(&self, handle: &ConnectionHandle) -> bool {
        let removed = {
            let mut connections = self.connections.lock();
            connections
                .iter()
                .position(|c| c.id == handle.id)
                .map(|index| connections.swap_remove(index))
        };

        handle.outbox.close();
        if let Some(connection) = removed {
            info!("Client {} disconnected", connection.client_number);
            true
        } else {
            false
        }
    }

    /// Snapshot of every registered connection
    pub fn all(&self) -> Vec<ConnectionHandle> {
        self.connections.lock().clone()
    }

    /// Finds the connection whose transport has the given peer address
    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<ConnectionHandle> {
        self.connections
            .lock()
            .iter()
            .find(|c| c.addr == addr)
            .cloned()
    }

    /// Smallest client number not held by a live connection
    ///
    /// Numbers freed by disconnects are handed out again before any higher
    /// number. Returns `None` when the registry is full.
    pub fn next_client_number(&self) -> Option<u8> {
        Self::first_free(&self.connections.lock(), self.max_clients)
    }

    /// Sends a message to every registered connection
    ///
    /// Returns the number of connections the message was queued for.
    pub fn send_to_all(&self, message: &Message) -> usize {
        self.send_to_all_except(message, &[])
    }

    /// Sends a message to every connection whose client number is not in
    /// `excluded`
    ///
    /// The message is encoded once. Delivery works from a snapshot taken
    /// under the lock; the sends themselves happen after it is released. A
    /// failed send does not stop delivery to the rest: the failing
    /// connection is removed afterwards.
    pub fn send_to_all_except(&self, message: &Message, excluded: &[u8]) -> usize {
        let frame = message.to_frame();
        let targets = self.all();

        let mut delivered = 0;
        let mut failed = Vec::new();
        for connection in targets
            .iter()
            .filter(|c| !excluded.contains(&c.client_number))
        {
            match connection.outbox.send_frame(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(
                        "Broadcast to client {} failed: {}",
                        connection.client_number, e
                    );
                    failed.push(connection);
                }
            }
        }

        for connection in failed {
            self.remove(connection);
        }
        delivered
    }

    /// Returns the number of registered connections
    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    /// Returns true if no connections are registered
    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }

    fn first_free(connections: &[ConnectionHandle], max_clients: usize) -> Option<u8> {
        (0..=u8::MAX)
            .take(max_clients)
            .find(|n| !connections.iter().any(|c| c.client_number == *n))
    }
}
