//! Per-connection state.
//!
//! A [`Session`] is owned by its connection task and only mutated by the
//! handshake handlers running on that task. Everything the outside world may
//! do to a connection goes through its [`Outbox`]: queue frames for the
//! writer task, or close the transport.

use crate::error::SessionError;
use bytes::Bytes;
use log::debug;
use shared::{Message, Player};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

/// Work for a connection's writer task.
#[derive(Debug)]
pub enum Outbound {
    Frame(Bytes),
    /// Flush what is queued, then shut the socket down.
    Close,
}

/// Sending side of a connection. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<Outbound>,
    closed: Arc<Notify>,
}

impl Outbox {
    /// Creates an outbox and the receiver its writer task drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                closed: Arc::new(Notify::new()),
            },
            rx,
        )
    }

    pub fn send(&self, message: &Message) -> Result<(), SessionError> {
        self.send_frame(message.to_frame())
    }

    /// Queues already-encoded wire bytes.
    pub fn send_frame(&self, frame: Bytes) -> Result<(), SessionError> {
        self.tx
            .send(Outbound::Frame(frame))
            .map_err(|_| SessionError::Closed)
    }

    /// Releases the transport: the writer flushes and shuts down, and the
    /// reader is woken so its task can exit.
    pub fn close(&self) {
        let _ = self.tx.send(Outbound::Close);
        self.closed.notify_one();
    }

    /// Resolves once [`Outbox::close`] has been called.
    pub async fn closed(&self) {
        self.closed.notified().await;
    }
}

/// Handshake progress. States only move forward, except into
/// `Disconnected`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandshakeState {
    Connecting,
    VersionChecked,
    Authenticating,
    Authenticated,
    PlayerDataExchanged,
    WorldRequested,
    TileStreamed,
    Spawned,
    Disconnected,
}

#[derive(Debug)]
pub struct Session {
    pub client_number: u8,
    pub addr: SocketAddr,
    pub authenticated: bool,
    pub player: Option<Player>,
    state: HandshakeState,
    outbox: Outbox,
}

impl Session {
    pub fn new(client_number: u8, addr: SocketAddr, outbox: Outbox) -> Self {
        Self {
            client_number,
            addr,
            authenticated: false,
            player: None,
            state: HandshakeState::Connecting,
            outbox,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Moves to `next` if it is further along than the current state.
    pub fn advance(&mut self, next: HandshakeState) {
        if self.state != HandshakeState::Disconnected && next > self.state {
            debug!(
                "Client {} handshake {:?} -> {:?}",
                self.client_number, self.state, next
            );
            self.state = next;
        }
    }

    pub fn is_disconnected(&self) -> bool {
        self.state == HandshakeState::Disconnected
    }

    pub fn send(&self, message: &Message) -> Result<(), SessionError> {
        self.outbox.send(message)
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn player_name(&self) -> Option<&str> {
        self.player.as_ref().map(|p| p.name.as_str())
    }

    /// Ends the session, sending a disconnect notice first when a reason is
    /// given. The notice is best effort.
    pub fn disconnect(&mut self, reason: Option<&str>) {
        if self.is_disconnected() {
            return;
        }
        if let Some(reason) = reason {
            let _ = self.send(&Message::Disconnect {
                reason: reason.to_string(),
            });
        }
        self.outbox.close();
        self.state = HandshakeState::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:7777".parse().unwrap()
    }

    #[test]
    fn test_session_creation() {
        let (outbox, _rx) = Outbox::channel();
        let session = Session::new(3, test_addr(), outbox);

        assert_eq!(session.client_number, 3);
        assert_eq!(session.state(), HandshakeState::Connecting);
        assert!(!session.authenticated);
        assert!(session.player.is_none());
    }

    #[test]
    fn test_advance_only_moves_forward() {
        let (outbox, _rx) = Outbox::channel();
        let mut session = Session::new(0, test_addr(), outbox);

        session.advance(HandshakeState::Spawned);
        session.advance(HandshakeState::TileStreamed);
        assert_eq!(session.state(), HandshakeState::Spawned);
    }

    #[test]
    fn test_disconnect_sends_notice_then_close() {
        let (outbox, mut rx) = Outbox::channel();
        let mut session = Session::new(0, test_addr(), outbox);

        session.disconnect(Some("bye"));
        assert!(session.is_disconnected());

        match rx.try_recv().unwrap() {
            Outbound::Frame(frame) => {
                let message = Message::decode(frame[2], &frame[3..]).unwrap();
                assert_eq!(
                    message,
                    Message::Disconnect {
                        reason: "bye".to_string()
                    }
                );
            }
            other => panic!("Unexpected outbound {:?}", other),
        }
        assert!(matches!(rx.try_recv().unwrap(), Outbound::Close));

        // Terminal: nothing moves it out of Disconnected.
        session.advance(HandshakeState::Spawned);
        assert!(session.is_disconnected());
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (outbox, rx) = Outbox::channel();
        drop(rx);
        let session = Session::new(0, test_addr(), outbox);
        assert_eq!(
            session.send(&Message::SpawnRequest),
            Err(SessionError::Closed)
        );
    }

    #[tokio::test]
    async fn test_close_wakes_waiter() {
        let (outbox, _rx) = Outbox::channel();
        let waiter = outbox.clone();
        outbox.close();
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter.closed())
            .await
            .unwrap();
    }
}
