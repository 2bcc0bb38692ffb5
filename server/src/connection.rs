//! One client connection, from accept to close.
//!
//! Each accepted stream gets two tasks:
//! - a reader, which owns the [`Session`], reassembles frames and runs the
//!   handlers in arrival order
//! - a writer, which drains the connection's outbox onto the socket
//!
//! Either side ending ends the connection: the session is deregistered, the
//! transport is shut down, and the rest of the server is told if a player
//! had joined.

use crate::context::ServerContext;
use crate::dispatch::DispatchError;
use crate::error::ServerError;
use crate::handshake::{ANNOUNCEMENT_COLOR, SERVER_CLIENT_NUMBER};
use crate::session::{HandshakeState, Outbound, Outbox, Session};
use crate::strings::Text;
use log::{debug, info, warn};
use shared::{DecodeError, FrameDecoder, Message};
use std::future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{self, Instant};

const READ_BUFFER_SIZE: usize = 4096;

/// What woke the reader.
enum Event {
    Read(std::io::Result<usize>),
    Closed,
    TimedOut,
}

/// Runs a connection to completion.
pub async fn serve<R, W>(mut reader: R, writer: W, addr: SocketAddr, context: Arc<ServerContext>)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    // An unrepresentable deadline means there is none.
    let deadline = context
        .config
        .handshake_timeout
        .and_then(|timeout| Instant::now().checked_add(timeout));

    let (outbox, rx) = Outbox::channel();
    let writer_task = tokio::spawn(write_loop(writer, rx, outbox.clone()));

    let Some(handle) = context.registry.register(addr, outbox.clone()) else {
        warn!("Rejecting {}: server is full", addr);
        let _ = outbox.send(&Message::Disconnect {
            reason: context.strings.get(Text::ServerFull).to_string(),
        });
        outbox.close();
        let _ = writer_task.await;
        return;
    };

    let session = Session::new(handle.client_number, addr, outbox);
    let mut connection = Connection::new(session, Arc::clone(&context));

    if let Err(e) = connection.read_loop(&mut reader, deadline).await {
        warn!("Client {} dropped: {}", connection.session.client_number, e);
    }

    // Announce while the number is still held, so no newcomer reusing it is
    // left out.
    let session = connection.session;
    if let Some(name) = session.player_name() {
        context.registry.send_to_all_except(
            &Message::Chat {
                client_number: SERVER_CLIENT_NUMBER,
                color: ANNOUNCEMENT_COLOR,
                text: context.strings.format(Text::PlayerLeft, name),
            },
            &[session.client_number],
        );
    }
    context.registry.remove(&handle);

    let _ = writer_task.await;
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

/// Receiving side of a connection: its decoder, its session and the shared
/// context handlers run against.
pub struct Connection {
    decoder: FrameDecoder,
    session: Session,
    context: Arc<ServerContext>,
}

impl Connection {
    pub fn new(session: Session, context: Arc<ServerContext>) -> Self {
        Self {
            decoder: FrameDecoder::new(),
            session,
            context,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    async fn read_loop<R>(
        &mut self,
        reader: &mut R,
        deadline: Option<Instant>,
    ) -> Result<(), ServerError>
    where
        R: AsyncRead + Unpin,
    {
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        let outbox = self.session.outbox().clone();

        while !self.session.is_disconnected() {
            let awaiting_auth = self.session.state() < HandshakeState::Authenticated;
            let event = tokio::select! {
                _ = outbox.closed() => Event::Closed,
                _ = expire(deadline), if awaiting_auth => Event::TimedOut,
                result = reader.read(&mut buffer) => Event::Read(result),
            };

            match event {
                Event::Closed => {
                    debug!("Client {} transport released", self.session.client_number);
                    return Ok(());
                }
                Event::TimedOut => {
                    warn!(
                        "Client {} did not finish connecting in time",
                        self.session.client_number
                    );
                    let reason = self.context.strings.get(Text::HandshakeTimeout);
                    self.session.disconnect(Some(reason));
                    return Ok(());
                }
                Event::Read(Ok(0)) => {
                    info!("Client {} closed the connection", self.session.client_number);
                    return Ok(());
                }
                Event::Read(Ok(n)) => self.process_chunk(&buffer[..n])?,
                Event::Read(Err(e)) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Feeds one socket read through the decoder and dispatches every frame
    /// it completes.
    ///
    /// Unknown types, malformed payloads and unhandled messages are logged
    /// and skipped. A framing error or a closed outbox ends the connection.
    pub fn process_chunk(&mut self, chunk: &[u8]) -> Result<(), ServerError> {
        self.decoder.extend(chunk);
        let context = self.context.as_ref();

        while !self.session.is_disconnected() {
            let Some(frame) = self.decoder.next_frame()? else {
                break;
            };

            let message = match Message::from_frame(&frame) {
                Ok(message) => message,
                Err(DecodeError::UnknownType(tag)) => {
                    warn!("Need to implement parser for message type {}", tag);
                    continue;
                }
                Err(e) => {
                    warn!("Client {}: {}", self.session.client_number, e);
                    continue;
                }
            };

            match context.handlers.dispatch(&mut self.session, context, message) {
                Ok(()) => {}
                Err(DispatchError::Unhandled { code, description }) => {
                    warn!(
                        "Client {}: Code<{}>: {}",
                        self.session.client_number, code, description
                    );
                }
                Err(DispatchError::Session(e)) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

async fn write_loop<W>(mut writer: W, mut rx: UnboundedReceiver<Outbound>, outbox: Outbox)
where
    W: AsyncWrite + Unpin,
{
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Frame(frame) => {
                if let Err(e) = writer.write_all(&frame).await {
                    debug!("Write failed: {}", e);
                    outbox.close();
                    break;
                }
            }
            Outbound::Close => break,
        }
    }
    let _ = writer.shutdown().await;
}
