//! Handler table and dispatch.
//!
//! The table maps a message type to the one function that handles it. It is
//! built once when the server starts and shared read-only by every
//! connection task.

use crate::context::ServerContext;
use crate::error::SessionError;
use crate::session::Session;
use shared::{Message, MessageType};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Error code carried by an unhandled-message failure.
pub const UNHANDLED_ERROR_CODE: &str = "UNHANDLED";

/// Handlers react to a message by mutating the session and queueing replies
/// on its outbox. They only fail when the outbox is gone.
pub type Handler = fn(&mut Session, &ServerContext, Message) -> Result<(), SessionError>;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// No handler is registered for the message type. The connection stays
    /// open; the caller decides whether to log or tell the peer.
    #[error("Code<{code}>: {description}")]
    Unhandled {
        code: &'static str,
        description: String,
    },

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl DispatchError {
    pub fn is_unhandled(&self) -> bool {
        matches!(self, DispatchError::Unhandled { .. })
    }
}

#[derive(Default, Clone)]
pub struct HandlerTable {
    handlers: HashMap<MessageType, Handler>,
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `kind`, returning the handler it replaces.
    pub fn register(&mut self, kind: MessageType, handler: Handler) -> Option<Handler> {
        self.handlers.insert(kind, handler)
    }

    pub fn handles(&self, kind: MessageType) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn dispatch(
        &self,
        session: &mut Session,
        context: &ServerContext,
        message: Message,
    ) -> Result<(), DispatchError> {
        let Some(handler) = self.handlers.get(&message.kind()) else {
            return Err(DispatchError::Unhandled {
                code: UNHANDLED_ERROR_CODE,
                description: format!("Unhandled Message: {:?}", message.kind()),
            });
        };
        handler(session, context, message)?;
        Ok(())
    }
}
