use crate::config::ServerConfig;
use crate::dispatch::HandlerTable;
use crate::handshake;
use crate::registry::ConnectionRegistry;
use crate::strings::Strings;
use shared::World;
use std::sync::Arc;

/// State shared by every connection task.
pub struct ServerContext {
    pub config: ServerConfig,
    pub world: Arc<dyn World>,
    pub registry: ConnectionRegistry,
    pub handlers: HandlerTable,
    pub strings: Strings,
}

impl ServerContext {
    /// Context with the standard handshake handlers.
    pub fn new(config: ServerConfig, world: Arc<dyn World>) -> Self {
        Self::with_handlers(config, world, handshake::handler_table())
    }

    pub fn with_handlers(
        config: ServerConfig,
        world: Arc<dyn World>,
        handlers: HandlerTable,
    ) -> Self {
        Self {
            registry: ConnectionRegistry::new(config.max_clients),
            config,
            world,
            handlers,
            strings: Strings::english(),
        }
    }
}
