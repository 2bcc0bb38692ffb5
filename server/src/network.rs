//! Server network layer accepting TCP connections

use crate::config::ServerConfig;
use crate::connection;
use crate::context::ServerContext;
use log::{error, info};
use shared::World;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Listening socket plus the state every connection shares
pub struct Server {
    listener: TcpListener,
    context: Arc<ServerContext>,
}

impl Server {
    /// Binds the configured address and builds the shared context
    pub async fn bind(config: ServerConfig, world: Arc<dyn World>) -> io::Result<Self> {
        let listener = TcpListener::bind(config.address()).await?;
        info!("Server listening on {}", listener.local_addr()?);
        if config.requires_password() {
            info!("Clients must provide a password");
        }

        Ok(Server {
            listener,
            context: Arc::new(ServerContext::new(config, world)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn context(&self) -> Arc<ServerContext> {
        Arc::clone(&self.context)
    }

    /// Accepts connections until the task is dropped, one task pair per client
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        error!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                    }
                    let (reader, writer) = stream.into_split();
                    let context = Arc::clone(&self.context);
                    tokio::spawn(async move {
                        connection::serve(reader, writer, addr, context).await;
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GeneratedWorld;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let config = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        let world = Arc::new(GeneratedWorld::generate(400, 300, 1, "test"));
        let server = Server::bind(config, world).await.unwrap();

        assert_ne!(server.local_addr().unwrap().port(), 0);
        assert!(server.context().registry.is_empty());
    }
}
