//! # Tile World Server Library
//!
//! This library implements the server side of a binary, length-prefixed game
//! protocol over TCP. Clients connect, prove they speak the right protocol
//! version (and optionally know the server password), describe their
//! character, download the terrain around them and spawn into the world.
//!
//! ## Core Responsibilities
//!
//! ### Connection Lifecycle
//! Every accepted stream gets a reader task and a writer task:
//! - The reader reassembles frames, decodes messages and runs the handlers
//! - The writer drains the connection's outbox onto the socket
//! - Either one ending releases the connection and frees its client number
//!
//! ### Handshake
//! A per-connection state machine walks each client from its connection
//! request through password check, player data, world data and the tile
//! stream to its first spawn. Messages arriving out of place are logged and
//! ignored rather than treated as fatal.
//!
//! ### Tile Streaming
//! Terrain is sent in sections of 200 × 150 tiles, one message per tile row,
//! for the 3×3 block around the spawn point and around any usable position
//! the client asked for.
//!
//! ## Architecture Design
//!
//! ### Task Per Connection
//! Connections share nothing but the [`context::ServerContext`]: the
//! configuration, the world, the handler table and the connection registry.
//! A failure in one connection never reaches another.
//!
//! ### Registry
//! The [`registry::ConnectionRegistry`] is the only mutable shared state. It
//! hands out client numbers, tracks live connections and broadcasts. Its
//! lock is never held while sending.
//!
//! ### Handler Table
//! Dispatch goes through a table from message type to handler function,
//! built once at startup. A message with no handler is reported and
//! skipped; the connection stays open.
//!
//! ## Module Organization
//!
//! - `config`: runtime settings
//! - `connection`: reader and writer tasks for one client
//! - `context`: state shared by every connection
//! - `dispatch`: the handler table
//! - `error`: connection-level error types
//! - `generator`: seeded demo terrain
//! - `handshake`: the handlers that drive the handshake
//! - `network`: the TCP accept loop
//! - `registry`: live connections and client numbers
//! - `session`: per-connection state and outbox
//! - `strings`: player-facing text
//! - `tiles`: section streaming
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::generator::GeneratedWorld;
//! use server::network::Server;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let world = GeneratedWorld::generate(
//!         config.world_width,
//!         config.world_height,
//!         config.world_seed,
//!         &config.world_name,
//!     );
//!
//!     let server = Server::bind(config, Arc::new(world)).await?;
//!     server.run().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod generator;
pub mod handshake;
pub mod network;
pub mod registry;
pub mod session;
pub mod strings;
pub mod tiles;
