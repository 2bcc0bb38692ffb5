//! Wire protocol shared by the server and its test client.
//!
//! Everything that has to agree byte-for-byte on both ends of a connection
//! lives here: the frame layout, the message tags and payload layouts, the
//! player record carried by the handshake and the tile types streamed to
//! clients.

pub mod codec;
pub mod frame;
pub mod message;
pub mod player;
pub mod world;

pub use frame::{encode_frame, Frame, FrameDecoder, FrameError};
pub use message::{DecodeError, Message, MessageType};
pub use player::{Color, Player};
pub use world::{Section, SectionCoord, Tile, TilePoint, World, WorldInfo};

/// Version token a client must present in its connection request.
pub const PROTOCOL_VERSION: &str = "Terraria173";

/// Size of the little-endian length prefix in front of every frame.
pub const HEADER_LEN: usize = 2;

/// Largest length prefix accepted before the connection is dropped.
pub const MAX_FRAME_LENGTH: usize = 9999;

/// Width of a tile section, in tiles.
pub const SECTION_WIDTH: i32 = 200;

/// Height of a tile section, in tiles.
pub const SECTION_HEIGHT: i32 = 150;

/// Loading hint sent in front of the tile stream; doubled for a usable
/// tile-block request.
pub const BASE_LOADING_HINT: i32 = 1350;

/// Tiles along each world edge that a tile-block request may not target.
pub const EDGE_MARGIN: i32 = 10;
