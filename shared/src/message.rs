//! Message codec.
//!
//! A frame's tag selects the [`MessageType`]; its payload is decoded into
//! the matching [`Message`] variant. Decoding has no side effects.

use crate::codec::{CodecError, PacketReader, PacketWriter};
use bytes::Bytes;
use crate::frame::{encode_frame, Frame};
use crate::player::{Appearance, Color, Player};
use crate::world::{Tile, WorldInfo};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Type tags understood by the server and client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    ConnectionRequest = 1,
    Disconnect = 2,
    PlayerDataRequest = 3,
    PlayerInfo = 4,
    PlayerInventory = 5,
    WorldDataRequest = 6,
    WorldData = 7,
    TileBlockRequest = 8,
    TileLoading = 9,
    TileSection = 10,
    TileConfirm = 11,
    Spawn = 12,
    PlayerUpdate = 13,
    PlayerHp = 16,
    Chat = 25,
    PasswordRequest = 37,
    PasswordResponse = 38,
    PlayerMana = 42,
    SpawnRequest = 49,
    PlayerBuff = 50,
}

impl MessageType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        use MessageType::*;
        let kind = match tag {
            1 => ConnectionRequest,
            2 => Disconnect,
            3 => PlayerDataRequest,
            4 => PlayerInfo,
            5 => PlayerInventory,
            6 => WorldDataRequest,
            7 => WorldData,
            8 => TileBlockRequest,
            9 => TileLoading,
            10 => TileSection,
            11 => TileConfirm,
            12 => Spawn,
            13 => PlayerUpdate,
            16 => PlayerHp,
            25 => Chat,
            37 => PasswordRequest,
            38 => PasswordResponse,
            42 => PlayerMana,
            49 => SpawnRequest,
            50 => PlayerBuff,
            _ => return None,
        };
        Some(kind)
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// No message type is defined for this tag. The frame is dropped.
    #[error("unknown message type {0}")]
    UnknownType(u8),

    /// The payload does not fit the layout of its type.
    #[error("malformed {kind:?} payload: {reason}")]
    Malformed { kind: MessageType, reason: CodecError },
}

/// Current and maximum of a player stat (life or mana).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vitals {
    pub client_number: u8,
    pub current: i16,
    pub max: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySlot {
    pub client_number: u8,
    pub slot: u8,
    pub stack: i16,
    pub prefix: u8,
    pub item_id: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileBlockRequest {
    pub x: i32,
    pub y: i32,
}

/// Section-grid rectangle the client may now consider loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileConfirm {
    pub start_x: i16,
    pub start_y: i16,
    pub end_x: i16,
    pub end_y: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub client_number: u8,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerUpdate {
    pub client_number: u8,
    pub control: u8,
    pub selected_item: u8,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
}

/// One row of a section: where it starts and its tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRow {
    pub x: i32,
    pub y: i32,
    pub tiles: Vec<Tile>,
}

#[derive(Serialize, Deserialize)]
struct TileRowHeader {
    x: i32,
    y: i32,
    count: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// `version` is `None` when the declared length did not match the bytes
    /// that followed it.
    ConnectionRequest { version: Option<String> },
    Disconnect { reason: String },
    PlayerDataRequest { client_number: u8 },
    PlayerInfo { client_number: u8, player: Player },
    PlayerInventory(InventorySlot),
    WorldDataRequest,
    WorldData(WorldInfo),
    TileBlockRequest(TileBlockRequest),
    TileLoading { hint: i32, text: String },
    TileSection(TileRow),
    TileConfirm(TileConfirm),
    Spawn(SpawnPoint),
    PlayerUpdate(PlayerUpdate),
    PlayerHp(Vitals),
    Chat { client_number: u8, color: Color, text: String },
    PasswordRequest,
    PasswordResponse { password: String },
    PlayerMana(Vitals),
    SpawnRequest,
    PlayerBuff { client_number: u8, buffs: Vec<u16> },
}

impl Message {
    pub fn kind(&self) -> MessageType {
        match self {
            Message::ConnectionRequest { .. } => MessageType::ConnectionRequest,
            Message::Disconnect { .. } => MessageType::Disconnect,
            Message::PlayerDataRequest { .. } => MessageType::PlayerDataRequest,
            Message::PlayerInfo { .. } => MessageType::PlayerInfo,
            Message::PlayerInventory(_) => MessageType::PlayerInventory,
            Message::WorldDataRequest => MessageType::WorldDataRequest,
            Message::WorldData(_) => MessageType::WorldData,
            Message::TileBlockRequest(_) => MessageType::TileBlockRequest,
            Message::TileLoading { .. } => MessageType::TileLoading,
            Message::TileSection(_) => MessageType::TileSection,
            Message::TileConfirm(_) => MessageType::TileConfirm,
            Message::Spawn(_) => MessageType::Spawn,
            Message::PlayerUpdate(_) => MessageType::PlayerUpdate,
            Message::PlayerHp(_) => MessageType::PlayerHp,
            Message::Chat { .. } => MessageType::Chat,
            Message::PasswordRequest => MessageType::PasswordRequest,
            Message::PasswordResponse { .. } => MessageType::PasswordResponse,
            Message::PlayerMana(_) => MessageType::PlayerMana,
            Message::SpawnRequest => MessageType::SpawnRequest,
            Message::PlayerBuff { .. } => MessageType::PlayerBuff,
        }
    }

    pub fn from_frame(frame: &Frame) -> Result<Self, DecodeError> {
        Self::decode(frame.tag, &frame.payload)
    }

    /// Decodes a payload according to its type tag.
    pub fn decode(tag: u8, payload: &[u8]) -> Result<Self, DecodeError> {
        let kind = MessageType::from_tag(tag).ok_or(DecodeError::UnknownType(tag))?;
        if kind == MessageType::ConnectionRequest {
            return Ok(decode_connection_request(payload));
        }

        let mut r = PacketReader::new(payload);
        decode_body(kind, &mut r).map_err(|reason| DecodeError::Malformed { kind, reason })
    }

    /// Payload bytes, without length prefix or tag.
    pub fn encode_payload(&self) -> Bytes {
        let mut w = PacketWriter::new();
        match self {
            Message::ConnectionRequest { version } => {
                // A missing version encodes as an empty payload, which decodes
                // back to the same sentinel.
                if let Some(version) = version {
                    w.write_u16(version.len() as u16).write_bytes(version.as_bytes());
                }
            }
            Message::Disconnect { reason } => {
                w.write_string(reason);
            }
            Message::PlayerDataRequest { client_number } => {
                w.write_u8(*client_number);
            }
            Message::PlayerInfo {
                client_number,
                player,
            } => {
                w.write_u8(*client_number)
                    .write_u8(player.skin_variant)
                    .write_u8(player.hair)
                    .write_string(&player.name)
                    .write_struct(&player.appearance);
            }
            Message::PlayerInventory(slot) => {
                w.write_struct(slot);
            }
            Message::WorldDataRequest | Message::PasswordRequest | Message::SpawnRequest => {}
            Message::WorldData(info) => {
                w.write_struct(info).write_string(&info.name);
            }
            Message::TileBlockRequest(request) => {
                w.write_struct(request);
            }
            Message::TileLoading { hint, text } => {
                w.write_struct(hint).write_string(text);
            }
            Message::TileSection(row) => {
                w.write_struct(&TileRowHeader {
                    x: row.x,
                    y: row.y,
                    count: row.tiles.len() as u16,
                });
                for tile in &row.tiles {
                    w.write_struct(tile);
                }
            }
            Message::TileConfirm(confirm) => {
                w.write_struct(confirm);
            }
            Message::Spawn(spawn) => {
                w.write_struct(spawn);
            }
            Message::PlayerUpdate(update) => {
                w.write_struct(update);
            }
            Message::PlayerHp(vitals) | Message::PlayerMana(vitals) => {
                w.write_struct(vitals);
            }
            Message::Chat {
                client_number,
                color,
                text,
            } => {
                w.write_u8(*client_number)
                    .write_struct(color)
                    .write_string(text);
            }
            Message::PasswordResponse { password } => {
                w.write_string(password);
            }
            Message::PlayerBuff {
                client_number,
                buffs,
            } => {
                w.write_u8(*client_number);
                for buff in buffs {
                    w.write_u16(*buff);
                }
            }
        }
        w.finish()
    }

    /// Complete wire bytes: length prefix, tag and payload.
    pub fn to_frame(&self) -> Bytes {
        encode_frame(self.kind().tag(), &self.encode_payload())
    }
}

/// The payload is a `u16` declared length followed by the version string.
/// Any disagreement between the two yields the no-version sentinel, which the
/// handshake then rejects.
fn decode_connection_request(payload: &[u8]) -> Message {
    let mut r = PacketReader::new(payload);
    let version = match r.read_u16() {
        Ok(declared) if declared as usize == r.remaining() => {
            String::from_utf8(r.rest().to_vec()).ok()
        }
        _ => None,
    };
    Message::ConnectionRequest { version }
}

fn decode_body(kind: MessageType, r: &mut PacketReader<'_>) -> Result<Message, CodecError> {
    let message = match kind {
        MessageType::ConnectionRequest => return Ok(decode_connection_request(r.rest())),
        MessageType::Disconnect => Message::Disconnect {
            reason: r.read_string()?,
        },
        MessageType::PlayerDataRequest => Message::PlayerDataRequest {
            client_number: r.read_u8()?,
        },
        MessageType::PlayerInfo => {
            let client_number = r.read_u8()?;
            let skin_variant = r.read_u8()?;
            let hair = r.read_u8()?;
            let name = r.read_string()?;
            let appearance: Appearance = r.read_struct()?;
            let mut player = Player::new(name);
            player.skin_variant = skin_variant;
            player.hair = hair;
            player.appearance = appearance;
            Message::PlayerInfo {
                client_number,
                player,
            }
        }
        MessageType::PlayerInventory => Message::PlayerInventory(r.read_struct()?),
        MessageType::WorldDataRequest => Message::WorldDataRequest,
        MessageType::WorldData => {
            let mut info: WorldInfo = r.read_struct()?;
            info.name = r.read_string()?;
            Message::WorldData(info)
        }
        MessageType::TileBlockRequest => Message::TileBlockRequest(r.read_struct()?),
        MessageType::TileLoading => Message::TileLoading {
            hint: r.read_struct()?,
            text: r.read_string()?,
        },
        MessageType::TileSection => {
            let header: TileRowHeader = r.read_struct()?;
            let mut tiles = Vec::with_capacity(header.count as usize);
            for _ in 0..header.count {
                tiles.push(r.read_struct::<Tile>()?);
            }
            Message::TileSection(TileRow {
                x: header.x,
                y: header.y,
                tiles,
            })
        }
        MessageType::TileConfirm => Message::TileConfirm(r.read_struct()?),
        MessageType::Spawn => Message::Spawn(r.read_struct()?),
        MessageType::PlayerUpdate => Message::PlayerUpdate(r.read_struct()?),
        MessageType::PlayerHp => Message::PlayerHp(r.read_struct()?),
        MessageType::Chat => Message::Chat {
            client_number: r.read_u8()?,
            color: r.read_struct()?,
            text: r.read_string()?,
        },
        MessageType::PasswordRequest => Message::PasswordRequest,
        MessageType::PasswordResponse => Message::PasswordResponse {
            password: r.read_string()?,
        },
        MessageType::PlayerMana => Message::PlayerMana(r.read_struct()?),
        MessageType::SpawnRequest => Message::SpawnRequest,
        MessageType::PlayerBuff => {
            let client_number = r.read_u8()?;
            let buffs = r.read_u16_list()?;
            Message::PlayerBuff {
                client_number,
                buffs,
            }
        }
    };
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PROTOCOL_VERSION;
    use assert_approx_eq::assert_approx_eq;

    fn connection_payload(declared: u16, version: &str) -> Vec<u8> {
        let mut payload = declared.to_le_bytes().to_vec();
        payload.extend_from_slice(version.as_bytes());
        payload
    }

    #[test]
    fn test_connection_request_valid() {
        let payload = connection_payload(PROTOCOL_VERSION.len() as u16, PROTOCOL_VERSION);
        let message = Message::decode(1, &payload).unwrap();
        assert_eq!(
            message,
            Message::ConnectionRequest {
                version: Some(PROTOCOL_VERSION.to_string())
            }
        );
    }

    #[test]
    fn test_connection_request_length_mismatch() {
        for declared in [0u16, 10, 12, 300] {
            let payload = connection_payload(declared, PROTOCOL_VERSION);
            assert_eq!(
                Message::decode(1, &payload).unwrap(),
                Message::ConnectionRequest { version: None },
                "declared length {}",
                declared
            );
        }
    }

    #[test]
    fn test_connection_request_short_payload() {
        assert_eq!(
            Message::decode(1, &[5]).unwrap(),
            Message::ConnectionRequest { version: None }
        );
        assert_eq!(
            Message::decode(1, &[]).unwrap(),
            Message::ConnectionRequest { version: None }
        );
    }

    #[test]
    fn test_unknown_type() {
        assert_eq!(Message::decode(200, &[1, 2, 3]), Err(DecodeError::UnknownType(200)));
        assert_eq!(Message::decode(0, &[]), Err(DecodeError::UnknownType(0)));
    }

    #[test]
    fn test_malformed_known_type() {
        let err = Message::decode(MessageType::TileBlockRequest.tag(), &[1, 0, 0]).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Malformed {
                kind: MessageType::TileBlockRequest,
                ..
            }
        ));

        let err = Message::decode(MessageType::PlayerBuff.tag(), &[0, 1, 0, 2]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Malformed {
                kind: MessageType::PlayerBuff,
                reason: CodecError::OddLength(3)
            }
        );
    }

    #[test]
    fn test_tile_block_request_layout() {
        let mut payload = (-1i32).to_le_bytes().to_vec();
        payload.extend_from_slice(&250i32.to_le_bytes());
        assert_eq!(
            Message::decode(8, &payload).unwrap(),
            Message::TileBlockRequest(TileBlockRequest { x: -1, y: 250 })
        );
    }

    #[test]
    fn test_tile_confirm_layout() {
        let message = Message::TileConfirm(TileConfirm {
            start_x: -2,
            start_y: -1,
            end_x: 2,
            end_y: 1,
        });
        assert_eq!(
            &message.to_frame()[..],
            &[9, 0, 11, 0xfe, 0xff, 0xff, 0xff, 2, 0, 1, 0]
        );
    }

    #[test]
    fn test_player_update_floats() {
        let update = PlayerUpdate {
            client_number: 3,
            control: 0b101,
            selected_item: 9,
            x: 1234.5,
            y: -16.25,
            vel_x: 3.1,
            vel_y: 0.0,
        };
        let payload = Message::PlayerUpdate(update).encode_payload();
        assert_eq!(payload.len(), 3 + 4 * 4);

        match Message::decode(13, &payload).unwrap() {
            Message::PlayerUpdate(decoded) => {
                assert_eq!(decoded.client_number, 3);
                assert_approx_eq!(decoded.x, 1234.5);
                assert_approx_eq!(decoded.y, -16.25);
                assert_approx_eq!(decoded.vel_x, 3.1);
            }
            other => panic!("Unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_message_roundtrip() {
        let mut player = Player::new("Andrew");
        player.hair = 4;
        player.appearance.eye_color = Color::new(10, 20, 30);
        player.appearance.difficulty = 1;

        let messages = vec![
            Message::ConnectionRequest {
                version: Some(PROTOCOL_VERSION.to_string()),
            },
            Message::ConnectionRequest { version: None },
            Message::Disconnect {
                reason: "You are not using the same version as this server.".to_string(),
            },
            Message::PlayerDataRequest { client_number: 7 },
            Message::PlayerInfo {
                client_number: 7,
                player,
            },
            Message::PlayerInventory(InventorySlot {
                client_number: 1,
                slot: 58,
                stack: 99,
                prefix: 0,
                item_id: 3507,
            }),
            Message::WorldDataRequest,
            Message::WorldData(WorldInfo {
                time: 13500,
                flags: WorldInfo::DAY_TIME,
                width: 4200,
                height: 1200,
                spawn_x: 2100,
                spawn_y: 300,
                name: "Rust Valley".to_string(),
                ..WorldInfo::default()
            }),
            Message::TileLoading {
                hint: 2700,
                text: "Receiving tile data".to_string(),
            },
            Message::TileBlockRequest(TileBlockRequest { x: 2100, y: -1 }),
            Message::TileSection(TileRow {
                x: 400,
                y: 151,
                tiles: vec![Tile::solid(1), Tile::air(), Tile::solid(0)],
            }),
            Message::TileConfirm(TileConfirm {
                start_x: 0,
                start_y: 1,
                end_x: 4,
                end_y: 3,
            }),
            Message::Spawn(SpawnPoint {
                client_number: 2,
                x: -1,
                y: -1,
            }),
            Message::PlayerHp(Vitals {
                client_number: 2,
                current: 100,
                max: 100,
            }),
            Message::PlayerMana(Vitals {
                client_number: 2,
                current: 20,
                max: 20,
            }),
            Message::Chat {
                client_number: 255,
                color: Color::new(255, 240, 20),
                text: "Andrew has joined.".to_string(),
            },
            Message::PasswordRequest,
            Message::PasswordResponse {
                password: "hunter2".to_string(),
            },
            Message::SpawnRequest,
            Message::PlayerBuff {
                client_number: 0,
                buffs: vec![1, 2, 300],
            },
        ];

        for message in messages {
            let frame = message.to_frame();
            let decoded = Message::decode(frame[2], &frame[3..]).unwrap();
            assert_eq!(decoded, message);
        }
    }
}
