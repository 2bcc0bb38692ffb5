//! Handshake handlers.
//!
//! Walks a client from its connection request to its first spawn:
//!
//! - version check, then an optional password round trip
//! - player data, then the world snapshot
//! - the tile stream around the spawn point (and the requested position)
//! - the spawn itself
//!
//! Once spawned, gameplay updates keep arriving through the same table.
//! Everything after the connection request requires an authenticated
//! session; anything else is logged and ignored.

use crate::context::ServerContext;
use crate::dispatch::HandlerTable;
use crate::error::SessionError;
use crate::session::{HandshakeState, Session};
use crate::strings::Text;
use crate::tiles;
use log::{debug, info, warn};
use shared::message::TileBlockRequest;
use shared::{Color, Message, MessageType, Player, TilePoint, World, PROTOCOL_VERSION};

/// Client number used as the sender of server-originated chat lines.
pub const SERVER_CLIENT_NUMBER: u8 = u8::MAX;

/// Colour of join and leave announcements.
pub const ANNOUNCEMENT_COLOR: Color = Color::new(255, 240, 20);

/// Builds the table every connection dispatches through.
pub fn handler_table() -> HandlerTable {
    let mut table = HandlerTable::new();
    table.register(MessageType::ConnectionRequest, on_connection_request);
    table.register(MessageType::PasswordResponse, on_password_response);
    table.register(MessageType::PlayerInfo, on_player_info);
    table.register(MessageType::PlayerHp, on_player_hp);
    table.register(MessageType::PlayerMana, on_player_mana);
    table.register(MessageType::PlayerBuff, on_gameplay_update);
    table.register(MessageType::PlayerInventory, on_gameplay_update);
    table.register(MessageType::PlayerUpdate, on_gameplay_update);
    table.register(MessageType::WorldDataRequest, on_world_data_request);
    table.register(MessageType::TileBlockRequest, on_tile_block_request);
    table.register(MessageType::Spawn, on_spawn);
    table.register(MessageType::Chat, on_chat);
    table
}

/// Checks the client version, then asks for a password or authenticates
/// straight away.
fn on_connection_request(
    session: &mut Session,
    context: &ServerContext,
    message: Message,
) -> Result<(), SessionError> {
    let Message::ConnectionRequest { version } = message else {
        return Ok(());
    };
    if session.state() != HandshakeState::Connecting {
        debug!(
            "Client {} sent a repeat connection request, ignoring",
            session.client_number
        );
        return Ok(());
    }

    if version.as_deref() != Some(PROTOCOL_VERSION) {
        warn!(
            "Client {} ({}) has an unsupported version {:?}",
            session.client_number, session.addr, version
        );
        session.disconnect(Some(context.strings.get(Text::UnsupportedClientVersion)));
        return Ok(());
    }
    session.advance(HandshakeState::VersionChecked);

    if context.config.requires_password() {
        session.send(&Message::PasswordRequest)?;
        session.advance(HandshakeState::Authenticating);
        Ok(())
    } else {
        authenticate(session)
    }
}

/// Authenticates on a matching password and disconnects otherwise.
fn on_password_response(
    session: &mut Session,
    context: &ServerContext,
    message: Message,
) -> Result<(), SessionError> {
    let Message::PasswordResponse { password } = message else {
        return Ok(());
    };
    if session.state() != HandshakeState::Authenticating {
        debug!(
            "Client {} sent a password it was not asked for",
            session.client_number
        );
        return Ok(());
    }

    if password == context.config.password {
        authenticate(session)
    } else {
        warn!("Client {} sent an incorrect password", session.client_number);
        session.disconnect(Some(context.strings.get(Text::IncorrectPassword)));
        Ok(())
    }
}

/// Marks the session authenticated and asks for the player data.
fn authenticate(session: &mut Session) -> Result<(), SessionError> {
    session.authenticated = true;
    session.send(&Message::PlayerDataRequest {
        client_number: session.client_number,
    })?;
    session.advance(HandshakeState::Authenticated);
    Ok(())
}

/// Logs and rejects messages from sessions that have not authenticated.
fn require_authenticated(session: &Session, kind: MessageType) -> bool {
    if !session.authenticated {
        warn!(
            "Client {} sent {:?} before authenticating, ignoring",
            session.client_number, kind
        );
    }
    session.authenticated
}

/// Stores the player record. The first one announces the join to everyone
/// else.
fn on_player_info(
    session: &mut Session,
    context: &ServerContext,
    message: Message,
) -> Result<(), SessionError> {
    let Message::PlayerInfo { mut player, .. } = message else {
        return Ok(());
    };
    if !require_authenticated(session, MessageType::PlayerInfo) {
        return Ok(());
    }

    let joined = match session.player.take() {
        Some(previous) => {
            keep_vitals(&mut player, &previous);
            false
        }
        None => true,
    };

    if joined {
        info!(
            "Client {} joined as '{}'",
            session.client_number, player.name
        );
        let text = context.strings.format(Text::PlayerJoined, &player.name);
        context.registry.send_to_all_except(
            &Message::Chat {
                client_number: SERVER_CLIENT_NUMBER,
                color: ANNOUNCEMENT_COLOR,
                text,
            },
            &[session.client_number],
        );
    }

    session.player = Some(player);
    session.advance(HandshakeState::PlayerDataExchanged);
    Ok(())
}

/// A repeated player-info only replaces the character's looks.
fn keep_vitals(player: &mut Player, previous: &Player) {
    player.life = previous.life;
    player.life_max = previous.life_max;
    player.mana = previous.mana;
    player.mana_max = previous.mana_max;
    player.spawn = previous.spawn;
}

/// Records current and maximum life.
fn on_player_hp(
    session: &mut Session,
    _context: &ServerContext,
    message: Message,
) -> Result<(), SessionError> {
    let Message::PlayerHp(vitals) = message else {
        return Ok(());
    };
    if !require_authenticated(session, MessageType::PlayerHp) {
        return Ok(());
    }
    if let Some(player) = session.player.as_mut() {
        player.life = vitals.current;
        player.life_max = vitals.max;
    }
    Ok(())
}

/// Records current and maximum mana.
fn on_player_mana(
    session: &mut Session,
    _context: &ServerContext,
    message: Message,
) -> Result<(), SessionError> {
    let Message::PlayerMana(vitals) = message else {
        return Ok(());
    };
    if !require_authenticated(session, MessageType::PlayerMana) {
        return Ok(());
    }
    if let Some(player) = session.player.as_mut() {
        player.mana = vitals.current;
        player.mana_max = vitals.max;
    }
    Ok(())
}

/// Buffs, inventory and movement are observed only.
fn on_gameplay_update(
    session: &mut Session,
    _context: &ServerContext,
    message: Message,
) -> Result<(), SessionError> {
    if require_authenticated(session, message.kind()) {
        debug!("Client {}: {:?}", session.client_number, message);
    }
    Ok(())
}

/// Replies with the world snapshot.
fn on_world_data_request(
    session: &mut Session,
    context: &ServerContext,
    _message: Message,
) -> Result<(), SessionError> {
    if !require_authenticated(session, MessageType::WorldDataRequest) {
        return Ok(());
    }
    session.send(&Message::WorldData(context.world.info()))?;
    session.advance(HandshakeState::WorldRequested);
    Ok(())
}

/// Streams the sections around the spawn point and, if the request is
/// usable, around the requested tile, then asks the client to spawn.
fn on_tile_block_request(
    session: &mut Session,
    context: &ServerContext,
    message: Message,
) -> Result<(), SessionError> {
    let Message::TileBlockRequest(TileBlockRequest { x, y }) = message else {
        return Ok(());
    };
    if !require_authenticated(session, MessageType::TileBlockRequest) {
        return Ok(());
    }

    let world = context.world.as_ref();
    let valid = tiles::is_valid_block_request(world, x, y);
    if !valid {
        debug!(
            "Client {} requested tiles at ({}, {}), streaming spawn only",
            session.client_number, x, y
        );
    }

    session.send(&Message::TileLoading {
        hint: tiles::loading_hint(valid),
        text: context.strings.get(Text::ReceivingTileData).to_string(),
    })?;

    let spawn_section = world.section_at(world.spawn());
    tiles::send_section_neighborhood(session, world, spawn_section)?;

    if valid {
        let requested = world.section_at(TilePoint::new(x, y));
        tiles::send_section_neighborhood(session, world, requested)?;
        session.send(&Message::TileConfirm(tiles::confirm_box(requested)))?;
    }

    session.send(&Message::TileConfirm(tiles::confirm_box(spawn_section)))?;
    session.send(&Message::SpawnRequest)?;
    session.advance(HandshakeState::TileStreamed);
    Ok(())
}

/// Records where the player spawned. This completes the handshake.
fn on_spawn(
    session: &mut Session,
    _context: &ServerContext,
    message: Message,
) -> Result<(), SessionError> {
    let Message::Spawn(point) = message else {
        return Ok(());
    };
    if !require_authenticated(session, MessageType::Spawn) {
        return Ok(());
    }
    if let Some(player) = session.player.as_mut() {
        player.spawn = (point.x, point.y);
    }
    info!(
        "Client {} spawned at ({}, {})",
        session.client_number, point.x, point.y
    );
    session.advance(HandshakeState::Spawned);
    Ok(())
}

/// Relays a chat line to every connection, the sender included.
fn on_chat(
    session: &mut Session,
    context: &ServerContext,
    message: Message,
) -> Result<(), SessionError> {
    let Message::Chat { color, text, .. } = message else {
        return Ok(());
    };
    if !require_authenticated(session, MessageType::Chat) {
        return Ok(());
    }

    info!(
        "<{}> {}",
        session.player_name().unwrap_or("unknown"),
        text
    );
    context.registry.send_to_all(&Message::Chat {
        client_number: session.client_number,
        color,
        text,
    });
    Ok(())
}
