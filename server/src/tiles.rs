//! Tile streaming.
//!
//! A client entering the world is sent the 3×3 block of sections around its
//! spawn, and around the tile it asked for if that request is usable. Each
//! section goes out as one message per tile row, followed by a confirm
//! message telling the client which section range is now complete.

use crate::error::SessionError;
use crate::session::Session;
use log::debug;
use shared::message::{TileConfirm, TileRow};
use shared::{Message, Section, SectionCoord, World, BASE_LOADING_HINT, EDGE_MARGIN, SECTION_HEIGHT};

/// Whether a tile-block request targets a streamable position.
///
/// `-1` on either axis means "no position". Positions within
/// [`EDGE_MARGIN`] tiles of any world edge are rejected.
pub fn is_valid_block_request(world: &dyn World, x: i32, y: i32) -> bool {
    if x == -1 || y == -1 {
        return false;
    }
    if x < EDGE_MARGIN || x > world.width() - EDGE_MARGIN {
        return false;
    }
    if y < EDGE_MARGIN || y > world.height() - EDGE_MARGIN {
        return false;
    }
    true
}

/// Progress hint for the loading message. Two blocks get streamed when the
/// request was usable, so the hint doubles.
pub fn loading_hint(valid: bool) -> i32 {
    if valid {
        BASE_LOADING_HINT * 2
    } else {
        BASE_LOADING_HINT
    }
}

/// Section range a client may treat as loaded after a block around
/// `center` has been streamed.
pub fn confirm_box(center: SectionCoord) -> TileConfirm {
    TileConfirm {
        start_x: (center.x - 2) as i16,
        start_y: (center.y - 1) as i16,
        end_x: (center.x + 2) as i16,
        end_y: (center.y + 1) as i16,
    }
}

/// One tile-section message per row of `section`, top to bottom.
pub fn section_rows(section: &Section) -> impl Iterator<Item = Message> + '_ {
    let origin = section.coord.origin();
    (0..SECTION_HEIGHT).map(move |row| {
        Message::TileSection(TileRow {
            x: origin.x,
            y: origin.y + row,
            tiles: section.row(row as usize).to_vec(),
        })
    })
}

/// Streams every stored section of the 3×3 block around `center`.
///
/// Sections the world has not generated are skipped. Returns the number of
/// row messages queued.
pub fn send_section_neighborhood(
    session: &Session,
    world: &dyn World,
    center: SectionCoord,
) -> Result<usize, SessionError> {
    let mut sent = 0;
    for section in world.sections_in_block_around(center).into_iter().flatten() {
        for message in section_rows(&section) {
            session.send(&message)?;
            sent += 1;
        }
    }
    debug!(
        "Client {}: streamed {} rows around section ({}, {})",
        session.client_number, sent, center.x, center.y
    );
    Ok(sent)
}
