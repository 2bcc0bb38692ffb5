//! Terrain as seen by the protocol.
//!
//! The server does not own a terrain representation; it talks to one through
//! the [`World`] trait. Terrain is addressed per tile and, more coarsely, per
//! section of [`SECTION_WIDTH`] × [`SECTION_HEIGHT`] tiles.

use crate::{SECTION_HEIGHT, SECTION_WIDTH};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Position of a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TilePoint {
    pub x: i32,
    pub y: i32,
}

impl TilePoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Position of a section on the coarse grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionCoord {
    pub x: i32,
    pub y: i32,
}

impl SectionCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Section holding the given tile.
    pub fn containing(tile: TilePoint) -> Self {
        Self {
            x: tile.x.div_euclid(SECTION_WIDTH),
            y: tile.y.div_euclid(SECTION_HEIGHT),
        }
    }

    /// Top-left tile of this section.
    pub fn origin(self) -> TilePoint {
        TilePoint::new(self.x * SECTION_WIDTH, self.y * SECTION_HEIGHT)
    }
}

/// One tile record as streamed to clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub flags: u8,
    pub kind: u16,
    pub wall: u8,
    pub liquid: u8,
}

impl Tile {
    pub const ACTIVE: u8 = 0x01;

    pub const fn air() -> Self {
        Self {
            flags: 0,
            kind: 0,
            wall: 0,
            liquid: 0,
        }
    }

    pub const fn solid(kind: u16) -> Self {
        Self {
            flags: Self::ACTIVE,
            kind,
            wall: 0,
            liquid: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.flags & Self::ACTIVE != 0
    }
}

/// A block of tiles stored row-major, `SECTION_WIDTH` tiles per row.
///
/// `tiles` may be empty for a section that exists but has no tile data yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub coord: SectionCoord,
    pub tiles: Vec<Tile>,
}

impl Section {
    pub fn new(coord: SectionCoord, tiles: Vec<Tile>) -> Self {
        Self { coord, tiles }
    }

    pub fn empty(coord: SectionCoord) -> Self {
        Self::new(coord, Vec::new())
    }

    /// Tiles of the given row, clipped to what is stored.
    pub fn row(&self, row: usize) -> &[Tile] {
        let width = SECTION_WIDTH as usize;
        let start = (row * width).min(self.tiles.len());
        let end = (start + width).min(self.tiles.len());
        &self.tiles[start..end]
    }
}

/// Fixed fields of the world-data message.
///
/// `name` is skipped by serde: it travels as a length-prefixed string after
/// the fixed part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldInfo {
    pub time: i32,
    pub flags: u8,
    pub moon_phase: u8,
    pub width: i16,
    pub height: i16,
    pub spawn_x: i16,
    pub spawn_y: i16,
    pub surface: i16,
    pub rock_layer: i16,
    pub world_id: i32,
    #[serde(skip)]
    pub name: String,
}

impl WorldInfo {
    pub const DAY_TIME: u8 = 0x01;
}

/// Query interface onto the terrain store.
pub trait World: Send + Sync {
    /// Width in tiles.
    fn width(&self) -> i32;

    /// Height in tiles.
    fn height(&self) -> i32;

    fn spawn(&self) -> TilePoint;

    /// Snapshot sent in reply to a world-data request.
    fn info(&self) -> WorldInfo;

    /// Section stored at `coord`, or `None` if it has not been generated.
    fn section(&self, coord: SectionCoord) -> Option<Arc<Section>>;

    /// Section address of a tile.
    fn section_at(&self, tile: TilePoint) -> SectionCoord {
        SectionCoord::containing(tile)
    }

    /// Number of section columns and rows covering the world.
    fn section_grid(&self) -> (i32, i32) {
        (
            (self.width() + SECTION_WIDTH - 1) / SECTION_WIDTH,
            (self.height() + SECTION_HEIGHT - 1) / SECTION_HEIGHT,
        )
    }

    /// The 3×3 block centred on `center`, row by row, clipped at the world
    /// edges. Entries are `None` where no section is stored.
    fn sections_in_block_around(&self, center: SectionCoord) -> Vec<Option<Arc<Section>>> {
        let (columns, rows) = self.section_grid();
        let mut block = Vec::with_capacity(9);
        for y in center.y - 1..=center.y + 1 {
            for x in center.x - 1..=center.x + 1 {
                if x < 0 || y < 0 || x >= columns || y >= rows {
                    continue;
                }
                block.push(self.section(SectionCoord::new(x, y)));
            }
        }
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Grid {
        sections: HashMap<SectionCoord, Arc<Section>>,
    }

    impl World for Grid {
        fn width(&self) -> i32 {
            SECTION_WIDTH * 4
        }
        fn height(&self) -> i32 {
            SECTION_HEIGHT * 3
        }
        fn spawn(&self) -> TilePoint {
            TilePoint::new(0, 0)
        }
        fn info(&self) -> WorldInfo {
            WorldInfo::default()
        }
        fn section(&self, coord: SectionCoord) -> Option<Arc<Section>> {
            self.sections.get(&coord).cloned()
        }
    }

    fn full_grid() -> Grid {
        let mut sections = HashMap::new();
        for x in 0..4 {
            for y in 0..3 {
                let coord = SectionCoord::new(x, y);
                sections.insert(coord, Arc::new(Section::empty(coord)));
            }
        }
        Grid { sections }
    }

    #[test]
    fn test_section_containing() {
        assert_eq!(
            SectionCoord::containing(TilePoint::new(0, 0)),
            SectionCoord::new(0, 0)
        );
        assert_eq!(
            SectionCoord::containing(TilePoint::new(SECTION_WIDTH, SECTION_HEIGHT - 1)),
            SectionCoord::new(1, 0)
        );
        assert_eq!(
            SectionCoord::new(2, 3).origin(),
            TilePoint::new(2 * SECTION_WIDTH, 3 * SECTION_HEIGHT)
        );
    }

    #[test]
    fn test_block_in_interior() {
        let grid = full_grid();
        let block = grid.sections_in_block_around(SectionCoord::new(1, 1));
        assert_eq!(block.len(), 9);
        assert!(block.iter().all(|s| s.is_some()));
    }

    #[test]
    fn test_block_clipped_at_corner() {
        let grid = full_grid();
        let block = grid.sections_in_block_around(SectionCoord::new(0, 0));
        let coords: Vec<SectionCoord> = block.into_iter().flatten().map(|s| s.coord).collect();
        assert_eq!(
            coords,
            vec![
                SectionCoord::new(0, 0),
                SectionCoord::new(1, 0),
                SectionCoord::new(0, 1),
                SectionCoord::new(1, 1),
            ]
        );
    }

    #[test]
    fn test_block_reports_missing_sections() {
        let mut grid = full_grid();
        grid.sections.remove(&SectionCoord::new(2, 1));
        let block = grid.sections_in_block_around(SectionCoord::new(2, 1));
        assert_eq!(block.len(), 9);
        assert_eq!(block.iter().filter(|s| s.is_none()).count(), 1);
    }

    #[test]
    fn test_section_row_clipping() {
        let coord = SectionCoord::new(0, 0);
        let width = SECTION_WIDTH as usize;
        let section = Section::new(coord, vec![Tile::solid(1); width + 5]);

        assert_eq!(section.row(0).len(), width);
        assert_eq!(section.row(1).len(), 5);
        assert!(section.row(2).is_empty());
        assert!(Section::empty(coord).row(0).is_empty());
    }
}
