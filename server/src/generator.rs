//! Seeded demo terrain.
//!
//! Stands in for a real world store: a random-walk surface line with grass
//! on top, dirt below it and stone under the rock layer. The same seed always
//! gives the same world.

use crate::config::MAX_WORLD_DIMENSION;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    Section, SectionCoord, Tile, TilePoint, World, WorldInfo, SECTION_HEIGHT, SECTION_WIDTH,
};
use std::collections::HashMap;
use std::sync::Arc;

pub const DIRT: u16 = 0;
pub const STONE: u16 = 1;
pub const GRASS: u16 = 2;

/// How far the surface may wander above or below its starting level.
const SURFACE_VARIATION: i32 = 40;

pub struct GeneratedWorld {
    info: WorldInfo,
    width: i32,
    height: i32,
    spawn: TilePoint,
    sections: HashMap<SectionCoord, Arc<Section>>,
}

impl GeneratedWorld {
    /// Builds a world of `width` by `height` tiles. Both are clamped to
    /// `1..=MAX_WORLD_DIMENSION`.
    pub fn generate(width: i32, height: i32, seed: u64, name: &str) -> Self {
        let width = width.clamp(1, MAX_WORLD_DIMENSION);
        let height = height.clamp(1, MAX_WORLD_DIMENSION);
        let mut rng = StdRng::seed_from_u64(seed);
        let surface_base = height / 3;
        let rock_layer = surface_base + height / 6;

        let low = (surface_base - SURFACE_VARIATION).max(0);
        let high = (surface_base + SURFACE_VARIATION).min((height - 1).max(0));
        let mut level = surface_base;
        let surface: Vec<i32> = (0..width)
            .map(|_| {
                level = (level + rng.gen_range(-1..=1)).clamp(low, high);
                level
            })
            .collect();

        let spawn_x = width / 2;
        let spawn_y = surface
            .get(spawn_x as usize)
            .copied()
            .unwrap_or(surface_base)
            - 1;
        let spawn = TilePoint::new(spawn_x, spawn_y.max(0));

        let columns = (width + SECTION_WIDTH - 1) / SECTION_WIDTH;
        let rows = (height + SECTION_HEIGHT - 1) / SECTION_HEIGHT;
        let mut sections = HashMap::new();
        for sy in 0..rows {
            for sx in 0..columns {
                let coord = SectionCoord::new(sx, sy);
                let origin = coord.origin();
                let mut tiles = Vec::with_capacity((SECTION_WIDTH * SECTION_HEIGHT) as usize);
                for y in origin.y..origin.y + SECTION_HEIGHT {
                    for x in origin.x..origin.x + SECTION_WIDTH {
                        tiles.push(tile_at(x, y, &surface, height, rock_layer));
                    }
                }
                sections.insert(coord, Arc::new(Section::new(coord, tiles)));
            }
        }

        info!(
            "Generated world '{}' ({}x{}, {} sections), spawn at ({}, {})",
            name,
            width,
            height,
            sections.len(),
            spawn.x,
            spawn.y
        );

        let info = WorldInfo {
            time: 13500,
            flags: WorldInfo::DAY_TIME,
            moon_phase: 0,
            width: width as i16,
            height: height as i16,
            spawn_x: spawn.x as i16,
            spawn_y: spawn.y as i16,
            surface: surface_base as i16,
            rock_layer: rock_layer as i16,
            world_id: rng.gen_range(0..=i32::MAX),
            name: name.to_string(),
        };

        Self {
            info,
            width,
            height,
            spawn,
            sections,
        }
    }

    /// Drops a section so lookups treat it as not yet generated.
    pub fn unload(&mut self, coord: SectionCoord) -> Option<Arc<Section>> {
        self.sections.remove(&coord)
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }
}

fn tile_at(x: i32, y: i32, surface: &[i32], height: i32, rock_layer: i32) -> Tile {
    let Some(&top) = surface.get(x as usize) else {
        return Tile::air();
    };
    if y >= height || y < top {
        Tile::air()
    } else if y == top {
        Tile::solid(GRASS)
    } else if y < rock_layer.max(top + 8) {
        Tile::solid(DIRT)
    } else {
        Tile::solid(STONE)
    }
}

impl World for GeneratedWorld {
    fn width(&self) -> i32 {
        self.width
    }

    fn height(&self) -> i32 {
        self.height
    }

    fn spawn(&self) -> TilePoint {
        self.spawn
    }

    fn info(&self) -> WorldInfo {
        self.info.clone()
    }

    fn section(&self, coord: SectionCoord) -> Option<Arc<Section>> {
        self.sections.get(&coord).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_grid_covers_world() {
        let world = GeneratedWorld::generate(1000, 600, 7, "test");
        assert_eq!(world.section_grid(), (5, 4));
        assert_eq!(world.section_count(), 20);

        let section = world.section(SectionCoord::new(4, 3)).unwrap();
        assert_eq!(section.tiles.len(), (SECTION_WIDTH * SECTION_HEIGHT) as usize);
    }

    #[test]
    fn test_same_seed_same_world() {
        let a = GeneratedWorld::generate(400, 300, 42, "a");
        let b = GeneratedWorld::generate(400, 300, 42, "b");
        let coord = SectionCoord::new(1, 0);

        assert_eq!(a.spawn(), b.spawn());
        assert_eq!(a.section(coord), b.section(coord));
    }

    #[test]
    fn test_spawn_sits_on_surface() {
        let world = GeneratedWorld::generate(800, 600, 3, "test");
        let spawn = world.spawn();
        let section = world.section(world.section_at(spawn)).unwrap();
        let origin = section.coord.origin();

        let row = section.row((spawn.y - origin.y) as usize);
        let tile = row[(spawn.x - origin.x) as usize];
        assert!(!tile.is_active());

        let below = world
            .section(world.section_at(TilePoint::new(spawn.x, spawn.y + 1)))
            .unwrap();
        let below_origin = below.coord.origin();
        let row = below.row((spawn.y + 1 - below_origin.y) as usize);
        let tile = row[(spawn.x - below_origin.x) as usize];
        assert_eq!(tile, Tile::solid(GRASS));
    }

    #[test]
    fn test_world_info() {
        let world = GeneratedWorld::generate(4200, 1200, 1, "Rust Valley");
        let info = world.info();
        assert_eq!(info.width, 4200);
        assert_eq!(info.height, 1200);
        assert_eq!(info.name, "Rust Valley");
        assert_eq!(info.spawn_x as i32, world.spawn().x);
        assert!(info.world_id >= 0);
        assert_eq!(
            info.world_id,
            GeneratedWorld::generate(4200, 1200, 1, "other").info().world_id
        );
    }

    #[test]
    fn test_out_of_range_size_is_clamped() {
        let world = GeneratedWorld::generate(40_000, -5, u64::MAX, "test");
        let info = world.info();
        assert_eq!(world.width(), MAX_WORLD_DIMENSION);
        assert_eq!(world.height(), 1);
        assert_eq!(info.width as i32, MAX_WORLD_DIMENSION);
        assert_eq!(info.height, 1);
        assert!(info.world_id >= 0);
    }

    #[test]
    fn test_unload() {
        let mut world = GeneratedWorld::generate(400, 300, 1, "test");
        let coord = SectionCoord::new(0, 0);
        assert!(world.unload(coord).is_some());
        assert!(world.section(coord).is_none());
    }
}
