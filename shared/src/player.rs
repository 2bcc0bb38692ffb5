use serde::{Deserialize, Serialize};

/// 24-bit RGB colour as sent on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Appearance block of the player-info message, in wire order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appearance {
    pub hair_dye: u8,
    pub hide_visuals: u8,
    pub hide_visuals2: u8,
    pub hide_misc: u8,
    pub hair_color: Color,
    pub skin_color: Color,
    pub eye_color: Color,
    pub shirt_color: Color,
    pub under_shirt_color: Color,
    pub pants_color: Color,
    pub shoe_color: Color,
    pub difficulty: u8,
}

/// Character a client attaches to its session during the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub skin_variant: u8,
    pub hair: u8,
    pub appearance: Appearance,
    pub life: i16,
    pub life_max: i16,
    pub mana: i16,
    pub mana_max: i16,
    pub spawn: (i32, i32),
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            skin_variant: 0,
            hair: 0,
            appearance: Appearance::default(),
            life: 0,
            life_max: 0,
            mana: 0,
            mana_max: 0,
            spawn: (-1, -1),
        }
    }

    /// True once the client has reported where it wants to spawn.
    pub fn has_spawn(&self) -> bool {
        self.spawn != (-1, -1)
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new("")
    }
}
