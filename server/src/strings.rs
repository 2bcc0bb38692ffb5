//! Player-facing text.
//!
//! Disconnect reasons and broadcast lines are looked up by key so a
//! deployment can swap in another language without touching the handlers.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Text {
    UnsupportedClientVersion,
    IncorrectPassword,
    ServerFull,
    HandshakeTimeout,
    ReceivingTileData,
    /// Takes `{name}`.
    PlayerJoined,
    /// Takes `{name}`.
    PlayerLeft,
}

#[derive(Debug, Clone)]
pub struct Strings {
    table: HashMap<Text, String>,
}

impl Strings {
    pub fn english() -> Self {
        let table = [
            (
                Text::UnsupportedClientVersion,
                "You are not using the same version as this server.",
            ),
            (Text::IncorrectPassword, "Incorrect password."),
            (Text::ServerFull, "Server is full."),
            (Text::HandshakeTimeout, "Timed out while connecting."),
            (Text::ReceivingTileData, "Receiving tile data"),
            (Text::PlayerJoined, "{name} has joined."),
            (Text::PlayerLeft, "{name} has left."),
        ]
        .into_iter()
        .map(|(key, text)| (key, text.to_string()))
        .collect();

        Self { table }
    }

    /// Replaces one entry.
    pub fn with(mut self, key: Text, text: impl Into<String>) -> Self {
        self.table.insert(key, text.into());
        self
    }

    pub fn get(&self, key: Text) -> &str {
        self.table.get(&key).map(String::as_str).unwrap_or("")
    }

    /// Looks up a text and fills in its `{name}` placeholder.
    pub fn format(&self, key: Text, name: &str) -> String {
        self.get(key).replace("{name}", name)
    }
}

impl Default for Strings {
    fn default() -> Self {
        Self::english()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let strings = Strings::english();
        assert_eq!(strings.get(Text::IncorrectPassword), "Incorrect password.");
        assert_eq!(strings.format(Text::PlayerJoined, "Andrew"), "Andrew has joined.");
    }

    #[test]
    fn test_override() {
        let strings = Strings::english().with(Text::ServerFull, "Serveur plein.");
        assert_eq!(strings.get(Text::ServerFull), "Serveur plein.");
    }
}
