use crate::error::ConfigError;
use std::time::Duration;

/// Largest world width or height; both travel as `i16` in the world data.
pub const MAX_WORLD_DIMENSION: i32 = i16::MAX as i32;

/// Runtime settings, filled from the command line in `main`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Empty means no password is asked for.
    pub password: String,
    pub max_clients: usize,
    /// Time allowed to get from accept to an authenticated session.
    pub handshake_timeout: Option<Duration>,
    pub world_width: i32,
    pub world_height: i32,
    pub world_seed: u64,
    pub world_name: String,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn requires_password(&self) -> bool {
        !self.password.is_empty()
    }

    /// Rejects world sizes the world-data message cannot carry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (axis, value) in [("width", self.world_width), ("height", self.world_height)] {
            if !(1..=MAX_WORLD_DIMENSION).contains(&value) {
                return Err(ConfigError::WorldDimension {
                    axis,
                    value,
                    max: MAX_WORLD_DIMENSION,
                });
            }
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7777,
            password: String::new(),
            max_clients: 16,
            handshake_timeout: Some(Duration::from_secs(30)),
            world_width: 4200,
            world_height: 1200,
            world_seed: 0,
            world_name: "World".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.address(), "127.0.0.1:7777");
        assert!(!config.requires_password());
        assert_eq!(config.max_clients, 16);
    }

    #[test]
    fn test_password_required() {
        let config = ServerConfig {
            password: "hunter2".to_string(),
            ..ServerConfig::default()
        };
        assert!(config.requires_password());
    }

    #[test]
    fn test_world_size_limits() {
        assert_eq!(ServerConfig::default().validate(), Ok(()));

        let config = ServerConfig {
            world_height: -5,
            ..ServerConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::WorldDimension {
                axis: "height",
                value: -5,
                max: MAX_WORLD_DIMENSION
            })
        );

        let config = ServerConfig {
            world_width: 40_000,
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WorldDimension { axis: "width", .. })
        ));

        let config = ServerConfig {
            world_width: MAX_WORLD_DIMENSION,
            world_height: 1,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
