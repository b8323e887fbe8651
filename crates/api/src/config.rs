//! Runtime Configuration

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// SQLite database file; created if missing
    pub path: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// Built-in defaults, then an optional `config/default.*` file, then
    /// `ENVMON__`-prefixed environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080_i64)?
            .set_default("database.path", "data/telemetry.db")?
            .set_default("database.max_connections", 5_i64)?
            .set_default("logging.level", "info")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(Environment::with_prefix("ENVMON").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_load() {
        let settings = Settings::load().unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.database.max_connections, 5);
        assert_eq!(settings.logging.level, "info");
    }
}
