mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{BrokerSettings, ServerSettings, Settings};

/// Prefix of the environment variables read by `load_config`, e.g.
/// `BEATSUB_SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "BEATSUB";

/// Loads `config/default.*` (optional) and `BEATSUB_*` environment variables
/// and merges them over `Settings::default()`.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from("config/default")
}

pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;
    Ok(merge(partial, Settings::default()))
}

fn merge(partial: PartialSettings, default: Settings) -> Settings {
    Settings {
        server: ServerSettings {
            host: partial
                .server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: partial
                .server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
        },
        broker: BrokerSettings {
            heartbeat_interval_secs: partial
                .broker
                .as_ref()
                .and_then(|b| b.heartbeat_interval_secs)
                .unwrap_or(default.broker.heartbeat_interval_secs),
        },
    }
}

#[cfg(test)]
mod tests;
