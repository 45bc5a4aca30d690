use serde::Deserialize;

/// Top-level configuration settings for the application.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
}

/// Where the WebSocket server binds.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Broker tuning.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    /// Seconds a topic may go without a push before the heartbeat resends it.
    /// Also the heartbeat period.
    pub heartbeat_interval_secs: u64,
}

impl Settings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub heartbeat_interval_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            broker: BrokerSettings {
                heartbeat_interval_secs: 20,
            },
        }
    }
}
