//! Agent configuration.

use anyhow::{Context, Result};
use genius_dashboard_proto::{ServerAddr, TopicScheme};
use std::path::PathBuf;
use uuid::Uuid;

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Team number of the robot
    pub team: u32,

    /// Where to connect: `real`, `sim` or a host
    pub server: ServerAddr,

    /// Client identifier, generated when absent
    pub client_id: Option<Uuid>,

    /// Bridge configuration
    pub bridge: BridgeConfig,

    /// Persistence configuration
    pub persistence: PersistenceConfig,

    /// Board to show instead of the stored current board
    pub current_board: Option<String>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// MQTT broker port on the server host
    pub broker_port: u16,

    /// Topic prefix of the bridge
    pub prefix: String,
}

/// Persistence configuration.
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Persistence type: "sqlite" or "memory"
    pub store_type: String,

    /// Database path (for `SQLite`)
    pub db_path: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for daily log files; logs go to stdout only when unset
    pub log_dir: Option<PathBuf>,

    /// Days of log files to keep
    pub retention_days: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            team: 0,
            server: ServerAddr::Custom(String::new()),
            client_id: None,
            bridge: BridgeConfig {
                broker_port: 1883,
                prefix: genius_dashboard_proto::topics::DEFAULT_PREFIX.to_string(),
            },
            persistence: PersistenceConfig {
                store_type: "sqlite".to_string(),
                db_path: PathBuf::from("./genius-dashboard.db"),
            },
            current_board: None,
            logging: LoggingConfig {
                log_dir: None,
                retention_days: 7,
            },
        }
    }
}

impl DashboardConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `GENIUS_TEAM`: Team number
    /// - `GENIUS_SERVER_ADDR`: "real", "sim" or a host
    /// - `GENIUS_BROKER_PORT`: MQTT broker port
    /// - `GENIUS_CLIENT_ID`: Client UUID
    /// - `GENIUS_PREFIX`: Bridge topic prefix
    /// - `GENIUS_STORE_TYPE`: "sqlite" or "memory"
    /// - `GENIUS_DB_PATH`: `SQLite` database path
    /// - `GENIUS_BOARD`: Board to show
    /// - `GENIUS_LOG_DIR`: Directory for daily log files
    /// - `GENIUS_LOG_RETENTION_DAYS`: Days of log files to keep
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    ///
    /// # Errors
    ///
    /// Returns error if a value is present but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(team) = lookup("GENIUS_TEAM") {
            config.team = team.trim().parse().context("Invalid GENIUS_TEAM")?;
        }

        if let Some(addr) = lookup("GENIUS_SERVER_ADDR") {
            config.server = addr.trim().parse().context("Invalid GENIUS_SERVER_ADDR")?;
        }

        if let Some(port) = lookup("GENIUS_BROKER_PORT") {
            config.bridge.broker_port = port.trim().parse().context("Invalid GENIUS_BROKER_PORT")?;
        }

        if let Some(id) = lookup("GENIUS_CLIENT_ID") {
            config.client_id = Some(Uuid::parse_str(id.trim()).context("Invalid GENIUS_CLIENT_ID")?);
        }

        if let Some(prefix) = lookup("GENIUS_PREFIX") {
            config.bridge.prefix = prefix;
        }

        if let Some(store_type) = lookup("GENIUS_STORE_TYPE") {
            config.persistence.store_type = store_type;
        }

        if let Some(db_path) = lookup("GENIUS_DB_PATH") {
            config.persistence.db_path = PathBuf::from(db_path);
        }

        if let Some(board) = lookup("GENIUS_BOARD") {
            config.current_board = Some(board);
        }

        if let Some(dir) = lookup("GENIUS_LOG_DIR") {
            config.logging.log_dir = Some(PathBuf::from(dir));
        }

        if let Some(days) = lookup("GENIUS_LOG_RETENTION_DAYS") {
            config.logging.retention_days = days
                .trim()
                .parse()
                .context("Invalid GENIUS_LOG_RETENTION_DAYS")?;
        }

        Ok(config)
    }

    /// Check that the agent can connect with this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FirstRun`] when neither team nor address is
    /// set, and another [`ConfigError`] when only one of them is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let no_address = self.server.is_empty();
        if self.team == 0 && no_address {
            return Err(ConfigError::FirstRun);
        }
        if self.team == 0 {
            return Err(ConfigError::InvalidTeam);
        }
        if no_address {
            return Err(ConfigError::MissingAddress);
        }
        if !matches!(self.persistence.store_type.as_str(), "sqlite" | "memory") {
            return Err(ConfigError::UnknownStoreType(
                self.persistence.store_type.clone(),
            ));
        }
        Ok(())
    }

    /// Host of the bridge broker.
    #[must_use]
    pub fn server_host(&self) -> String {
        self.server.host(self.team)
    }

    /// Broker URL of the bridge.
    #[must_use]
    pub fn broker_url(&self) -> String {
        format!("tcp://{}:{}", self.server_host(), self.bridge.broker_port)
    }

    /// Topic scheme of the bridge.
    #[must_use]
    pub fn topic_scheme(&self) -> TopicScheme {
        TopicScheme::new(self.team).with_prefix(self.bridge.prefix.clone())
    }
}

/// Configuration that cannot be used to connect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Nothing configured yet
    #[error("no team number or server address configured; set GENIUS_TEAM and GENIUS_SERVER_ADDR")]
    FirstRun,
    /// Team number must be positive
    #[error("team number must be positive; set GENIUS_TEAM")]
    InvalidTeam,
    /// Server address is empty
    #[error("server address is empty; set GENIUS_SERVER_ADDR to real, sim or a host")]
    MissingAddress,
    /// Unknown persistence type
    #[error("unknown store type {0:?}; expected sqlite or memory")]
    UnknownStoreType(String),
}
