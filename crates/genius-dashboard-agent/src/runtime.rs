//! Agent runtime orchestration.

use crate::boards::BoardStore;
use crate::config::DashboardConfig;
use crate::console::{parse_command, Console};
use crate::persistence::SqliteStore;
use crate::watch::spawn_watches;
use anyhow::{Context, Result};
use genius_dashboard_core::{OptimisticWriter, Publisher, TopicRegistry};
use genius_dashboard_transport_mqtt::{MqttTransport, MqttTransportConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// The headless dashboard.
pub struct Dashboard {
    config: DashboardConfig,
    store: SqliteStore,
    boards: BoardStore,
    registry: TopicRegistry,
    watches: Vec<JoinHandle<()>>,
}

impl Dashboard {
    /// Open the board store and prepare an empty registry.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be opened or its contents cannot be
    /// loaded.
    pub fn new(config: DashboardConfig) -> Result<Self> {
        let store = if config.persistence.store_type == "sqlite" {
            SqliteStore::open(&config.persistence.db_path).with_context(|| {
                format!(
                    "Failed to open SQLite database {}",
                    config.persistence.db_path.display()
                )
            })?
        } else {
            SqliteStore::in_memory().context("Failed to create in-memory store")?
        };

        let mut boards = store
            .load()
            .context("Failed to load board store")?
            .unwrap_or_default();
        if let Some(board) = &config.current_board {
            boards.set_current_board(board.clone());
        }

        tracing::info!(
            boards = boards.boards.len(),
            current_board = %boards.current_board,
            "Board store loaded"
        );

        Ok(Self {
            config,
            store,
            boards,
            registry: TopicRegistry::new(),
            watches: Vec::new(),
        })
    }

    /// The loaded boards.
    #[must_use]
    pub fn boards(&self) -> &BoardStore {
        &self.boards
    }

    /// The topic registry fed by the transport.
    #[must_use]
    pub fn registry(&self) -> &TopicRegistry {
        &self.registry
    }

    /// Run until Ctrl+C or until the transport stops.
    ///
    /// # Errors
    ///
    /// Returns error if the transport cannot be set up or the boards cannot
    /// be saved on exit.
    pub async fn run(mut self) -> Result<()> {
        tracing::info!("Starting dashboard runtime");

        let client_id = self.config.client_id.unwrap_or_else(Uuid::new_v4);
        let transport = MqttTransport::new(MqttTransportConfig {
            mqtt_broker: self.config.broker_url(),
            client_id: format!("genius-dashboard-{client_id}"),
            scheme: self.config.topic_scheme(),
            ..MqttTransportConfig::default()
        })
        .context("Failed to create MQTT transport")?;
        transport
            .subscribe()
            .await
            .context("Failed to subscribe to bridge topics")?;

        let console = Console::new(OptimisticWriter::new(
            self.registry.clone(),
            transport.publisher(),
        ));
        let mut events = transport.start();
        self.restart_watches();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;

        tracing::info!(broker = %self.config.broker_url(), "Dashboard running, press Ctrl+C to stop");

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        tracing::warn!("Transport stopped");
                        break;
                    };
                    self.registry.apply(event);
                }

                line = lines.next_line(), if stdin_open => {
                    match line {
                        Ok(Some(line)) => self.handle_line(&console, &line).await,
                        Ok(None) => {
                            tracing::debug!("Console input closed");
                            stdin_open = false;
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "Failed to read console input");
                            stdin_open = false;
                        }
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }

        for watch in self.watches.drain(..) {
            watch.abort();
        }
        self.store
            .save(&self.boards)
            .context("Failed to save board store")?;

        tracing::info!("Dashboard stopped");
        Ok(())
    }

    async fn handle_line<P: Publisher>(&mut self, console: &Console<P>, line: &str) {
        if line.trim().is_empty() {
            return;
        }

        let reply = match parse_command(line) {
            Ok(command) => console.execute(command, &mut self.boards).await,
            Err(err) => Err(err),
        };

        match reply {
            Ok(reply) => {
                println!("{}", reply.text);
                if reply.boards_changed {
                    if let Err(err) = self.store.save(&self.boards) {
                        tracing::warn!(error = %err, "Failed to save board store");
                    }
                    self.restart_watches();
                }
            }
            Err(err) => {
                tracing::debug!(line, error = %err, "Console command failed");
                println!("error: {err}");
            }
        }
    }

    fn restart_watches(&mut self) {
        for watch in self.watches.drain(..) {
            watch.abort();
        }
        if let Some(board) = self.boards.current() {
            self.watches = spawn_watches(board, &self.registry);
            tracing::info!(board = %board.name, widgets = self.watches.len(), "Watching board");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> DashboardConfig {
        let mut config = DashboardConfig::default();
        config.persistence.store_type = "memory".to_string();
        config
    }

    #[test]
    fn new_dashboard_starts_empty() {
        let dashboard = Dashboard::new(memory_config()).unwrap();
        assert!(dashboard.boards().boards.is_empty());
        assert!(dashboard.registry().snapshot().values.is_empty());
    }

    #[test]
    fn board_override_is_applied() {
        let mut config = memory_config();
        config.current_board = Some("Practice".to_string());

        let dashboard = Dashboard::new(config).unwrap();
        assert_eq!(dashboard.boards().current_board, "Practice");
    }

    #[tokio::test]
    async fn console_lines_edit_and_watch_boards() {
        let mut dashboard = Dashboard::new(memory_config()).unwrap();
        let console = Console::new(OptimisticWriter::new(
            dashboard.registry.clone(),
            MqttTransport::new(MqttTransportConfig::default())
                .unwrap()
                .publisher(),
        ));

        dashboard.handle_line(&console, "board Teleop").await;
        dashboard
            .handle_line(&console, "add simple speed data=/SmartDashboard/speed")
            .await;
        dashboard.handle_line(&console, "   ").await;
        dashboard.handle_line(&console, "bogus").await;

        assert_eq!(dashboard.boards().current().unwrap().widgets.len(), 1);
        assert_eq!(dashboard.watches.len(), 1);
        assert_eq!(dashboard.store.load().unwrap().unwrap(), dashboard.boards);
    }
}
