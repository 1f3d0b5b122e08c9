use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};
use wbbot_core::config::{AppConfig, ConfigError, LoadOptions};
use wbbot_core::errors::BackendError;
use wbbot_core::SystemClock;
use wbbot_db::{connect_with_settings, migrations, DbPool, SqlStandupRegistry};
use wbbot_slack::socket::{ReconnectPolicy, SocketTransport, TransportError};
use wbbot_slack::{
    whiteboard_dispatcher, ChatError, NoopSocketTransport, SlackSocketTransport, SlackWebClient,
    SocketModeRunner, TextNormalizer, WhiteboardDeps, WhiteboardService,
};

use crate::whiteboard_api::HttpWhiteboardClient;

const SLACK_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub slack_runner: SocketModeRunner,
    pub transport_mode: &'static str,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("slack client setup failed: {0}")]
    Chat(#[from] ChatError),
    #[error("slack transport setup failed: {0}")]
    Transport(#[from] TransportError),
    #[error("whiteboard client setup failed: {0}")]
    Backend(#[from] BackendError),
    #[error("invalid mention pattern: {0}")]
    Normalizer(#[from] regex::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let backend_timeout = Duration::from_secs(config.whiteboard.timeout_secs);
    let deps = WhiteboardDeps {
        chat: Arc::new(SlackWebClient::new(
            &config.slack.api_base,
            config.slack.bot_token.clone(),
            SLACK_REQUEST_TIMEOUT,
        )?),
        whiteboard: Arc::new(HttpWhiteboardClient::new(
            &config.whiteboard.host_url,
            backend_timeout,
        )?),
        registry: Arc::new(SqlStandupRegistry::new(db_pool.clone())),
        clock: Arc::new(SystemClock),
        backend_timeout,
    };
    let service = Arc::new(WhiteboardService::new(deps, TextNormalizer::new()?));

    let (transport, transport_mode): (Arc<dyn SocketTransport>, &'static str) =
        match &config.slack.app_token {
            Some(app_token) => (
                Arc::new(SlackSocketTransport::new(
                    &config.slack.api_base,
                    app_token.clone(),
                    SLACK_REQUEST_TIMEOUT,
                )?),
                "socket",
            ),
            None => {
                warn!(
                    event_name = "system.bootstrap.no_app_token",
                    correlation_id = "bootstrap",
                    "slack.app_token not set; the bot will not receive events"
                );
                (Arc::new(NoopSocketTransport), "noop")
            }
        };
    let slack_runner = SocketModeRunner::new(
        transport,
        Arc::new(whiteboard_dispatcher(service)),
        ReconnectPolicy::default(),
    );

    Ok(Application { config, db_pool, slack_runner, transport_mode })
}
