mod config;

use common::auth::{AuthorizationProvider, RoleAuthorizationProvider};
use common::domain::{CommentRepository, DeviceRepository, DeviceTypeRepository, EventRepository};
use common::memory::InMemoryInventoryStore;
use common::postgres::{
    PostgresClient, PostgresCommentRepository, PostgresDeviceRepository,
    PostgresDeviceTypeRepository, PostgresEventRepository,
};
use common::rest::{CorsConfig, HttpLoggingConfig, HttpServerConfig};
use common::telemetry::{init_telemetry, TelemetryConfig};
use config::ServiceConfig;
use goose::MigrationRunner;
use inventory_api::domain::{DeviceService, DeviceSheetService, DeviceTypeService};
use inventory_api::inventory_api::InventoryApi;
use inventory_api::rest::AppState;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&TelemetryConfig {
        service_name: config.service_name.clone(),
        log_level: config.log_level.clone(),
    }) {
        eprintln!("Failed to initialize telemetry: {}", e);
        std::process::exit(1);
    }

    info!(
        storage_backend = %config.storage_backend,
        "Starting inventory-all-in-one service"
    );
    debug!("Configuration: {:?}", config);

    let repositories = match initialize_repositories(&config).await {
        Ok(repos) => repos,
        Err(e) => {
            error!("Failed to initialize storage: {:#}", e);
            std::process::exit(1);
        }
    };

    let authorization_provider: Arc<dyn AuthorizationProvider> =
        Arc::new(RoleAuthorizationProvider::new());

    let device_service = Arc::new(
        DeviceService::new(
            repositories.device.clone(),
            repositories.event.clone(),
            repositories.comment,
            authorization_provider.clone(),
        )
        .with_recent_events_limit(config.recent_events_limit),
    );
    let device_sheet_service = Arc::new(DeviceSheetService::new(
        repositories.device,
        repositories.event,
        config.import_config(),
    ));
    let device_type_service = Arc::new(DeviceTypeService::new(
        repositories.device_type,
        authorization_provider,
    ));

    let state = AppState {
        device_service,
        device_sheet_service,
        device_type_service,
    };

    let server_config = HttpServerConfig {
        host: config.http_host.clone(),
        port: config.http_port,
        logging_config: HttpLoggingConfig::new(config.ignored_paths()),
        cors_config: CorsConfig::from_comma_separated(&config.cors_allowed_origins),
    };

    let token = CancellationToken::new();
    spawn_signal_handlers(token.clone());

    let api = InventoryApi::new(state, server_config);
    if let Err(e) = api.run(token).await {
        error!("Inventory API exited with error: {:#}", e);
        std::process::exit(1);
    }

    info!("Shutdown complete");
}

struct Repositories {
    device: Arc<dyn DeviceRepository>,
    event: Arc<dyn EventRepository>,
    comment: Arc<dyn CommentRepository>,
    device_type: Arc<dyn DeviceTypeRepository>,
}

async fn initialize_repositories(config: &ServiceConfig) -> anyhow::Result<Repositories> {
    match config.storage_backend.as_str() {
        "postgres" => {
            info!("Initializing PostgreSQL...");
            let postgres_config = config.postgres_config();
            MigrationRunner::postgres(
                &postgres_config.goose_binary_path,
                &postgres_config.migrations_dir,
                &postgres_config.dsn(),
            )
            .run_migrations()
            .await?;

            let client = PostgresClient::from_config(&postgres_config)?;
            client.ping().await?;

            Ok(Repositories {
                device: Arc::new(PostgresDeviceRepository::new(client.clone())),
                event: Arc::new(PostgresEventRepository::new(client.clone())),
                comment: Arc::new(PostgresCommentRepository::new(client.clone())),
                device_type: Arc::new(PostgresDeviceTypeRepository::new(client)),
            })
        }
        "memory" => {
            info!("Using in-memory storage, data is lost on exit");
            let store = Arc::new(InMemoryInventoryStore::new());
            Ok(Repositories {
                device: store.clone(),
                event: store.clone(),
                comment: store.clone(),
                device_type: store,
            })
        }
        other => anyhow::bail!("unknown storage backend '{}'", other),
    }
}

fn spawn_signal_handlers(token: CancellationToken) {
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                ctrl_c_token.cancel();
            }
            Err(err) => {
                error!("Error setting up signal handler: {}", err);
            }
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM signal");
                token.cancel();
            }
            Err(err) => {
                error!("Error setting up SIGTERM handler: {}", err);
            }
        }
    });
}
