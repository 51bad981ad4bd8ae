use crate::rest::{build_inventory_routes, AppState};
use common::rest::{run_http_server, HttpServerConfig};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct InventoryApi {
    state: AppState,
    config: HttpServerConfig,
}

impl InventoryApi {
    pub fn new(state: AppState, config: HttpServerConfig) -> Self {
        debug!("Initializing inventory API module");
        Self { state, config }
    }

    /// Serve the API until the token is cancelled
    pub async fn run(self, cancellation_token: CancellationToken) -> anyhow::Result<()> {
        let router = build_inventory_routes(self.state);
        run_http_server(self.config, router, cancellation_token).await
    }
}
