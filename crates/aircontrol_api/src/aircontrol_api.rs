use crate::http::{run_http_server, AircontrolApiServices, HttpServerConfig};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct AircontrolApi {
    services: AircontrolApiServices,
    config: HttpServerConfig,
}

impl AircontrolApi {
    pub fn new(services: AircontrolApiServices, config: HttpServerConfig) -> Self {
        debug!("Initializing air controller API module");
        Self { services, config }
    }

    /// Serve until `cancellation_token` is cancelled
    pub async fn run(self, cancellation_token: CancellationToken) -> anyhow::Result<()> {
        run_http_server(self.config, self.services, cancellation_token).await
    }
}
