use std::sync::Arc;
use tracing::info;

use crate::clients::ElementPayClient;
use crate::config::{Config, UpstreamConfig};
use crate::constants::{DEMO_USER_EMAIL, DEMO_USER_PASSWORD};
use crate::environment::EnvironmentManager;
use crate::services::{TrackerSettings, TransactionTracker};
use crate::store::MockStore;

/// Build a shared HTTP client with reasonable defaults for API calls.
/// This client should be reused across all upstream calls to enable
/// connection pooling and avoid socket exhaustion.
fn build_shared_http_client(upstream: &UpstreamConfig) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(upstream.request_timeout_seconds))
        .user_agent(&upstream.user_agent)
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: MockStore,

    pub environment: EnvironmentManager,

    pub element_pay: Arc<ElementPayClient>,

    pub transactions: TransactionTracker,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = build_shared_http_client(&config.upstream)?;
        let element_pay = Arc::new(ElementPayClient::with_shared_client(
            http_client,
            config.upstream.clone(),
        ));

        let environment = EnvironmentManager::from_config(&config);
        let store = MockStore::new(config.security.clone());

        if config.general.seed_demo_user {
            store
                .seed_verified_user("Demo User", DEMO_USER_EMAIL, DEMO_USER_PASSWORD)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to seed demo user: {e}"))?;
            info!("Seeded demo account {DEMO_USER_EMAIL}");
        }

        let transactions = TransactionTracker::new(
            element_pay.clone(),
            TrackerSettings::from_config(&config.transactions, config.general.event_bus_buffer_size),
        );

        info!(
            environment = %environment.current(),
            sandbox = %config.upstream.sandbox_url,
            live = %config.upstream.live_url,
            "Shared state initialised"
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            environment,
            element_pay,
            transactions,
        })
    }
}
