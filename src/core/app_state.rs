use std::time::Duration;

use anyhow::{Context, Result};

use crate::core::config::AppConfig;
use crate::core::db::{self, Pool};
use crate::hub::NotificationHub;
use crate::payment::PaymentGateway;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: Pool,
    pub http_client: reqwest::Client,
    pub payment: PaymentGateway,
    pub hub: NotificationHub,
}

impl AppState {
    pub async fn init(config: &AppConfig) -> Result<Self> {
        let db_pool = db::create_pool(&config.database.url).await?;
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        let payment = PaymentGateway::from_env()?;
        let hub = NotificationHub::new();

        Ok(Self {
            db_pool,
            http_client,
            payment,
            hub,
        })
    }
}
