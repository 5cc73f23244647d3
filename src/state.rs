use std::sync::Arc;

use aws_sdk_s3::Client;
use sqlx::PgPool;
use tokio::sync::OnceCell;

use super::{config::Config, database::init_postgres, storage::init_s3};

pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub s3: Client,
    /// Set once the proof bucket is known to exist and be public. Process
    /// lifetime, reset only on restart.
    pub bucket_ready: OnceCell<()>,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let pool = init_postgres(&config.database_url).await;
        let s3 = init_s3().await;

        Arc::new(Self {
            config,
            pool,
            s3,
            bucket_ready: OnceCell::new(),
        })
    }
}
