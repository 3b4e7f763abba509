use std::sync::Arc;

use tracing::info;

use astrosetu_bedrock::converse::BedrockReportGenerator;
use astrosetu_storage::memory::MemoryReportStore;
use astrosetu_storage::s3::S3ReportStore;
use astrosetu_storage::store::ReportStore;
use astrosetu_worker::worker::ReportWorker;

use crate::config::{ConfigError, DispatchMode, ServiceConfig, StoreBackend};

/// Shared application state, injected into all route handlers via Axum state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReportStore>,
    pub worker: Arc<ReportWorker>,
    pub dispatch: DispatchMode,
}

impl AppState {
    pub fn new(worker: ReportWorker, dispatch: DispatchMode) -> Self {
        Self {
            store: Arc::clone(worker.store()),
            worker: Arc::new(worker),
            dispatch,
        }
    }

    /// Wire the configured store and the Bedrock generator.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self, ConfigError> {
        let store: Arc<dyn ReportStore> = match config.store {
            StoreBackend::Memory => Arc::new(MemoryReportStore::new()),
            StoreBackend::S3 => {
                let bucket = config
                    .bucket
                    .clone()
                    .ok_or(ConfigError::Missing("ASTROSETU_BUCKET"))?;
                let client = astrosetu_storage::client::build_client(config.region.clone()).await;
                Arc::new(S3ReportStore::new(client, bucket))
            }
        };

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;
        let generator = BedrockReportGenerator::from_config(&sdk_config, config.model_id.clone());

        info!(
            store = ?config.store,
            dispatch = %config.dispatch,
            model = %config.model_id,
            "service configured"
        );

        let worker = ReportWorker::new(store, Arc::new(generator))
            .with_config(config.worker_config());
        Ok(Self::new(worker, config.dispatch))
    }
}
