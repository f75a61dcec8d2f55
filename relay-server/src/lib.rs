pub mod config;

use std::sync::Arc;

use anyhow::Result;
use relay_axum::{RelayApp, RelayState};
use relay_blob::{
    FsManifestStore, HttpPartClient, ManifestStore, MemoryManifestStore, MemoryPartStore,
    PartBlobClient, RelayAdapter, S3PartClient,
};
use tracing::info;

pub use config::{ManifestBackend, PartBackend, ServerConfig};

/// Wire the configured collaborators into an HTTP app
pub async fn build(config: &ServerConfig) -> Result<RelayApp> {
    let parts: Arc<dyn PartBlobClient> = match &config.parts {
        PartBackend::Memory => {
            info!("parts kept in memory");
            Arc::new(MemoryPartStore::new())
        }
        PartBackend::Http(http) => {
            info!(upload_url = %http.upload_url, "parts sent to HTTP host");
            Arc::new(HttpPartClient::new(http.clone()))
        }
        PartBackend::S3(s3) => {
            info!(bucket = %s3.bucket, endpoint = %s3.endpoint_url, "parts sent to S3 bucket");
            Arc::new(S3PartClient::connect(s3.clone()).await)
        }
    };

    let manifests: Arc<dyn ManifestStore> = match &config.manifests {
        ManifestBackend::Memory => {
            info!("manifests kept in memory");
            Arc::new(MemoryManifestStore::new())
        }
        ManifestBackend::Fs(dir) => {
            info!(dir = %dir.display(), "manifests stored on disk");
            Arc::new(FsManifestStore::open(dir).await?)
        }
    };

    let relay = RelayAdapter::from_shared(parts, manifests, config.relay.clone());
    let mut state = RelayState::new(relay);
    if let Some(url) = &config.public_base_url {
        state = state.with_public_base_url(url.clone());
    }

    Ok(RelayApp::from_state(state))
}
