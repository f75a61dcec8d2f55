use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use relay_blob::RelayAdapter;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::{routes, RelayState};

#[derive(Clone)]
pub struct RelayApp {
    pub relay: Arc<RelayAdapter>,
    pub router: Router<()>,
}

impl RelayApp {
    pub fn new(relay: RelayAdapter) -> Self {
        Self::from_state(RelayState::new(relay))
    }

    /// Links in upload receipts are built on `url` instead of request headers
    pub fn with_public_base_url(relay: RelayAdapter, url: impl Into<String>) -> Self {
        Self::from_state(RelayState::new(relay).with_public_base_url(url))
    }

    pub fn from_state(state: RelayState) -> Self {
        let relay = Arc::clone(&state.relay);
        let router = routes::router(state).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                // Uploads are streamed and bounded by RelayConfig::max_file_bytes.
                .layer(DefaultBodyLimit::disable()),
        );
        Self { relay, router }
    }

    pub fn use_router(mut self, path: &str, router: Router<()>) -> Self {
        self.router = self.router.nest(path, router);
        self
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}
