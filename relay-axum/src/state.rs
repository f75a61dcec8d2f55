use std::sync::Arc;

use relay_blob::RelayAdapter;

#[derive(Clone)]
pub struct RelayState {
    pub relay: Arc<RelayAdapter>,
    /// Overrides the request-derived base of links in upload receipts
    pub public_base_url: Option<Arc<str>>,
}

impl RelayState {
    pub fn new(relay: RelayAdapter) -> Self {
        Self {
            relay: Arc::new(relay),
            public_base_url: None,
        }
    }

    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.public_base_url = (!url.trim().is_empty()).then(|| Arc::from(url));
        self
    }
}
