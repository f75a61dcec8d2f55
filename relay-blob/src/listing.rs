use serde::{Deserialize, Serialize};

use crate::{FileManifest, ManifestFilter};

pub const DEFAULT_PAGE_LIMIT: u64 = 10;

/// Listing request as it arrives from a client; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u64>,
    pub page: Option<u64>,
    pub file_id: Option<String>,
    pub file_name: Option<String>,
}

impl ListQuery {
    /// Page size; absent or zero falls back to [`DEFAULT_PAGE_LIMIT`]
    pub fn limit(&self) -> u64 {
        match self.limit {
            Some(limit) if limit > 0 => limit,
            _ => DEFAULT_PAGE_LIMIT,
        }
    }

    /// 1-based page number; absent or zero is page 1
    pub fn page(&self) -> u64 {
        match self.page {
            Some(page) if page > 0 => page,
            _ => 1,
        }
    }

    pub fn skip(&self) -> u64 {
        self.limit().saturating_mul(self.page() - 1)
    }

    pub fn filter(&self) -> ManifestFilter {
        let mut filter = ManifestFilter::new();
        if let Some(id) = self.file_id.as_deref().filter(|s| !s.is_empty()) {
            filter = filter.with_file_id(id);
        }
        if let Some(name) = self.file_name.as_deref().filter(|s| !s.is_empty()) {
            filter = filter.with_file_name(name);
        }
        filter
    }
}

/// One page of manifests plus the paging arithmetic clients render
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestPage {
    pub data: Vec<FileManifest>,
    pub total: u64,
    pub page: u64,
    pub next_page: u64,
    pub limit: u64,
    pub total_page: u64,
}

impl ManifestPage {
    pub fn new(query: &ListQuery, data: Vec<FileManifest>, total: u64) -> Self {
        let limit = query.limit();
        let page = query.page();
        Self {
            data,
            total,
            page,
            next_page: page + 1,
            limit,
            total_page: total.div_ceil(limit),
        }
    }
}
