use axum::http::{header, HeaderMap};
use relay_blob::{ByteRange, ListQuery};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadParams {
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadParams {
    pub download: Option<String>,
}

impl DownloadParams {
    /// `download` counts when it is a non-zero number (`?download=1`)
    pub fn wants_attachment(&self) -> bool {
        self.download
            .as_deref()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .is_some_and(|v| v != 0.0 && !v.is_nan())
    }
}

/// Listing query as raw strings; junk numbers fall back to the defaults
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub page: Option<String>,
    pub file_id: Option<String>,
    pub file_name: Option<String>,
}

impl From<ListParams> for ListQuery {
    fn from(params: ListParams) -> Self {
        fn number(raw: Option<String>) -> Option<u64> {
            raw.and_then(|v| v.trim().parse().ok())
        }
        ListQuery {
            limit: number(params.limit),
            page: number(params.page),
            file_id: params.file_id,
            file_name: params.file_name,
        }
    }
}

/// Requested range, if the header holds one we can serve
pub fn requested_range(headers: &HeaderMap) -> Option<ByteRange> {
    headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(ByteRange::parse_header)
}

/// Scheme and authority that links in receipts are built on.
///
/// A configured public URL wins, then the `Origin` header, then the `Host`
/// header over plain http. With none of them links stay relative.
pub fn base_url(configured: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(url) = configured {
        return url.trim_end_matches('/').to_string();
    }
    let header_str = |name| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != "null")
    };
    if let Some(origin) = header_str(header::ORIGIN) {
        return origin.trim_end_matches('/').to_string();
    }
    if let Some(host) = header_str(header::HOST) {
        return format!("http://{host}");
    }
    String::new()
}
