use std::collections::HashMap;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::TryStreamExt;
use relay_blob::{ByteStream, ListQuery, RelayError, UploadReceipt};
use serde_json::{json, Value};
use tracing::error;

use crate::{
    params::{base_url, requested_range, DownloadParams, ListParams, UploadParams},
    RelayAxumError, RelayState,
};

pub const FILES_PATH: &str = "/api/v1/files";

pub fn router(state: RelayState) -> Router<()> {
    Router::new()
        .route(FILES_PATH, get(list_files).post(upload_file))
        .route("/v1/file/{id}", get(download_file))
        .route("/v1/file/{id}/{*name}", get(download_file))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

fn body_stream(body: Body) -> ByteStream {
    Box::pin(body.into_data_stream().map_err(std::io::Error::other))
}

async fn upload_file(
    State(state): State<RelayState>,
    headers: HeaderMap,
    Query(params): Query<UploadParams>,
    body: Body,
) -> Result<Json<Value>, RelayAxumError> {
    let file_name = params
        .file_name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| RelayError::invalid("fileName is required"))?;

    let manifest = state
        .relay
        .put(&file_name, body_stream(body))
        .await
        .map_err(RelayAxumError::upload)?;

    let base = base_url(state.public_base_url.as_deref(), &headers);
    let receipt = UploadReceipt::new(&manifest, &base);

    Ok(Json(json!({
        "code": 200,
        "message": "Success",
        "data": receipt,
    })))
}

async fn download_file(
    State(state): State<RelayState>,
    Path(path): Path<HashMap<String, String>>,
    Query(params): Query<DownloadParams>,
    headers: HeaderMap,
) -> Result<Response, RelayAxumError> {
    let file_id = path.get("id").map(String::as_str).unwrap_or_default();
    let opened = state.relay.open(file_id, requested_range(&headers)).await?;

    let mut out = HeaderMap::new();
    let mime = mime_guess::from_path(&opened.manifest.file_name).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        out.insert(header::CONTENT_TYPE, value);
    }
    out.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    out.insert(header::CONTENT_LENGTH, HeaderValue::from(opened.content_length()));

    let status = if opened.range.partial {
        if let Ok(value) = HeaderValue::from_str(&opened.range.content_range()) {
            out.insert(header::CONTENT_RANGE, value);
        }
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    if params.wants_attachment() {
        let disposition = format!("attachment; filename=\"{}\"", opened.manifest.file_name);
        let value = HeaderValue::from_bytes(disposition.as_bytes())
            .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
        out.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok((status, out, Body::from_stream(opened.content)).into_response())
}

async fn list_files(
    State(state): State<RelayState>,
    Query(params): Query<ListParams>,
) -> Response {
    let query = ListQuery::from(params);
    match state.relay.list(&query).await {
        Ok(page) => Json(json!({
            "code": 200,
            "message": "Success",
            "data": page.data,
            "total": page.total,
            "page": page.page,
            "next_page": page.next_page,
            "limit": page.limit,
            "total_page": page.total_page,
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "listing failed");
            let page = query.page();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "code": 500,
                    "message": e.to_string(),
                    "data": Value::Null,
                    "total": 0,
                    "page": page,
                    "next_page": page,
                    "limit": query.limit(),
                    "total_page": 0,
                })),
            )
                .into_response()
        }
    }
}
