use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::header::{AUTHORIZATION, CONTENT_LENGTH, RANGE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures_util::StreamExt;
use parking_lot::Mutex;
use relay_blob::{ByteStream, HttpPartClient, HttpPartConfig, PartBlobClient, RelayError};
use serde_json::json;
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
struct SeenUpload {
    field: String,
    file_name: String,
    authorization: Option<String>,
    sized: bool,
}

/// Attachment host stand-in: multipart uploads in, ranged reads out.
#[derive(Clone, Default)]
struct Host {
    base: String,
    parts: Arc<Mutex<HashMap<String, Bytes>>>,
    uploads: Arc<Mutex<Vec<SeenUpload>>>,
}

async fn upload(State(host): State<Host>, headers: HeaderMap, mut multipart: Multipart) -> Response {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let sized = headers.contains_key(CONTENT_LENGTH);

    let Some(field) = multipart.next_field().await.unwrap() else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let field_name = field.name().unwrap_or_default().to_string();
    let file_name = field.file_name().unwrap_or_default().to_string();
    let bytes = field.bytes().await.unwrap();

    host.parts.lock().insert(file_name.clone(), bytes);
    host.uploads.lock().push(SeenUpload {
        field: field_name,
        file_name: file_name.clone(),
        authorization,
        sized,
    });

    Json(json!({
        "id": "m1",
        "attachments": [{ "url": format!("{}/parts/{file_name}", host.base) }]
    }))
    .into_response()
}

async fn too_large() -> Response {
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(json!({ "message": "Request entity too large", "code": 40005 })),
    )
        .into_response()
}

fn requested(headers: &HeaderMap) -> Option<(usize, usize)> {
    let value = headers.get(RANGE)?.to_str().ok()?;
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

async fn ranged(State(host): State<Host>, Path(name): Path<String>, headers: HeaderMap) -> Response {
    let Some(data) = host.parts.lock().get(&name).cloned() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match requested(&headers) {
        Some((start, end)) => {
            let end = end.min(data.len() - 1);
            (StatusCode::PARTIAL_CONTENT, data.slice(start..=end)).into_response()
        }
        None => data.into_response(),
    }
}

/// Same parts, but the `Range` header is ignored.
async fn plain(State(host): State<Host>, Path(name): Path<String>) -> Response {
    match host.parts.lock().get(&name).cloned() {
        Some(data) => data.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_host() -> Host {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let host = Host {
        base: format!("http://{}", listener.local_addr().unwrap()),
        ..Default::default()
    };

    let router = Router::new()
        .route("/upload", post(upload))
        .route("/too-large", post(too_large))
        .route("/parts/{name}", get(ranged))
        .route("/plain/{name}", get(plain))
        .with_state(host.clone());
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

    host
}

fn client(config: HttpPartConfig) -> HttpPartClient {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    HttpPartClient::with_client(http, config)
}

async fn read_all(mut stream: ByteStream) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(item) = stream.next().await {
        out.extend_from_slice(&item.unwrap());
    }
    out
}

#[tokio::test]
async fn put_posts_a_sized_multipart_form() {
    let host = spawn_host().await;
    let client = client(
        HttpPartConfig::new(format!("{}/upload", host.base)).with_authorization("Bot secret"),
    );

    let url = client
        .put("clip.bin-chunk-1", Bytes::from_static(b"0123456789"))
        .await
        .unwrap();
    assert_eq!(url, format!("{}/parts/clip.bin-chunk-1", host.base));

    let seen = host.uploads.lock()[0].clone();
    assert_eq!(seen.field, "file");
    assert_eq!(seen.file_name, "clip.bin-chunk-1");
    assert_eq!(seen.authorization.as_deref(), Some("Bot secret"));
    assert!(seen.sized, "multipart body sent without a content length");
    assert_eq!(
        host.parts.lock().get("clip.bin-chunk-1").cloned(),
        Some(Bytes::from_static(b"0123456789"))
    );
}

#[tokio::test]
async fn get_range_asks_for_inclusive_bytes() {
    let host = spawn_host().await;
    let client = client(HttpPartConfig::new(format!("{}/upload", host.base)));
    let url = client
        .put("a-chunk-1", Bytes::from_static(b"0123456789"))
        .await
        .unwrap();

    let body = client.get_range(&url, 2, 5).await.unwrap();
    assert_eq!(read_all(body).await, b"2345");

    let body = client.get_range(&url, 9, 9).await.unwrap();
    assert_eq!(read_all(body).await, b"9");
}

#[tokio::test]
async fn full_replies_are_only_usable_from_the_first_byte() {
    let host = spawn_host().await;
    let client = client(HttpPartConfig::new(format!("{}/upload", host.base)));
    client
        .put("a-chunk-1", Bytes::from_static(b"0123456789"))
        .await
        .unwrap();
    let url = format!("{}/plain/a-chunk-1", host.base);

    // The whole part comes back; the reassembler cuts it at the end.
    let body = client.get_range(&url, 0, 3).await.unwrap();
    assert_eq!(read_all(body).await, b"0123456789");

    let Err(err) = client.get_range(&url, 3, 5).await else {
        panic!("full reply accepted for a range starting mid-part");
    };
    assert!(matches!(err, RelayError::Upstream { status: Some(200), .. }));
}

#[tokio::test]
async fn missing_parts_are_upstream_errors() {
    let host = spawn_host().await;
    let client = client(HttpPartConfig::new(format!("{}/upload", host.base)));

    let Err(err) = client
        .get_range(&format!("{}/parts/gone", host.base), 0, 9)
        .await
    else {
        panic!("missing part was served");
    };
    assert!(matches!(err, RelayError::Upstream { status: Some(404), .. }));
}

#[tokio::test]
async fn rejected_uploads_carry_the_host_reply() {
    let host = spawn_host().await;
    let client = client(HttpPartConfig::new(format!("{}/too-large", host.base)));

    let err = client
        .put("big-chunk-1", Bytes::from_static(b"xyz"))
        .await
        .unwrap_err();
    match err {
        RelayError::Upstream { status, payload, .. } => {
            assert_eq!(status, Some(413));
            assert_eq!(
                payload,
                Some(json!({ "message": "Request entity too large", "code": 40005 }))
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn replies_without_a_url_keep_the_reply() {
    let host = spawn_host().await;
    let client = client(
        HttpPartConfig::new(format!("{}/upload", host.base)).with_url_pointer("/files/0/href"),
    );

    let err = client
        .put("a-chunk-1", Bytes::from_static(b"abc"))
        .await
        .unwrap_err();
    match err {
        RelayError::Upstream { payload: Some(reply), .. } => {
            assert_eq!(reply["id"], "m1");
        }
        other => panic!("unexpected error: {other}"),
    }
}
