use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::header::{AUTHORIZATION, RANGE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::{ByteStream, PartBlobClient, RelayError, RelayResult};

/// Settings for a part host reached over plain HTTP
#[derive(Debug, Clone)]
pub struct HttpPartConfig {
    /// Endpoint accepting a multipart form with one file per request
    pub upload_url: String,
    /// Sent verbatim as the `Authorization` header on uploads
    pub authorization: Option<String>,
    /// Form field the part is attached under
    pub file_field: String,
    /// JSON pointer locating the part URL in the upload reply
    pub url_pointer: String,
}

impl HttpPartConfig {
    pub fn new(upload_url: impl Into<String>) -> Self {
        Self {
            upload_url: upload_url.into(),
            authorization: None,
            file_field: "file".to_string(),
            url_pointer: "/attachments/0/url".to_string(),
        }
    }

    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    pub fn with_file_field(mut self, field: impl Into<String>) -> Self {
        self.file_field = field.into();
        self
    }

    pub fn with_url_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.url_pointer = pointer.into();
        self
    }
}

/// Part host speaking multipart uploads and `Range` downloads
#[derive(Debug, Clone)]
pub struct HttpPartClient {
    http: Client,
    config: HttpPartConfig,
}

impl HttpPartClient {
    pub fn new(config: HttpPartConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(http: Client, config: HttpPartConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &HttpPartConfig {
        &self.config
    }
}

/// Turn a non-success reply into an upstream error carrying its body
async fn rejected(context: &str, response: Response) -> RelayError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    RelayError::upstream_response(
        format!("{context}: host answered {status}"),
        status.as_u16(),
        reply_payload(&text),
    )
}

/// JSON replies are kept as JSON, anything else as a string
fn reply_payload(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}

fn part_url(reply: &Value, pointer: &str) -> Option<String> {
    reply.pointer(pointer).and_then(Value::as_str).map(str::to_string)
}

#[async_trait]
impl PartBlobClient for HttpPartClient {
    async fn put(&self, name: &str, bytes: Bytes) -> RelayResult<String> {
        let len = bytes.len();
        let form = Form::new().part(
            self.config.file_field.clone(),
            Part::stream_with_length(bytes, len as u64).file_name(name.to_string()),
        );

        let mut request = self.http.post(&self.config.upload_url).multipart(form);
        if let Some(auth) = &self.config.authorization {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RelayError::upstream(format!("uploading {name}: {e}")))?;
        if !response.status().is_success() {
            return Err(rejected(&format!("uploading {name}"), response).await);
        }

        let reply: Value = response
            .json()
            .await
            .map_err(|e| RelayError::upstream(format!("uploading {name}: unreadable reply: {e}")))?;
        let url = part_url(&reply, &self.config.url_pointer).ok_or_else(|| {
            RelayError::Upstream {
                reason: format!("uploading {name}: no URL at {}", self.config.url_pointer),
                status: None,
                payload: Some(reply.clone()),
            }
        })?;

        debug!(part = %name, bytes = len, url = %url, "part accepted by host");
        Ok(url)
    }

    async fn get_range(&self, url: &str, start: u64, end: u64) -> RelayResult<ByteStream> {
        let response = self
            .http
            .get(url)
            .header(RANGE, format!("bytes={start}-{end}"))
            .send()
            .await
            .map_err(|e| RelayError::upstream(format!("fetching {url}: {e}")))?;

        match response.status() {
            StatusCode::PARTIAL_CONTENT => {}
            // A full body is only usable when it starts where we want to start;
            // the reassembler cuts it at the requested end.
            StatusCode::OK if start == 0 => {}
            _ => return Err(rejected(&format!("fetching {url}"), response).await),
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_target_attachment_replies() {
        let config = HttpPartConfig::new("https://host.example/upload")
            .with_authorization("Bot secret");
        assert_eq!(config.file_field, "file");
        assert_eq!(config.url_pointer, "/attachments/0/url");
        assert_eq!(config.authorization.as_deref(), Some("Bot secret"));
    }

    #[test]
    fn part_url_follows_the_pointer() {
        let reply = serde_json::json!({
            "id": "1",
            "attachments": [{ "url": "https://cdn.example/a-chunk-1" }]
        });
        assert_eq!(
            part_url(&reply, "/attachments/0/url").as_deref(),
            Some("https://cdn.example/a-chunk-1")
        );
        assert_eq!(part_url(&reply, "/attachments/1/url"), None);
        assert_eq!(part_url(&reply, "/id/url"), None);
    }

    #[test]
    fn reply_payload_prefers_json() {
        assert_eq!(
            reply_payload(r#"{"message":"Request entity too large"}"#),
            Some(serde_json::json!({"message": "Request entity too large"}))
        );
        assert_eq!(reply_payload("bad gateway"), Some(Value::String("bad gateway".into())));
        assert_eq!(reply_payload("  "), None);
    }
}
