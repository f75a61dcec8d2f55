use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use relay_blob::RelayError;
use serde_json::{json, Value};

pub const NOT_FOUND_TEXT: &str = "Cannot find the specified file";

#[derive(Debug)]
pub struct RelayAxumError(pub anyhow::Error);

/// Context marking a failure that happened while accepting an upload
#[derive(Debug, Clone, Copy)]
pub struct DuringUpload;

impl std::fmt::Display for DuringUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("upload failed")
    }
}

impl RelayAxumError {
    pub fn upload(err: RelayError) -> Self {
        Self(anyhow::Error::new(err).context(DuringUpload))
    }

    fn during_upload(&self) -> bool {
        self.0.downcast_ref::<DuringUpload>().is_some()
    }
}

impl From<anyhow::Error> for RelayAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<RelayError> for RelayAxumError {
    fn from(e: RelayError) -> Self {
        Self(e.into())
    }
}

fn envelope(status: StatusCode, message: impl Into<String>, data: Value) -> Response {
    let body = json!({
        "code": status.as_u16(),
        "message": message.into(),
        "data": data,
    });
    (status, Json(body)).into_response()
}

fn internal() -> Response {
    envelope(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        Value::Null,
    )
}

impl IntoResponse for RelayAxumError {
    fn into_response(self) -> Response {
        let during_upload = self.during_upload();
        let Some(relay) = self.0.chain().find_map(|e| e.downcast_ref::<RelayError>()) else {
            tracing::error!(error = %self.0, "unhandled error");
            return internal();
        };

        match relay {
            RelayError::Invalid { message } => {
                envelope(StatusCode::BAD_REQUEST, message.clone(), Value::Null)
            }
            RelayError::NotFound { .. } => (StatusCode::NOT_FOUND, NOT_FOUND_TEXT).into_response(),
            RelayError::RangeNotSatisfiable { file_size } => (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, format!("bytes */{file_size}"))],
            )
                .into_response(),
            RelayError::Upstream {
                reason, payload, ..
            } => {
                tracing::warn!(error = %relay, "part host failure");
                envelope(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    reason.clone(),
                    payload.clone().unwrap_or(Value::Null),
                )
            }
            RelayError::Persist { reason } if during_upload => {
                tracing::warn!(error = %relay, "manifest not saved");
                envelope(StatusCode::BAD_REQUEST, reason.clone(), Value::Null)
            }
            other => {
                tracing::error!(error = %other, "request failed");
                internal()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(res: Response) -> Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn invalid_is_400_envelope() {
        let res = RelayAxumError::from(RelayError::invalid("fileName is required")).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(res).await;
        assert_eq!(body["code"], 400);
        assert_eq!(body["message"], "fileName is required");
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn persist_is_400_only_for_uploads() {
        let res = RelayAxumError::upload(RelayError::persist("duplicate")).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = RelayAxumError::from(RelayError::persist("duplicate")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(res).await["message"], "Internal server error");
    }

    #[tokio::test]
    async fn upstream_carries_the_host_payload() {
        let err = RelayError::upstream_response("rejected", 413, Some(json!({"message": "too large"})));
        let res = RelayAxumError::upload(err).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(res).await["data"]["message"], "too large");
    }

    #[tokio::test]
    async fn unsatisfiable_range_reports_the_size() {
        let res = RelayAxumError::from(RelayError::RangeNotSatisfiable { file_size: 42 }).into_response();
        assert_eq!(res.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(res.headers()[header::CONTENT_RANGE], "bytes */42");
    }

    #[tokio::test]
    async fn foreign_errors_are_internal() {
        let res = RelayAxumError::from(anyhow::anyhow!("boom")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(res).await["message"], "Internal server error");
    }
}
