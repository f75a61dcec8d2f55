use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream as AwsByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

use crate::{ByteStream, PartBlobClient, RelayError, RelayResult};

/// Connection settings for an S3-compatible part bucket
#[derive(Debug, Clone)]
pub struct S3PartConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Part host backed by an S3-compatible bucket.
///
/// Every part gets its own key under `parts/<uuid>/`; the URL recorded in
/// manifests is the path-style object URL, which is also how
/// [`get_range`](PartBlobClient::get_range) finds the key again.
#[derive(Clone)]
pub struct S3PartClient {
    client: Client,
    bucket: String,
    url_prefix: String,
}

impl S3PartClient {
    pub async fn connect(config: S3PartConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None,
            None,
            "relay-s3",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .endpoint_url(config.endpoint_url.clone())
            .load()
            .await;

        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(true)
                .build(),
        );

        Self::with_client(client, &config.endpoint_url, config.bucket)
    }

    pub fn with_client(client: Client, endpoint_url: &str, bucket: String) -> Self {
        let url_prefix = format!("{}/{}/", endpoint_url.trim_end_matches('/'), bucket);
        Self {
            client,
            bucket,
            url_prefix,
        }
    }

    fn object_key(name: &str) -> String {
        format!("parts/{}/{}", Uuid::new_v4().simple(), name)
    }

    fn key_from_url<'u>(&self, url: &'u str) -> RelayResult<&'u str> {
        url.strip_prefix(&self.url_prefix)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| RelayError::upstream(format!("{url} is not an object in bucket {}", self.bucket)))
    }
}

fn sdk_failure<E>(context: String, err: SdkError<E>) -> RelayError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|raw| raw.status().as_u16());
    let reason = format!("{context}: {}", DisplayErrorContext(&err));
    match status {
        Some(status) => RelayError::upstream_response(reason, status, None),
        None => RelayError::upstream(reason),
    }
}

#[async_trait]
impl PartBlobClient for S3PartClient {
    async fn put(&self, name: &str, bytes: Bytes) -> RelayResult<String> {
        let key = Self::object_key(name);
        let len = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_length(len as i64)
            .body(AwsByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| sdk_failure(format!("uploading {name}"), e))?;

        debug!(part = %name, key = %key, bytes = len, "part stored in bucket");
        Ok(format!("{}{}", self.url_prefix, key))
    }

    async fn get_range(&self, url: &str, start: u64, end: u64) -> RelayResult<ByteStream> {
        let key = self.key_from_url(url)?;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .range(format!("bytes={start}-{end}"))
            .send()
            .await
            .map_err(|e| sdk_failure(format!("fetching {key}"), e))?;

        let mut body = output.body;
        let stream = async_stream::stream! {
            loop {
                match body.try_next().await {
                    Ok(Some(bytes)) => yield Ok::<_, std::io::Error>(bytes),
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(std::io::Error::other(e));
                        break;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }
}
