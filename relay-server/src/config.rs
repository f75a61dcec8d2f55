use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use relay_blob::{ChunkRules, HttpPartConfig, RelayConfig, S3PartConfig};

/// Where parts are kept
#[derive(Debug, Clone)]
pub enum PartBackend {
    Memory,
    Http(HttpPartConfig),
    S3(S3PartConfig),
}

/// Where manifests are kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestBackend {
    Memory,
    Fs(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub public_base_url: Option<String>,
    pub relay: RelayConfig,
    pub parts: PartBackend,
    pub manifests: ManifestBackend,
}

impl ServerConfig {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let defaults = RelayConfig::default();

        let relay = RelayConfig::new()
            .with_max_file_bytes(env.var_or("RELAY_MAX_FILE_BYTES", defaults.max_file_bytes)?)
            .with_chunk_rules(
                ChunkRules::new()
                    .with_chunk_size(env.var_or("RELAY_CHUNK_SIZE", defaults.chunk_rules.chunk_size)?)
                    .with_upload_queue_depth(env.var_or(
                        "RELAY_UPLOAD_QUEUE_DEPTH",
                        defaults.chunk_rules.upload_queue_depth,
                    )?),
            )
            .with_range_window(env.var_or("RELAY_RANGE_WINDOW", defaults.range_window_bytes)?)
            .with_download_buffer(env.var_or("RELAY_DOWNLOAD_BUFFER", defaults.download_buffer)?);
        relay
            .validate()
            .context("invalid relay settings")?;

        let parts = match env.var_or("PART_BACKEND", "memory".to_string())?.to_lowercase().as_str() {
            "memory" => PartBackend::Memory,
            "http" => {
                let mut config = HttpPartConfig::new(env.required("PART_UPLOAD_URL")?);
                if let Some(auth) = env.optional("PART_AUTHORIZATION") {
                    config = config.with_authorization(auth);
                }
                if let Some(field) = env.optional("PART_FILE_FIELD") {
                    config = config.with_file_field(field);
                }
                if let Some(pointer) = env.optional("PART_URL_POINTER") {
                    config = config.with_url_pointer(pointer);
                }
                PartBackend::Http(config)
            }
            "s3" => PartBackend::S3(S3PartConfig {
                bucket: env.required("S3_BUCKET")?,
                region: env.var_or("S3_REGION", "us-east-1".to_string())?,
                endpoint_url: env.required("S3_ENDPOINT_URL")?,
                access_key_id: env.required("S3_ACCESS_KEY_ID")?,
                secret_access_key: env.required("S3_SECRET_ACCESS_KEY")?,
            }),
            other => bail!("unknown PART_BACKEND {other:?} (expected memory, http or s3)"),
        };

        let manifests = match env.var_or("MANIFEST_BACKEND", "memory".to_string())?.to_lowercase().as_str() {
            "memory" => ManifestBackend::Memory,
            "fs" => ManifestBackend::Fs(PathBuf::from(
                env.var_or("MANIFEST_DIR", "data/manifests".to_string())?,
            )),
            other => bail!("unknown MANIFEST_BACKEND {other:?} (expected memory or fs)"),
        };

        Ok(Self {
            host: env.var_or("HTTP_HOST", "127.0.0.1".to_string())?,
            port: env.var_or("HTTP_PORT", 3030)?,
            public_base_url: env.optional("PUBLIC_BASE_URL"),
            relay,
            parts,
            manifests,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Set and non-blank value of `key`
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.optional(key)
            .with_context(|| format!("{key} environment variable required"))
    }

    fn var_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("{key}={raw:?}: {e}")),
            None => Ok(default),
        }
    }
}
