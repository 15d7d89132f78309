use crate::services::{
    memory_backend::DEFAULT_PAGE_SIZE, s3_backend::S3Settings, storage_gateway::GatewayConfig,
};
use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::env;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const MEMORY_BUCKET: &str = "local-bucket";

/// Which object-storage implementation the gateway talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    S3,
    Memory,
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub backend: BackendKind,
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub force_path_style: bool,
    pub public_url: Option<String>,
    pub max_upload_bytes: usize,
    pub memory_page_size: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "HTTP file gateway in front of an object-storage bucket")]
pub struct Args {
    /// Host to bind to (overrides FILE_GATEWAY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides FILE_GATEWAY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Storage backend (overrides FILE_GATEWAY_BACKEND)
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Bucket name (overrides FILE_GATEWAY_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Bucket region (overrides FILE_GATEWAY_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Custom S3-compatible endpoint URL (overrides FILE_GATEWAY_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Use path-style bucket addressing (overrides FILE_GATEWAY_FORCE_PATH_STYLE)
    #[arg(long)]
    pub force_path_style: Option<bool>,

    /// Public base URL of the bucket (overrides FILE_GATEWAY_PUBLIC_URL)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Maximum request body size in bytes (overrides FILE_GATEWAY_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Listing page size of the memory backend (overrides FILE_GATEWAY_MEMORY_PAGE_SIZE)
    #[arg(long)]
    pub memory_page_size: Option<usize>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::merge(Args::parse())
    }

    fn merge(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("FILE_GATEWAY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env("FILE_GATEWAY_PORT", 8080u16)?;
        let env_backend = match optional_env("FILE_GATEWAY_BACKEND")? {
            Some(value) => BackendKind::from_str(&value, true).map_err(|err| {
                anyhow::anyhow!("parsing FILE_GATEWAY_BACKEND value `{}`: {}", value, err)
            })?,
            None => BackendKind::S3,
        };
        let env_region = env::var("FILE_GATEWAY_REGION").unwrap_or_else(|_| "us-east-1".into());
        let env_max_upload = parse_env("FILE_GATEWAY_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        let env_page_size = parse_env("FILE_GATEWAY_MEMORY_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;

        // --- Merge ---
        let backend = args.backend.unwrap_or(env_backend);
        let bucket = match args.bucket.or(optional_env("FILE_GATEWAY_BUCKET")?) {
            Some(bucket) => bucket,
            None if backend == BackendKind::Memory => MEMORY_BUCKET.to_string(),
            None => bail!("a bucket is required: pass --bucket or set FILE_GATEWAY_BUCKET"),
        };
        let endpoint = args.endpoint.or(optional_env("FILE_GATEWAY_ENDPOINT")?);
        let force_path_style = match args.force_path_style {
            Some(value) => value,
            None => match optional_env("FILE_GATEWAY_FORCE_PATH_STYLE")? {
                Some(value) => value.parse::<bool>().with_context(|| {
                    format!("parsing FILE_GATEWAY_FORCE_PATH_STYLE value `{}`", value)
                })?,
                None => endpoint.is_some(),
            },
        };

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            backend,
            bucket,
            region: args.region.unwrap_or(env_region),
            endpoint,
            force_path_style,
            public_url: args.public_url.or(optional_env("FILE_GATEWAY_PUBLIC_URL")?),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
            memory_page_size: args.memory_page_size.unwrap_or(env_page_size),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn s3_settings(&self) -> S3Settings {
        S3Settings {
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
            force_path_style: self.force_path_style,
        }
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::new(self.bucket.clone(), self.bucket_base_url())
    }

    /// Public URL of the bucket root, i.e. the URL of the empty key.
    ///
    /// Explicit `public_url` wins; otherwise it follows the SDK's addressing
    /// rules for the configured endpoint.
    pub fn bucket_base_url(&self) -> String {
        if let Some(url) = &self.public_url {
            return url.clone();
        }
        if self.backend == BackendKind::Memory {
            return format!("memory://{}/", self.bucket);
        }

        match &self.endpoint {
            Some(endpoint) => {
                let endpoint = endpoint.trim_end_matches('/');
                if self.force_path_style {
                    format!("{}/{}/", endpoint, self.bucket)
                } else {
                    match endpoint.split_once("://") {
                        Some((scheme, host)) => format!("{}://{}.{}/", scheme, self.bucket, host),
                        None => format!("https://{}.{}/", self.bucket, endpoint),
                    }
                }
            }
            None => format!(
                "https://{}.s3.{}.amazonaws.com/",
                self.bucket, self.region
            ),
        }
    }
}

fn optional_env(name: &str) -> Result<Option<String>> {
    match env::var(name) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(name)? {
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            host: "127.0.0.1".into(),
            port: 8080,
            backend: BackendKind::S3,
            bucket: "photos".into(),
            region: "eu-west-1".into(),
            endpoint: None,
            force_path_style: false,
            public_url: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            memory_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[test]
    fn aws_virtual_hosted_url() {
        assert_eq!(
            config().bucket_base_url(),
            "https://photos.s3.eu-west-1.amazonaws.com/"
        );
    }

    #[test]
    fn custom_endpoint_path_style() {
        let cfg = AppConfig {
            endpoint: Some("http://localhost:9000/".into()),
            force_path_style: true,
            ..config()
        };
        assert_eq!(cfg.bucket_base_url(), "http://localhost:9000/photos/");
    }

    #[test]
    fn custom_endpoint_virtual_hosted() {
        let cfg = AppConfig {
            endpoint: Some("https://storage.example.com".into()),
            ..config()
        };
        assert_eq!(cfg.bucket_base_url(), "https://photos.storage.example.com/");
    }

    #[test]
    fn public_url_wins() {
        let cfg = AppConfig {
            public_url: Some("https://cdn.example.com/files".into()),
            endpoint: Some("http://localhost:9000".into()),
            ..config()
        };
        assert_eq!(cfg.bucket_base_url(), "https://cdn.example.com/files");
        assert_eq!(
            cfg.gateway_config().base_url,
            "https://cdn.example.com/files/"
        );
    }

    #[test]
    fn memory_backend_url() {
        let cfg = AppConfig {
            backend: BackendKind::Memory,
            ..config()
        };
        assert_eq!(cfg.bucket_base_url(), "memory://photos/");
    }

    #[test]
    fn cli_values_override_defaults() {
        let args = Args::parse_from([
            "file-gateway",
            "--backend",
            "memory",
            "--port",
            "9999",
            "--max-upload-bytes",
            "1024",
        ]);
        let cfg = AppConfig::merge(args).unwrap();
        assert_eq!(cfg.backend, BackendKind::Memory);
        assert_eq!(cfg.port, 9999);
        assert_eq!(cfg.max_upload_bytes, 1024);
    }

    #[test]
    fn memory_page_size_defaults_and_overrides() {
        let cfg = AppConfig::merge(Args::parse_from(["file-gateway", "--backend", "memory"])).unwrap();
        assert_eq!(cfg.memory_page_size, DEFAULT_PAGE_SIZE);

        let cfg = AppConfig::merge(Args::parse_from([
            "file-gateway",
            "--backend",
            "memory",
            "--memory-page-size",
            "5",
        ]))
        .unwrap();
        assert_eq!(cfg.memory_page_size, 5);
    }
}
