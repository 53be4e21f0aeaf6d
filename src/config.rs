use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::{env, str::FromStr};

/// Default container used when none is configured.
pub const DEFAULT_CONTAINER: &str = "uploads";

/// Default upload cap (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Which object-storage backend the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    /// Azure Blob Storage with ambient (managed/workload identity) credentials.
    Azure,
    /// Process-local store; contents vanish on restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "azure" => Ok(Self::Azure),
            "memory" => Ok(Self::Memory),
            other => bail!("unknown storage backend `{}` (expected `azure` or `memory`)", other),
        }
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub backend: StorageBackend,
    pub account: Option<String>,
    pub container: String,
    pub endpoint: Option<String>,
    pub max_upload_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Browser file upload to blob storage")]
pub struct Args {
    /// Host to bind to (overrides FILE_UPLOAD_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides FILE_UPLOAD_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Storage backend (overrides FILE_UPLOAD_BACKEND)
    #[arg(long, value_enum)]
    pub backend: Option<StorageBackend>,

    /// Storage account name (overrides FILE_UPLOAD_STORAGE_ACCOUNT)
    #[arg(long)]
    pub account: Option<String>,

    /// Container receiving uploads (overrides FILE_UPLOAD_CONTAINER)
    #[arg(long)]
    pub container: Option<String>,

    /// Blob service endpoint, e.g. an Azurite URL (overrides FILE_UPLOAD_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Largest accepted upload in bytes (overrides FILE_UPLOAD_MAX_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::resolve(Args::parse(), |key| env::var(key))
    }

    /// Merge parsed CLI args over values obtained from `lookup`.
    pub fn resolve<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let env_host = lookup("FILE_UPLOAD_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_var(&lookup, "FILE_UPLOAD_PORT", 8000u16)?;
        let env_backend = parse_var(&lookup, "FILE_UPLOAD_BACKEND", StorageBackend::Azure)?;
        let env_max = parse_var(&lookup, "FILE_UPLOAD_MAX_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        let env_container =
            lookup("FILE_UPLOAD_CONTAINER").unwrap_or_else(|_| DEFAULT_CONTAINER.into());

        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            backend: args.backend.unwrap_or(env_backend),
            account: args
                .account
                .or_else(|| lookup("FILE_UPLOAD_STORAGE_ACCOUNT").ok())
                .filter(|a| !a.trim().is_empty()),
            container: args.container.unwrap_or(env_container),
            endpoint: args
                .endpoint
                .or_else(|| lookup("FILE_UPLOAD_ENDPOINT").ok())
                .filter(|e| !e.trim().is_empty()),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max),
        };

        if cfg.backend == StorageBackend::Azure && cfg.account.is_none() {
            bail!("FILE_UPLOAD_STORAGE_ACCOUNT (or --account) is required for the azure backend");
        }
        if cfg.container.trim().is_empty() {
            bail!("container name must not be empty");
        }

        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Blob service endpoint, derived from the account unless overridden.
    pub fn blob_endpoint(&self) -> Option<String> {
        self.endpoint.clone().or_else(|| {
            self.account
                .as_ref()
                .map(|account| format!("https://{}.blob.core.windows.net", account))
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Result<String, env::VarError>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|err| anyhow::anyhow!("{}", err))
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, env::VarError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned().ok_or(env::VarError::NotPresent)
    }

    #[test]
    fn defaults_apply_for_memory_backend() {
        let cfg = AppConfig::resolve(Args::default(), vars(&[("FILE_UPLOAD_BACKEND", "memory")]))
            .unwrap();
        assert_eq!(cfg.addr(), "0.0.0.0:8000");
        assert_eq!(cfg.container, "uploads");
        assert_eq!(cfg.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(cfg.backend, StorageBackend::Memory);
        assert!(cfg.blob_endpoint().is_none());
    }

    #[test]
    fn azure_requires_an_account() {
        let err = AppConfig::resolve(Args::default(), vars(&[])).unwrap_err();
        assert!(err.to_string().contains("FILE_UPLOAD_STORAGE_ACCOUNT"));
    }

    #[test]
    fn endpoint_is_derived_from_account() {
        let cfg = AppConfig::resolve(
            Args::default(),
            vars(&[("FILE_UPLOAD_STORAGE_ACCOUNT", "stfiles")]),
        )
        .unwrap();
        assert_eq!(
            cfg.blob_endpoint().as_deref(),
            Some("https://stfiles.blob.core.windows.net")
        );
    }

    #[test]
    fn cli_overrides_environment() {
        let args = Args::try_parse_from([
            "blob-upload",
            "--backend",
            "memory",
            "--port",
            "9100",
            "--container",
            "inbox",
            "--max-upload-bytes",
            "1024",
        ])
        .unwrap();
        let cfg = AppConfig::resolve(
            args,
            vars(&[
                ("FILE_UPLOAD_PORT", "7000"),
                ("FILE_UPLOAD_CONTAINER", "other"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.container, "inbox");
        assert_eq!(cfg.max_upload_bytes, 1024);
    }

    #[test]
    fn malformed_port_is_reported() {
        let err = AppConfig::resolve(
            Args::default(),
            vars(&[("FILE_UPLOAD_BACKEND", "memory"), ("FILE_UPLOAD_PORT", "http")]),
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("FILE_UPLOAD_PORT"));
    }
}
