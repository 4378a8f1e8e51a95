use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::StorageProtocol;

/// Application-level constants
pub const APP_NAME: &str = "sentinel-inference";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Model artifacts loaded from the model directory at startup.
pub const UNIFIED_MODEL_FILE: &str = "Unified_model.onnx";
pub const BEZNAU_MODEL_FILE: &str = "Unified_Beznau_model.onnx";

const DEFAULT_MODEL_DIR: &str = "/model_files";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_CLIENT_ID: u32 = 1;

/// Gateway variables that must be present at startup.
const REQUIRED_GATEWAY_VARS: [&str; 4] = ["KP_HOST", "KP_PORT", "KP_SCHEME", "KP_AUTH_TOKEN"];

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "sentinel_inference_lib=debug,sentinel_inference=debug,tower=info,reqwest=info,info"
}

/// Default staging root: `<cache dir>/sentinel-inference/staging`,
/// falling back to the system temp dir on hosts without a cache dir.
pub fn default_staging_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
        .join("staging")
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Please set all environment variables, missing: {}", .0.join(", "))]
    MissingVars(Vec<&'static str>),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Connection settings for the storage gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub scheme: String,
    pub auth_token: String,
    pub client_id: u32,
}

impl GatewayConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Full process configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub model_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub storage_protocol: StorageProtocol,
    pub gateway: GatewayConfig,
}

impl ServiceConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing: Vec<&'static str> = REQUIRED_GATEWAY_VARS
            .into_iter()
            .filter(|var| lookup(var).map_or(true, |v| v.trim().is_empty()))
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingVars(missing));
        }

        let required = |var: &'static str| lookup(var).unwrap_or_default().trim().to_string();

        let port = required("KP_PORT")
            .parse::<u16>()
            .map_err(|e| ConfigError::Invalid {
                var: "KP_PORT",
                reason: e.to_string(),
            })?;

        let client_id = match lookup("KP_CLIENT_ID") {
            Some(raw) => raw.trim().parse::<u32>().map_err(|e| ConfigError::Invalid {
                var: "KP_CLIENT_ID",
                reason: e.to_string(),
            })?,
            None => DEFAULT_CLIENT_ID,
        };

        let storage_protocol = match lookup("STORAGE_PROTOCOL") {
            Some(raw) => raw
                .parse::<StorageProtocol>()
                .map_err(|reason| ConfigError::Invalid {
                    var: "STORAGE_PROTOCOL",
                    reason,
                })?,
            None => StorageProtocol::S3,
        };

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let model_dir = lookup("MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR));
        let staging_dir = lookup("STAGING_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_staging_dir);

        Ok(Self {
            bind_addr,
            model_dir,
            staging_dir,
            storage_protocol,
            gateway: GatewayConfig {
                host: required("KP_HOST"),
                port,
                scheme: required("KP_SCHEME"),
                auth_token: required("KP_AUTH_TOKEN"),
                client_id,
            },
        })
    }
}
