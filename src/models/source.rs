use serde::{Deserialize, Serialize};

use super::relative_path::RelativePath;

/// Storage backend the gateway should address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProtocol {
    S3,
    /// Deprecated on the gateway side; kept so existing deployments can still opt in.
    Local,
}

impl StorageProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::Local => "local",
        }
    }
}

impl std::fmt::Display for StorageProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StorageProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(Self::S3),
            "local" => Ok(Self::Local),
            other => Err(format!(
                "storage protocol must be either 's3' or 'local', got '{other}'"
            )),
        }
    }
}

/// One stored image as known to the gateway. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub protocol: StorageProtocol,
    pub relative_path: String,
}

impl SourceDescriptor {
    /// Build the descriptor for a decoded band path. The registered name is
    /// `{image_hash}_{evalscript_name}`.
    pub fn for_band(path: &RelativePath, protocol: StorageProtocol) -> Self {
        Self {
            name: format!("{}_{}", path.image_hash, path.evalscript_name),
            protocol,
            relative_path: path.encode(),
        }
    }
}
