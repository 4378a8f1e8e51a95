//! Relative path naming scheme for one stored Sentinel band.
//!
//! Layout:
//! `{case_study}/{tracer_id}/{job_id}/{timestamp}/sentinel/{dataset}_{evalscript}_{hash}.{ext}`
//!
//! The file segment is split on `_` and `.` by position, so none of the
//! components may contain `/`, `_` or `.`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed directory marker between the timestamp and the file segment.
pub const SENTINEL_SEGMENT: &str = "sentinel";

/// Number of `/`-separated segments in a well-formed path.
const SEGMENT_COUNT: usize = 6;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathCodecError {
    #[error("expected {expected} '/'-separated segments, found {found}")]
    SegmentCount { expected: usize, found: usize },

    #[error("expected segment 5 to be 'sentinel', found '{0}'")]
    MissingSentinelMarker(String),

    #[error("file name '{0}' must have exactly three '_'-separated parts (dataset_evalscript_hash.ext)")]
    UnderscoreCount(String),

    #[error("file name part '{0}' must have exactly one '.' before the extension")]
    ExtensionDelimiter(String),

    #[error("component '{0}' is empty")]
    EmptyComponent(&'static str),
}

/// Decoded form of a band's storage path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativePath {
    pub case_study_name: String,
    pub tracer_id: String,
    pub job_id: String,
    pub timestamp: String,
    pub dataset: String,
    pub evalscript_name: String,
    pub image_hash: String,
    pub file_extension: String,
}

impl RelativePath {
    /// Render the storage path.
    pub fn encode(&self) -> String {
        format!(
            "{}/{}/{}/{}/{SENTINEL_SEGMENT}/{}_{}_{}.{}",
            self.case_study_name,
            self.tracer_id,
            self.job_id,
            self.timestamp,
            self.dataset,
            self.evalscript_name,
            self.image_hash,
            self.file_extension,
        )
    }

    /// Parse a storage path produced by [`RelativePath::encode`].
    pub fn decode(path: &str) -> Result<Self, PathCodecError> {
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() != SEGMENT_COUNT {
            return Err(PathCodecError::SegmentCount {
                expected: SEGMENT_COUNT,
                found: segments.len(),
            });
        }
        if segments[4] != SENTINEL_SEGMENT {
            return Err(PathCodecError::MissingSentinelMarker(segments[4].to_string()));
        }

        let file_segment = segments[5];
        let parts: Vec<&str> = file_segment.split('_').collect();
        let [dataset, evalscript_name, hash_and_ext] = parts.as_slice() else {
            return Err(PathCodecError::UnderscoreCount(file_segment.to_string()));
        };

        let tail: Vec<&str> = hash_and_ext.split('.').collect();
        let [image_hash, file_extension] = tail.as_slice() else {
            return Err(PathCodecError::ExtensionDelimiter(hash_and_ext.to_string()));
        };

        let decoded = Self {
            case_study_name: segments[0].to_string(),
            tracer_id: segments[1].to_string(),
            job_id: segments[2].to_string(),
            timestamp: segments[3].to_string(),
            dataset: dataset.to_string(),
            evalscript_name: evalscript_name.to_string(),
            image_hash: image_hash.to_string(),
            file_extension: file_extension.to_string(),
        };
        decoded.check_non_empty()?;
        Ok(decoded)
    }

    fn check_non_empty(&self) -> Result<(), PathCodecError> {
        let fields = [
            ("case_study_name", &self.case_study_name),
            ("tracer_id", &self.tracer_id),
            ("job_id", &self.job_id),
            ("timestamp", &self.timestamp),
            ("dataset", &self.dataset),
            ("evalscript_name", &self.evalscript_name),
            ("image_hash", &self.image_hash),
            ("file_extension", &self.file_extension),
        ];
        match fields.iter().find(|(_, value)| value.is_empty()) {
            Some((name, _)) => Err(PathCodecError::EmptyComponent(*name)),
            None => Ok(()),
        }
    }
}

impl std::fmt::Display for RelativePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

impl std::str::FromStr for RelativePath {
    type Err = PathCodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
