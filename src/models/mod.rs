pub mod prediction;
pub mod relative_path;
pub mod source;

pub use prediction::{Label, ModelKind, PredictionResponse, PredictionResult};
pub use relative_path::{PathCodecError, RelativePath};
pub use source::{SourceDescriptor, StorageProtocol};
