//! Image assembly: five band references in, one `256×256×15` tensor out.
//!
//! Two request shapes resolve to the same tensor:
//! - `Direct`: file paths already on this host, loaded as-is.
//! - `Remote`: encoded storage paths, decoded and band-checked up front, then
//!   downloaded through the gateway into request-scoped staging.
//!
//! Validation never touches disk or network. Staged files are gone before
//! `resolve` returns, whatever the outcome.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::RgbImage;
use ndarray::{Array3, Array4, ArrayView3, Axis};
use uuid::Uuid;

use super::bands::{check_band_position, BAND_COUNT};
use super::staging::RequestStaging;
use super::{ResolutionError, ValidationError};
use crate::gateway::{FileTransfer, StorageGateway};
use crate::models::{ModelKind, RelativePath, SourceDescriptor, StorageProtocol};

/// Square side every band is resized to.
pub const TARGET_SIZE: u32 = 256;
/// RGB.
pub const CHANNELS_PER_BAND: usize = 3;
pub const TENSOR_CHANNELS: usize = BAND_COUNT * CHANNELS_PER_BAND;

// ═══════════════════════════════════════════════════════════
// Tensor
// ═══════════════════════════════════════════════════════════

/// Normalized HWC input for the networks. Values in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Array3<f32>,
}

impl ImageTensor {
    pub const SHAPE: (usize, usize, usize) =
        (TARGET_SIZE as usize, TARGET_SIZE as usize, TENSOR_CHANNELS);

    /// All-zero tensor of the expected shape.
    pub fn zeros() -> Self {
        Self {
            data: Array3::zeros(Self::SHAPE),
        }
    }

    /// Stack already-resized bands along the channel axis, in slice order.
    fn from_bands(bands: &[RgbImage]) -> Self {
        let mut data = Array3::<f32>::zeros(Self::SHAPE);
        for (band_index, band) in bands.iter().enumerate() {
            let offset = band_index * CHANNELS_PER_BAND;
            for (x, y, pixel) in band.enumerate_pixels() {
                for channel in 0..CHANNELS_PER_BAND {
                    data[[y as usize, x as usize, offset + channel]] =
                        f32::from(pixel.0[channel]) / 255.0;
                }
            }
        }
        Self { data }
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Owned `[1, H, W, C]` copy with a leading batch axis.
    pub fn to_batch(&self) -> Array4<f32> {
        self.data.clone().insert_axis(Axis(0))
    }
}

/// Decode a band file (format sniffed from content) and bring it to
/// `TARGET_SIZE` square RGB. Nearest-neighbour sampling, as in training.
fn load_band(path: &Path) -> Result<RgbImage, image::ImageError> {
    let decoded = image::io::Reader::open(path)?
        .with_guessed_format()?
        .decode()?;
    Ok(decoded
        .resize_exact(TARGET_SIZE, TARGET_SIZE, FilterType::Nearest)
        .to_rgb8())
}

/// Load `(reference, path)` pairs in order. `reference` is what the caller
/// sent and is the only name used in errors.
fn load_tensor<'a, I>(files: I) -> Result<ImageTensor, ResolutionError>
where
    I: IntoIterator<Item = (&'a str, &'a Path)>,
{
    let mut bands = Vec::with_capacity(BAND_COUNT);
    for (position, (reference, path)) in files.into_iter().enumerate() {
        let band = load_band(path).map_err(|source| ResolutionError::ImageLoad {
            position,
            reference: reference.to_string(),
            source,
        })?;
        bands.push(band);
    }
    Ok(ImageTensor::from_bands(&bands))
}

// ═══════════════════════════════════════════════════════════
// Sources
// ═══════════════════════════════════════════════════════════

/// Where the five bands come from, as sent by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Direct(Vec<String>),
    Remote(Vec<String>),
}

impl ImageSource {
    pub fn len(&self) -> usize {
        match self {
            Self::Direct(refs) | Self::Remote(refs) => refs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Self::Direct(_) => "direct",
            Self::Remote(_) => "remote",
        }
    }
}

/// A source that passed every check that needs no I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedSource {
    Direct(Vec<String>),
    Remote(Vec<RelativePath>),
}

/// Collaborators needed to resolve remote sources.
pub struct ResolveContext<'a> {
    pub gateway: &'a dyn StorageGateway,
    pub transfer: &'a dyn FileTransfer,
    pub staging_root: &'a Path,
    pub protocol: StorageProtocol,
}

/// Count, model and (remote only) path/band checks, in that order.
pub fn validate(
    source: ImageSource,
    model_name: &str,
) -> Result<(ValidatedSource, ModelKind), ValidationError> {
    if source.len() != BAND_COUNT {
        return Err(ValidationError::CountMismatch {
            received: source.len(),
        });
    }

    let kind = ModelKind::from_user_input(model_name).ok_or_else(|| {
        ValidationError::UnsupportedModel {
            given: model_name.to_string(),
            supported: ModelKind::supported_names(),
        }
    })?;

    let validated = match source {
        ImageSource::Direct(refs) => ValidatedSource::Direct(refs),
        ImageSource::Remote(paths) => ValidatedSource::Remote(validate_remote_paths(&paths)?),
    };
    Ok((validated, kind))
}

/// Decode and band-check each path in order; the first failure wins.
pub fn validate_remote_paths(paths: &[String]) -> Result<Vec<RelativePath>, ValidationError> {
    paths
        .iter()
        .enumerate()
        .map(|(position, raw)| {
            let decoded = RelativePath::decode(raw)
                .map_err(|source| ValidationError::MalformedPath { position, source })?;
            check_band_position(position, &decoded)?;
            Ok(decoded)
        })
        .collect()
}

/// Turn a validated source into a tensor.
pub fn resolve(
    source: &ValidatedSource,
    ctx: &ResolveContext<'_>,
    request_id: Uuid,
) -> Result<ImageTensor, ResolutionError> {
    match source {
        ValidatedSource::Direct(refs) => {
            load_tensor(refs.iter().map(|r| (r.as_str(), Path::new(r.as_str()))))
        }
        ValidatedSource::Remote(paths) => resolve_remote(paths, ctx, request_id),
    }
}

fn resolve_remote(
    paths: &[RelativePath],
    ctx: &ResolveContext<'_>,
    request_id: Uuid,
) -> Result<ImageTensor, ResolutionError> {
    let staging =
        RequestStaging::create(ctx.staging_root, request_id).map_err(ResolutionError::Staging)?;

    let mut staged: Vec<(String, PathBuf)> = Vec::with_capacity(paths.len());
    for (position, path) in paths.iter().enumerate() {
        let descriptor = SourceDescriptor::for_band(path, ctx.protocol);

        let signed_url = ctx
            .gateway
            .generate_signed_url_for_download(&descriptor)
            .map_err(|source| ResolutionError::SignedUrl {
                position,
                relative_path: descriptor.relative_path.clone(),
                source,
            })?;

        let local = staging.band_file(position, &path.file_extension);
        ctx.transfer
            .download(&signed_url, &local)
            .map_err(|source| ResolutionError::Download {
                position,
                relative_path: descriptor.relative_path.clone(),
                source,
            })?;

        tracing::debug!(%request_id, position, name = %descriptor.name, "Band staged");
        staged.push((descriptor.relative_path, local));
    }

    let tensor = load_tensor(
        staged
            .iter()
            .map(|(reference, local)| (reference.as_str(), local.as_path())),
    );

    if let Err(e) = staging.close() {
        tracing::warn!(%request_id, error = %e, "Failed to remove staging directory");
    }
    tensor
}
