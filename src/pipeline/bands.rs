//! Canonical band order for the five-band composite.

use crate::models::RelativePath;

use super::ValidationError;

/// Number of bands in one sample.
pub const BAND_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Thermal,
    Natural,
    OpticalThickness,
    Moisture,
    Chlorophyll,
}

impl Band {
    /// Channel-concatenation order the networks were trained on.
    pub const SEQUENCE: [Band; BAND_COUNT] = [
        Band::Thermal,
        Band::Natural,
        Band::OpticalThickness,
        Band::Moisture,
        Band::Chlorophyll,
    ];

    /// Identifier searched for inside the evalscript name.
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::Thermal => "thermal",
            Self::Natural => "natural",
            Self::OpticalThickness => "optical-thickness",
            Self::Moisture => "moisture",
            Self::Chlorophyll => "chlorophyll",
        }
    }

    pub fn at(position: usize) -> Option<Band> {
        Self::SEQUENCE.get(position).copied()
    }
}

/// Check that the band at `position` carries the expected identifier.
///
/// Matching is by substring, so `sentinel-thermal-v2` satisfies `thermal`.
pub fn check_band_position(position: usize, path: &RelativePath) -> Result<Band, ValidationError> {
    let expected = Band::at(position).ok_or(ValidationError::CountMismatch {
        received: position + 1,
    })?;
    if path.evalscript_name.contains(expected.identifier()) {
        Ok(expected)
    } else {
        Err(ValidationError::BandOrder {
            position,
            expected: expected.identifier(),
            actual: path.evalscript_name.clone(),
        })
    }
}
