//! Folding a sigmoid output into a label and a confidence.

use crate::models::Label;

/// Decision threshold. Exactly 0.5 is OFF.
pub const THRESHOLD: f32 = 0.5;

pub fn to_label(probability: f32) -> Label {
    if probability > THRESHOLD {
        Label::On
    } else {
        Label::Off
    }
}

/// Probability of the winning label, always in [0.5, 1.0] for inputs in [0, 1].
pub fn to_confidence(probability: f32) -> f32 {
    if probability > THRESHOLD {
        probability
    } else {
        1.0 - probability
    }
}
