use serde::{Deserialize, Serialize};

/// Pretrained networks the service can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Single output head.
    Unified,
    /// Two independent output heads ("towers").
    Beznau,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::Unified, ModelKind::Beznau];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unified => "unified",
            Self::Beznau => "beznau",
        }
    }

    /// Number of probabilities the network emits per sample.
    pub fn output_heads(&self) -> usize {
        match self {
            Self::Unified => 1,
            Self::Beznau => 2,
        }
    }

    /// Parse user input, ignoring surrounding whitespace and case.
    pub fn from_user_input(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        Self::ALL.into_iter().find(|kind| kind.as_str() == normalized)
    }

    /// Supported names, for error messages.
    pub fn supported_names() -> Vec<&'static str> {
        Self::ALL.iter().map(|kind| kind.as_str()).collect()
    }

    /// Response label for output head `index` (0-based).
    pub fn head_label(&self, index: usize) -> String {
        match self {
            Self::Unified => self.as_str().to_string(),
            Self::Beznau => format!("{}_tower_{}", self.as_str(), index + 1),
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discrete classification of one output head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "ON")]
    On,
    #[serde(rename = "OFF")]
    Off,
}

/// One entry of the response `data` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: String,
    pub prediction: Label,
    pub confidence: f32,
}

/// Successful `/predict` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub data: Vec<PredictionResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_kind_normalizes_case_and_whitespace() {
        assert_eq!(ModelKind::from_user_input("  Unified "), Some(ModelKind::Unified));
        assert_eq!(ModelKind::from_user_input("BEZNAU"), Some(ModelKind::Beznau));
        assert_eq!(ModelKind::from_user_input("nuclear"), None);
        assert_eq!(ModelKind::from_user_input(""), None);
    }

    #[test]
    fn head_labels() {
        assert_eq!(ModelKind::Unified.head_label(0), "unified");
        assert_eq!(ModelKind::Beznau.head_label(0), "beznau_tower_1");
        assert_eq!(ModelKind::Beznau.head_label(1), "beznau_tower_2");
    }

    #[test]
    fn label_serializes_uppercase() {
        let result = PredictionResult {
            label: "unified".into(),
            prediction: Label::On,
            confidence: 0.75,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["prediction"], "ON");
        assert_eq!(json["label"], "unified");
        assert_eq!(serde_json::to_value(Label::Off).unwrap(), "OFF");
    }
}
