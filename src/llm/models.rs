//! Model definitions and presets
//!
//! Contains the per-family request rules and the list of known models.

use serde::{Deserialize, Serialize};

/// Models that only accept a fixed temperature and a completion-token cap
const REASONING_MODELS: &[&str] = &["gpt-5"];

/// Temperature the reasoning family insists on
pub const REASONING_TEMPERATURE: f32 = 1.0;

/// Request rules differ by model family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// Fixed temperature, `max_completion_tokens`
    Reasoning,
    /// Caller temperature, `max_tokens`
    General,
}

impl ModelFamily {
    /// Classify a model by its exact identifier
    pub fn of(model: &str) -> Self {
        if REASONING_MODELS.contains(&model) {
            Self::Reasoning
        } else {
            Self::General
        }
    }

    /// Temperature to send for this family
    pub fn temperature(self, requested: f32) -> f32 {
        match self {
            Self::Reasoning => REASONING_TEMPERATURE,
            Self::General => requested,
        }
    }

    /// Name of the token-limit field in the request body
    pub fn token_limit_field(self) -> &'static str {
        match self {
            Self::Reasoning => "max_completion_tokens",
            Self::General => "max_tokens",
        }
    }
}

/// Model preset shown to users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPreset {
    /// Model identifier
    pub name: String,
    /// Human-readable display name
    pub display_name: String,
    /// Description of the model
    pub description: String,
}

/// Get predefined model presets
pub fn get_model_presets() -> Vec<ModelPreset> {
    vec![
        ModelPreset {
            name: "gpt-5".to_string(),
            display_name: "GPT-5".to_string(),
            description: "Reasoning model; temperature is fixed at 1.0".to_string(),
        },
        ModelPreset {
            name: "deepseek".to_string(),
            display_name: "DeepSeek".to_string(),
            description: "Fast general-purpose chat with tool calling".to_string(),
        },
        ModelPreset {
            name: "gemini-2.5-pro".to_string(),
            display_name: "Gemini 2.5 Pro".to_string(),
            description: "Long-context general model".to_string(),
        },
        ModelPreset {
            name: "grok-4-fast".to_string(),
            display_name: "Grok 4 Fast".to_string(),
            description: "Low-latency general model".to_string(),
        },
    ]
}

/// Find a model preset by name
pub fn find_preset(name: &str) -> Option<ModelPreset> {
    get_model_presets().into_iter().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_by_exact_name() {
        assert_eq!(ModelFamily::of("gpt-5"), ModelFamily::Reasoning);
        assert_eq!(ModelFamily::of("gpt-5-mini"), ModelFamily::General);
        assert_eq!(ModelFamily::of("GPT-5"), ModelFamily::General);
    }

    #[test]
    fn test_family_rules() {
        assert_eq!(ModelFamily::Reasoning.temperature(0.2), 1.0);
        assert_eq!(ModelFamily::General.temperature(0.2), 0.2);
        assert_eq!(
            ModelFamily::Reasoning.token_limit_field(),
            "max_completion_tokens"
        );
        assert_eq!(ModelFamily::General.token_limit_field(), "max_tokens");
    }

    #[test]
    fn test_find_preset() {
        assert!(find_preset("gpt-5").is_some());
        assert!(find_preset("nonexistent").is_none());
    }
}
