//! Decoder configuration types
//!
//! Tree reconstruction itself has no knobs; the options here only control the
//! optional expression annotation pass.

use serde::{Deserialize, Serialize};

/// Configuration for the decoder library
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecoderConfig {
    /// Whether to run the expression annotation pass
    #[serde(default = "default_true")]
    pub annotate_expressions: bool,

    /// Only events whose expression id is strictly above this are annotated
    #[serde(default = "default_min_expr_id")]
    pub min_expr_id: i64,

    /// Annotate events in parallel (output is identical to the sequential pass)
    #[serde(default)]
    pub parallel_annotation: bool,
}

fn default_true() -> bool {
    true
}

/// Expression ids up to this value are reserved by the solver for "no expression"
fn default_min_expr_id() -> i64 {
    2
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            annotate_expressions: default_true(),
            min_expr_id: default_min_expr_id(),
            parallel_annotation: false,
        }
    }
}

impl DecoderConfig {
    /// Create a new decoder configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: enable or disable expression annotation
    pub fn with_annotation(mut self, enabled: bool) -> Self {
        self.annotate_expressions = enabled;
        self
    }

    /// Builder method: set the reserved expression id threshold
    pub fn with_min_expr_id(mut self, threshold: i64) -> Self {
        self.min_expr_id = threshold;
        self
    }

    /// Builder method: annotate events in parallel
    pub fn with_parallel_annotation(mut self, enabled: bool) -> Self {
        self.parallel_annotation = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_config_builder() {
        let config = DecoderConfig::new()
            .with_annotation(false)
            .with_min_expr_id(5)
            .with_parallel_annotation(true);

        assert!(!config.annotate_expressions);
        assert_eq!(config.min_expr_id, 5);
        assert!(config.parallel_annotation);
    }

    #[test]
    fn test_defaults() {
        let config = DecoderConfig::new();
        assert!(config.annotate_expressions);
        assert_eq!(config.min_expr_id, 2);
        assert!(!config.parallel_annotation);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: DecoderConfig = serde_json::from_str(r#"{"parallel_annotation": true}"#).unwrap();
        assert!(config.annotate_expressions);
        assert_eq!(config.min_expr_id, 2);
        assert!(config.parallel_annotation);
    }
}
