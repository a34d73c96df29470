//! DMS configuration

use serde::{Deserialize, Serialize};

use crate::DmsError;

/// DMS configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Openness probability above which an eye counts as open
    pub eye_open_threshold: f32,

    /// Closed duration that raises the mild alert (milliseconds)
    pub mild_after_ms: u64,

    /// Closed duration that raises the severe alert (milliseconds)
    pub severe_after_ms: u64,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            eye_open_threshold: 0.5,
            mild_after_ms: 3000,
            severe_after_ms: 8000,
        }
    }
}

impl DmsConfig {
    /// Create strict config (lower thresholds)
    pub fn strict() -> Self {
        Self {
            mild_after_ms: 2000,
            severe_after_ms: 5000,
            ..Default::default()
        }
    }

    /// Create lenient config (higher thresholds)
    pub fn lenient() -> Self {
        Self {
            mild_after_ms: 4000,
            severe_after_ms: 12000,
            ..Default::default()
        }
    }

    /// Look up a named preset
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default()),
            "strict" => Some(Self::strict()),
            "lenient" => Some(Self::lenient()),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), DmsError> {
        if !(0.0..=1.0).contains(&self.eye_open_threshold) {
            return Err(DmsError::Config(format!(
                "eye_open_threshold {} is outside [0, 1]",
                self.eye_open_threshold
            )));
        }
        if self.mild_after_ms >= self.severe_after_ms {
            return Err(DmsError::Config(format!(
                "mild_after_ms ({}) must be below severe_after_ms ({})",
                self.mild_after_ms, self.severe_after_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        for name in ["default", "strict", "lenient"] {
            let config = DmsConfig::preset(name).unwrap();
            assert!(config.validate().is_ok(), "{name} preset is invalid");
        }
        assert!(DmsConfig::preset("paranoid").is_none());
    }

    #[test]
    fn test_rejects_inverted_bands() {
        let config = DmsConfig {
            mild_after_ms: 8000,
            severe_after_ms: 3000,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DmsError::Config(_))));
    }

    #[test]
    fn test_rejects_threshold_out_of_range() {
        let config = DmsConfig {
            eye_open_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
