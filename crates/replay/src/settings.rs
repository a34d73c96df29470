//! Layered configuration: preset, then config file, then environment

use anyhow::{anyhow, Context};
use config::{Config, Environment, File};
use dms::DmsConfig;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Raw settings as read from file and environment
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Named preset the overrides are applied on top of
    pub preset: Option<String>,
    pub dms: DmsOverrides,
}

/// Per-field overrides of the preset
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DmsOverrides {
    pub eye_open_threshold: Option<f32>,
    pub mild_after_ms: Option<u64>,
    pub severe_after_ms: Option<u64>,
}

impl DmsOverrides {
    fn apply(&self, config: &mut DmsConfig) {
        if let Some(threshold) = self.eye_open_threshold {
            config.eye_open_threshold = threshold;
        }
        if let Some(ms) = self.mild_after_ms {
            config.mild_after_ms = ms;
        }
        if let Some(ms) = self.severe_after_ms {
            config.severe_after_ms = ms;
        }
    }
}

/// Read settings from an optional file plus `EYEWATCH__*` variables
/// (e.g. `EYEWATCH__DMS__MILD_AFTER_MS=2500`).
pub fn read_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path));
    }

    builder
        .add_source(
            Environment::with_prefix("EYEWATCH")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .and_then(|c| c.try_deserialize())
        .context("Failed to read settings")
}

/// Resolve the monitor configuration. A preset given on the command line
/// wins over one named in the settings.
pub fn resolve(settings: &Settings, preset: Option<&str>) -> anyhow::Result<DmsConfig> {
    let name = preset
        .or(settings.preset.as_deref())
        .unwrap_or("default");
    let mut config = DmsConfig::preset(name).ok_or_else(|| anyhow!("Unknown preset: {name}"))?;

    settings.dms.apply(&mut config);
    config.validate()?;

    debug!(?config, preset = name, "Resolved DMS configuration");
    Ok(config)
}

/// [`read_settings`] followed by [`resolve`]
pub fn load_config(path: Option<&Path>, preset: Option<&str>) -> anyhow::Result<DmsConfig> {
    let settings = read_settings(path)?;
    resolve(&settings, preset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_sources() {
        let config = resolve(&Settings::default(), None).unwrap();
        assert_eq!(config, DmsConfig::default());
    }

    #[test]
    fn test_file_overrides_preset() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "preset = \"strict\"\n\n[dms]\nmild_after_ms = 2500").unwrap();

        let settings = read_settings(Some(file.path())).unwrap();
        let config = resolve(&settings, None).unwrap();

        assert_eq!(config.mild_after_ms, 2500);
        assert_eq!(config.severe_after_ms, DmsConfig::strict().severe_after_ms);
    }

    #[test]
    fn test_cli_preset_wins() {
        let settings = Settings {
            preset: Some("strict".into()),
            ..Default::default()
        };
        let config = resolve(&settings, Some("lenient")).unwrap();
        assert_eq!(config, DmsConfig::lenient());
    }

    #[test]
    fn test_invalid_overrides_rejected() {
        let settings = Settings {
            dms: DmsOverrides {
                mild_after_ms: Some(10_000),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(resolve(&settings, None).is_err());
        assert!(resolve(&Settings::default(), Some("drowsy")).is_err());
    }
}
