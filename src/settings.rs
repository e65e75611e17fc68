use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio::AiffFormat;
use crate::looper::LooperConfig;
use crate::render::Theme;

/// Returns the path to the settings file: `~/.config/looprec/settings.json`
fn settings_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("looprec");
    path.push("settings.json");
    path
}

/// Startup configuration.
///
/// Read once from JSON in the platform config directory and never written
/// back. Fields use `#[serde(default)]` so that a partial file only
/// overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Audio
    pub block_size: usize,
    pub channels: u16,
    pub input_gain: f32,
    /// Hear the input through the output device
    pub monitor_input: bool,

    // Export
    pub bits_per_sample: u16,
    pub export_file_name: String,

    // Display
    pub waveform_gain: f32,
    pub theme: Theme,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            block_size: 512,
            channels: 1,
            input_gain: 10.0,
            monitor_input: false,

            bits_per_sample: 16,
            export_file_name: "loop.aiff".to_string(),

            waveform_gain: 20.0,
            theme: Theme::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, falling back to defaults on any error.
    pub fn load() -> Self {
        Self::load_from(&settings_path())
    }

    fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Self>(&contents) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings.validated()
                }
                Err(e) => {
                    log::warn!("Failed to parse settings ({}), using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                log::info!("No settings file found ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// Replace out-of-range values with defaults
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.block_size == 0 {
            log::warn!("block_size must be positive, using {}", defaults.block_size);
            self.block_size = defaults.block_size;
        }
        if !(1..=2).contains(&self.channels) {
            log::warn!("channels must be 1 or 2, using {}", defaults.channels);
            self.channels = defaults.channels;
        }
        if !AiffFormat::SUPPORTED_BITS.contains(&self.bits_per_sample) {
            log::warn!(
                "Unsupported bits_per_sample {}, using {}",
                self.bits_per_sample,
                defaults.bits_per_sample
            );
            self.bits_per_sample = defaults.bits_per_sample;
        }
        if !self.input_gain.is_finite() || self.input_gain <= 0.0 {
            log::warn!("input_gain must be positive, using {}", defaults.input_gain);
            self.input_gain = defaults.input_gain;
        }
        if !self.waveform_gain.is_finite() || self.waveform_gain <= 0.0 {
            log::warn!("waveform_gain must be positive, using {}", defaults.waveform_gain);
            self.waveform_gain = defaults.waveform_gain;
        }
        if self.export_file_name.trim().is_empty() {
            self.export_file_name = defaults.export_file_name;
        }
        self
    }

    /// Looper configuration for a device running at `sample_rate`
    pub fn looper_config(&self, sample_rate: u32) -> LooperConfig {
        LooperConfig {
            block_size: self.block_size,
            channels: self.channels,
            sample_rate,
            bits_per_sample: self.bits_per_sample,
            waveform_gain: self.waveform_gain,
            export_file_name: self.export_file_name.clone(),
            theme: self.theme,
            monitor_input: self.monitor_input,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Rgb;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings: Settings =
            serde_json::from_str(r##"{ "block_size": 1024, "theme": { "playback": "#0f0" } }"##).unwrap();
        assert_eq!(settings.block_size, 1024);
        assert_eq!(settings.channels, 1);
        assert_eq!(settings.theme.playback, Rgb(0, 0xff, 0));
        assert_eq!(settings.theme.base, Theme::default().base);
    }

    #[test]
    fn test_validation_replaces_bad_values() {
        let settings = Settings {
            block_size: 0,
            channels: 6,
            bits_per_sample: 12,
            input_gain: -1.0,
            waveform_gain: f32::NAN,
            export_file_name: " ".to_string(),
            ..Settings::default()
        }
        .validated();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings = Settings::load_from(Path::new("/nonexistent/looprec/settings.json"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_looper_config() {
        let config = Settings::default().looper_config(48000);
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.block_len(), 512);
        assert_eq!(config.export_file_name, "loop.aiff");
        assert!(!config.monitor_input);

        let settings: Settings = serde_json::from_str(r#"{ "monitor_input": true }"#).unwrap();
        assert!(settings.looper_config(48000).monitor_input);
    }
}
