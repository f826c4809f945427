//! Stream settings file format and operations.

use serde::{Deserialize, Serialize};
use std::path::Path;

use warble_core::{Quality, Stream, StreamParams};

use crate::error::ConfigError;
use crate::validation::{ValidationResult, validate_settings};

/// Serialized form of [`Quality`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualitySetting {
    /// Decimated period search, linear interpolation.
    #[default]
    Fast,
    /// Full-resolution period search, cubic interpolation.
    High,
}

impl From<QualitySetting> for Quality {
    fn from(q: QualitySetting) -> Self {
        match q {
            QualitySetting::Fast => Quality::Fast,
            QualitySetting::High => Quality::High,
        }
    }
}

impl From<Quality> for QualitySetting {
    fn from(q: Quality) -> Self {
        match q {
            Quality::Fast => QualitySetting::Fast,
            Quality::High => QualitySetting::High,
        }
    }
}

/// A named, serializable stream configuration.
///
/// Every field except `name` is optional in TOML and falls back to an
/// untouched 44.1 kHz mono stream.
///
/// # TOML Format
///
/// ```toml
/// name = "Podcast 1.5x"
/// description = "Faster speech, same voice"
/// sample_rate = 44100
/// channels = 2
/// speed = 1.5
/// quality = "high"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamSettings {
    /// Name of the preset.
    pub name: String,

    /// Optional description of the preset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Sample rate in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Interleaved channel count.
    #[serde(default = "default_channels")]
    pub channels: usize,

    /// Tempo factor.
    #[serde(default = "unity")]
    pub speed: f32,

    /// Pitch factor.
    #[serde(default = "unity")]
    pub pitch: f32,

    /// Playback rate factor.
    #[serde(default = "unity")]
    pub rate: f32,

    /// Output gain.
    #[serde(default = "unity")]
    pub volume: f32,

    /// Layer the shifted voice over the original.
    #[serde(default)]
    pub chord_pitch: bool,

    /// Period search and interpolation quality.
    #[serde(default)]
    pub quality: QualitySetting,
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_channels() -> usize {
    1
}

fn unity() -> f32 {
    1.0
}

impl StreamSettings {
    /// Create settings for an untouched 44.1 kHz mono stream.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            speed: 1.0,
            pitch: 1.0,
            rate: 1.0,
            volume: 1.0,
            chord_pitch: false,
            quality: QualitySetting::Fast,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the stream format.
    pub fn with_format(mut self, sample_rate: u32, channels: usize) -> Self {
        self.sample_rate = sample_rate;
        self.channels = channels;
        self
    }

    /// Copy the transformation parameters from `params`.
    pub fn with_params(mut self, params: &StreamParams) -> Self {
        self.speed = params.speed;
        self.pitch = params.pitch;
        self.rate = params.rate;
        self.volume = params.volume;
        self.chord_pitch = params.chord_pitch;
        self.quality = params.quality.into();
        self
    }

    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let settings = Self::from_toml(&content)?;
        tracing::debug!(
            "settings_load: '{}' from {}",
            settings.name,
            path.display()
        );
        Ok(settings)
    }

    /// Load settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the settings to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the settings to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every field against the accepted ranges.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_settings(self)
    }

    /// The transformation parameters, without the stream format.
    pub fn to_params(&self) -> StreamParams {
        StreamParams {
            speed: self.speed,
            pitch: self.pitch,
            rate: self.rate,
            volume: self.volume,
            chord_pitch: self.chord_pitch,
            quality: self.quality.into(),
        }
    }

    /// Validate, then create a stream configured with these settings.
    pub fn build_stream(&self) -> Result<Stream, ConfigError> {
        self.validate()?;
        let mut stream = Stream::new(self.sample_rate, self.channels)?;
        stream.set_params(&self.to_params())?;
        Ok(stream)
    }

    /// Validate, then apply the parameters to an existing stream.
    ///
    /// The stream's sample rate is left alone. Its channel count is changed
    /// only if it differs, which fails while samples are still buffered.
    pub fn apply_to(&self, stream: &mut Stream) -> Result<(), ConfigError> {
        self.validate()?;
        if stream.num_channels() != self.channels {
            stream.set_num_channels(self.channels)?;
        }
        stream.set_params(&self.to_params())?;
        Ok(())
    }
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_new_is_unity() {
        let settings = StreamSettings::new("Test");
        assert_eq!(settings.name, "Test");
        assert!(settings.description.is_none());
        assert_eq!(settings.sample_rate, 44100);
        assert_eq!(settings.channels, 1);
        assert_eq!(settings.to_params(), StreamParams::default());
    }

    #[test]
    fn test_settings_builder() {
        let params = StreamParams {
            speed: 1.5,
            quality: Quality::High,
            ..StreamParams::default()
        };
        let settings = StreamSettings::new("Fast talk")
            .with_description("Speech at 1.5x")
            .with_format(22050, 2)
            .with_params(&params);

        assert_eq!(settings.description.as_deref(), Some("Speech at 1.5x"));
        assert_eq!(settings.sample_rate, 22050);
        assert_eq!(settings.channels, 2);
        assert_eq!(settings.speed, 1.5);
        assert_eq!(settings.quality, QualitySetting::High);
        assert_eq!(settings.to_params(), params);
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let settings = StreamSettings::from_toml(r#"name = "Bare""#).unwrap();
        assert_eq!(settings, StreamSettings::new("Bare"));
    }

    #[test]
    fn test_quality_is_lowercase_in_toml() {
        let settings = StreamSettings {
            quality: QualitySetting::High,
            ..StreamSettings::default()
        };
        let toml_str = settings.to_toml().unwrap();
        assert!(toml_str.contains(r#"quality = "high""#), "got: {toml_str}");
    }

    #[test]
    fn test_unknown_quality_rejected() {
        let result = StreamSettings::from_toml(
            r#"
name = "Bad"
quality = "ultra"
"#,
        );
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_toml_roundtrip() {
        let original = StreamSettings::new("Chord")
            .with_description("Fifth above")
            .with_format(48000, 2);
        let original = StreamSettings {
            pitch: 1.5,
            chord_pitch: true,
            ..original
        };
        let parsed = StreamSettings::from_toml(&original.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_build_stream_applies_params() {
        let settings = StreamSettings {
            speed: 2.0,
            volume: 0.5,
            ..StreamSettings::default().with_format(16000, 2)
        };
        let stream = settings.build_stream().unwrap();
        assert_eq!(stream.sample_rate(), 16000);
        assert_eq!(stream.num_channels(), 2);
        assert_eq!(stream.speed(), 2.0);
        assert_eq!(stream.volume(), 0.5);
    }

    #[test]
    fn test_build_stream_rejects_out_of_range() {
        let settings = StreamSettings {
            rate: 0.0,
            ..StreamSettings::default()
        };
        assert!(matches!(
            settings.build_stream(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_apply_to_changes_channels_on_idle_stream() {
        let mut stream = Stream::new(44100, 1).unwrap();
        let settings = StreamSettings {
            pitch: 0.8,
            ..StreamSettings::default().with_format(44100, 2)
        };
        settings.apply_to(&mut stream).unwrap();
        assert_eq!(stream.num_channels(), 2);
        assert_eq!(stream.pitch(), 0.8);
    }

    #[test]
    fn test_apply_to_refuses_channel_change_with_pending_audio() {
        let mut stream = Stream::new(44100, 1).unwrap();
        stream.set_speed(1.5).unwrap();
        stream.write(&[100i16; 64]).unwrap();

        let settings = StreamSettings::default().with_format(44100, 2);
        assert!(matches!(
            settings.apply_to(&mut stream),
            Err(ConfigError::Stream(_))
        ));
        assert_eq!(stream.num_channels(), 1);
    }
}
