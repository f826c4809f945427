//! Stream settings and preset management for warble.
//!
//! This crate stores the configuration of a [`warble_core::Stream`] as
//! TOML: the stream format plus the speed, pitch, rate, volume, chord and
//! quality parameters.
//!
//! # Features
//!
//! - **Settings files**: Load and save [`StreamSettings`] as TOML
//! - **Validation**: Range checks tighter than the stream's own
//! - **Factory Presets**: Built-in settings for common transformations
//!
//! # Example
//!
//! ```rust,no_run
//! use warble_config::{StreamSettings, get_factory_preset};
//!
//! let mut settings = get_factory_preset("double_time").unwrap();
//! settings.channels = 2;
//! settings.save("presets/double_stereo.toml").unwrap();
//!
//! let loaded = StreamSettings::load("presets/double_stereo.toml").unwrap();
//! let mut stream = loaded.build_stream().unwrap();
//! stream.write(&[0i16; 2048]).unwrap();
//! ```

mod error;
mod settings;

/// Range validation for stream settings.
pub mod validation;

/// Factory presets bundled with the library.
pub mod factory_presets;

pub use error::ConfigError;
pub use factory_presets::{
    FACTORY_PRESET_NAMES, factory_preset_names, factory_presets, get_factory_preset,
    is_factory_preset, require_factory_preset,
};
pub use settings::{QualitySetting, StreamSettings};
pub use validation::{ValidationError, ValidationResult, validate_settings};
