//! Factory presets bundled with warble.
//!
//! These presets are embedded at compile time, so they are always available
//! without any files on disk. They cover the common speed, pitch and rate
//! combinations and serve as starting points for user presets.

use crate::{ConfigError, StreamSettings};

/// Array of factory preset names for external access.
pub static FACTORY_PRESET_NAMES: &[&str] = &[
    "identity",
    "double_time",
    "half_time",
    "chipmunk",
    "deep_voice",
    "tape_fast",
    "chorus_fifth",
];

static FACTORY_PRESETS_TOML: &[(&str, &str)] = &[
    ("identity", IDENTITY_PRESET),
    ("double_time", DOUBLE_TIME_PRESET),
    ("half_time", HALF_TIME_PRESET),
    ("chipmunk", CHIPMUNK_PRESET),
    ("deep_voice", DEEP_VOICE_PRESET),
    ("tape_fast", TAPE_FAST_PRESET),
    ("chorus_fifth", CHORUS_FIFTH_PRESET),
];

const IDENTITY_PRESET: &str = r#"
name = "Identity"
description = "Bit-exact passthrough"
"#;

const DOUBLE_TIME_PRESET: &str = r#"
name = "Double Time"
description = "Twice as fast, same pitch"
speed = 2.0
"#;

const HALF_TIME_PRESET: &str = r#"
name = "Half Time"
description = "Half speed, same pitch"
speed = 0.5
quality = "high"
"#;

const CHIPMUNK_PRESET: &str = r#"
name = "Chipmunk"
description = "An octave up at the original tempo"
pitch = 2.0
"#;

const DEEP_VOICE_PRESET: &str = r#"
name = "Deep Voice"
description = "A fifth down at the original tempo"
pitch = 0.667
quality = "high"
"#;

const TAPE_FAST_PRESET: &str = r#"
name = "Tape Fast"
description = "Tape running 25% fast: shorter and higher"
rate = 1.25
"#;

const CHORUS_FIFTH_PRESET: &str = r#"
name = "Chorus Fifth"
description = "Original voice layered with a fifth above"
pitch = 1.5
chord_pitch = true
volume = 0.9
"#;

/// Get all factory presets.
///
/// # Example
///
/// ```rust
/// use warble_config::factory_presets;
///
/// for preset in factory_presets() {
///     println!("{}: {}", preset.name, preset.description.as_deref().unwrap_or(""));
/// }
/// ```
pub fn factory_presets() -> Vec<StreamSettings> {
    FACTORY_PRESETS_TOML
        .iter()
        .filter_map(|(_, toml)| StreamSettings::from_toml(toml).ok())
        .collect()
}

/// Get a factory preset by internal or display name, case-insensitively.
///
/// # Example
///
/// ```rust
/// use warble_config::get_factory_preset;
///
/// let preset = get_factory_preset("double_time").unwrap();
/// assert_eq!(preset.speed, 2.0);
/// assert!(get_factory_preset("Double Time").is_some());
/// ```
pub fn get_factory_preset(name: &str) -> Option<StreamSettings> {
    let name_lower = name.to_lowercase();

    FACTORY_PRESETS_TOML.iter().find_map(|(id, toml)| {
        let preset = StreamSettings::from_toml(toml).ok()?;
        (id.eq_ignore_ascii_case(name) || preset.name.to_lowercase() == name_lower)
            .then_some(preset)
    })
}

/// Like [`get_factory_preset`], but a missing name is an error.
pub fn require_factory_preset(name: &str) -> Result<StreamSettings, ConfigError> {
    get_factory_preset(name).ok_or_else(|| ConfigError::PresetNotFound(name.to_string()))
}

/// Get the internal names of all factory presets.
pub fn factory_preset_names() -> Vec<&'static str> {
    FACTORY_PRESETS_TOML.iter().map(|(name, _)| *name).collect()
}

/// Check if a name matches a factory preset (case-insensitive).
///
/// ```rust
/// use warble_config::is_factory_preset;
///
/// assert!(is_factory_preset("chipmunk"));
/// assert!(is_factory_preset("Deep Voice"));
/// assert!(!is_factory_preset("my_custom_preset"));
/// ```
pub fn is_factory_preset(name: &str) -> bool {
    get_factory_preset(name).is_some()
}
