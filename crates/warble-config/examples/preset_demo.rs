//! Preset demo: factory presets, validation, and processing with settings.
//!
//! Run with: cargo run -p warble-config --example preset_demo

use warble_config::{
    ConfigError, StreamSettings, factory_preset_names, get_factory_preset, is_factory_preset,
};

fn main() -> Result<(), ConfigError> {
    // --- Factory presets ---
    println!("=== Factory Presets ===\n");

    println!(
        "{:<14} {:>6} {:>6} {:>6} {:>6}  {}",
        "Name", "speed", "pitch", "rate", "vol", "description"
    );
    println!("{:-<14} {:->6} {:->6} {:->6} {:->6}  {:-<30}", "", "", "", "", "", "");
    for name in factory_preset_names() {
        let Some(preset) = get_factory_preset(name) else {
            continue;
        };
        println!(
            "{:<14} {:>6.2} {:>6.2} {:>6.2} {:>6.2}  {}{}",
            name,
            preset.speed,
            preset.pitch,
            preset.rate,
            preset.volume,
            preset.description.as_deref().unwrap_or(""),
            if preset.chord_pitch { " (chord)" } else { "" }
        );
    }

    println!("\nIs 'chipmunk' a factory preset? {}", is_factory_preset("chipmunk"));
    println!("Is 'my_custom' a factory preset? {}", is_factory_preset("my_custom"));

    // --- Custom settings ---
    println!("\n=== Custom Settings ===\n");

    let settings = StreamSettings {
        speed: 1.4,
        pitch: 0.95,
        ..StreamSettings::new("Audiobook")
            .with_description("Faster narration, slightly lower voice")
            .with_format(22050, 1)
    };
    println!("--- Serialized TOML ---");
    println!("{}", settings.to_toml()?);

    let broken = StreamSettings {
        speed: 0.0,
        channels: 99,
        ..settings.clone()
    };
    if let Err(e) = broken.validate() {
        println!("Rejected: {e}\n");
    }

    // --- Processing ---
    println!("=== Processing ===\n");

    let mut stream = settings.build_stream()?;
    let input: Vec<i16> = (0..22050)
        .map(|n| ((std::f32::consts::TAU * 220.0 * n as f32 / 22050.0).sin() * 12_000.0) as i16)
        .collect();

    let mut produced = 0;
    let mut buf = vec![0i16; 1024];
    for chunk in input.chunks(2048) {
        stream.write(chunk)?;
        while let n @ 1.. = stream.read(&mut buf)? {
            produced += n;
        }
    }
    stream.flush()?;
    while let n @ 1.. = stream.read(&mut buf)? {
        produced += n;
    }

    println!("  Input:  {} samples (1.00 s)", input.len());
    println!(
        "  Output: {} samples ({:.2} s at speed {})",
        produced,
        produced as f32 / 22050.0,
        settings.speed
    );

    println!("\nPreset demo complete.");
    Ok(())
}
