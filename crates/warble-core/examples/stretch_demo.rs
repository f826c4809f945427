//! Stretch demo: stream a synthetic voice through several settings.
//!
//! Run with: RUST_LOG=debug cargo run -p warble-core --features tracing --example stretch_demo

use tracing_subscriber::EnvFilter;
use warble_core::{PeriodDetector, Quality, Stream, StreamError, StreamParams};

const SAMPLE_RATE: u32 = 22050;
const CHUNK_FRAMES: usize = 512;

/// One second of a vowel-like tone: 150 Hz fundamental plus two harmonics.
fn voice(seconds: f32) -> Vec<i16> {
    let frames = (SAMPLE_RATE as f32 * seconds) as usize;
    (0..frames)
        .map(|n| {
            let t = n as f32 / SAMPLE_RATE as f32;
            let tau = core::f32::consts::TAU;
            let s = libm::sinf(tau * 150.0 * t) * 0.6
                + libm::sinf(tau * 300.0 * t) * 0.25
                + libm::sinf(tau * 450.0 * t) * 0.1;
            (s * 20000.0) as i16
        })
        .collect()
}

/// Streams `input` in chunks and returns everything produced.
fn stream_through(params: &StreamParams, input: &[i16]) -> Result<Vec<i16>, StreamError> {
    let mut stream = Stream::new(SAMPLE_RATE, 1)?;
    stream.set_params(params)?;

    let mut out = Vec::with_capacity(input.len() * 4);
    let mut buf = vec![0i16; 4096];
    for chunk in input.chunks(CHUNK_FRAMES) {
        stream.write(chunk)?;
        loop {
            let n = stream.read(&mut buf)?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
    }
    stream.flush()?;
    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    Ok(out)
}

/// Median detected fundamental of `signal`, in Hz.
fn median_pitch(signal: &[i16]) -> Option<f32> {
    let mut detector = PeriodDetector::new(SAMPLE_RATE);
    let window = detector.window_frames();
    let mut periods: Vec<usize> = signal
        .chunks_exact(window)
        .map(|w| detector.detect(w, 1))
        .filter(|e| e.is_confident())
        .map(|e| e.period)
        .collect();
    periods.sort_unstable();
    periods
        .get(periods.len() / 2)
        .map(|&p| SAMPLE_RATE as f32 / p as f32)
}

fn main() -> Result<(), StreamError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let input = voice(1.0);
    tracing::info!(frames = input.len(), sample_rate = SAMPLE_RATE, "input");

    let settings = [
        ("identity", StreamParams::default()),
        ("double time", StreamParams { speed: 2.0, ..StreamParams::default() }),
        ("half time", StreamParams { speed: 0.5, quality: Quality::High, ..StreamParams::default() }),
        ("chipmunk", StreamParams { pitch: 1.6, ..StreamParams::default() }),
        ("deep voice", StreamParams { pitch: 0.7, ..StreamParams::default() }),
        ("tape fast", StreamParams { rate: 1.5, ..StreamParams::default() }),
        ("chorus fifth", StreamParams { pitch: 1.5, chord_pitch: true, ..StreamParams::default() }),
    ];

    println!("{:<14} {:>8} {:>10} {:>12}", "Setting", "Frames", "Seconds", "Pitch (Hz)");
    println!("{:-<14} {:->8} {:->10} {:->12}", "", "", "", "");

    for (name, params) in &settings {
        let out = stream_through(params, &input)?;
        let seconds = out.len() as f32 / SAMPLE_RATE as f32;
        let pitch = median_pitch(&out).map_or_else(|| "-".to_string(), |hz| format!("{hz:.1}"));
        println!("{name:<14} {:>8} {seconds:>10.3} {pitch:>12}", out.len());
    }

    Ok(())
}
