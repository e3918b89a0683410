use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;

use audio_wave::{
    load_audio, AudioFetcher, Envelope, MediaClock, SoftwareClock, SymphoniaDecoder, WaveConfig,
    WaveSession,
};

/// Waveform envelope extraction and synced playback for audio files and URLs.
#[derive(Parser, Debug)]
#[command(name = "audio-wave")]
#[command(about = "Extract an audio waveform envelope and drive playback against it")]
struct Args {
    /// Audio file path or http(s) URL
    source: String,

    /// JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of envelope buckets (overrides the settings file)
    #[arg(short, long)]
    samples: Option<usize>,

    /// Print the envelope as JSON instead of bars
    #[arg(long)]
    json: bool,

    /// Play for this many seconds after loading
    #[arg(long)]
    play: Option<f64>,

    /// Start position in seconds when playing
    #[arg(long)]
    start: Option<f64>,

    /// Volume in [0, 1]
    #[arg(long)]
    volume: Option<f32>,

    /// Playback rate in [0.25, 4]
    #[arg(long)]
    rate: Option<f32>,

    /// Loop at the end of the media
    #[arg(long = "loop")]
    looping: bool,

    /// Play through the default output device instead of a silent clock
    #[cfg(feature = "audio-output")]
    #[arg(long)]
    output: bool,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::init();

    #[cfg(feature = "audio-output")]
    install_alsa_panic_hook();

    let args = Args::parse();

    let mut config = args
        .config
        .as_deref()
        .map(WaveConfig::load)
        .unwrap_or_default();
    if let Some(samples) = args.samples {
        config.samples = samples;
    }
    if let Some(volume) = args.volume {
        config.volume = volume;
    }
    if let Some(rate) = args.rate {
        config.playback_rate = rate;
    }
    config.looping |= args.looping;

    let Some(seconds) = args.play else {
        let loaded = load_audio(
            &args.source,
            &AudioFetcher::new(),
            Arc::new(SymphoniaDecoder),
            config.samples,
        )
        .await
        .with_context(|| format!("Failed to load {}", args.source))?;

        print_envelope(&args, &loaded.envelope, loaded.duration())?;
        return Ok(());
    };

    #[cfg(feature = "audio-output")]
    if args.output {
        let clock = audio_wave::playback::CpalClock::new().map_err(anyhow::Error::msg)?;
        return run_session(&args, config, clock, seconds).await;
    }

    run_session(&args, config, SoftwareClock::new(), seconds).await
}

async fn run_session<C: MediaClock + 'static>(
    args: &Args,
    config: WaveConfig,
    clock: C,
    seconds: f64,
) -> Result<(), anyhow::Error> {
    if !seconds.is_finite() || seconds < 0.0 {
        bail!("--play expects a non-negative number of seconds");
    }

    let mut session = WaveSession::attach(
        config,
        Some(clock),
        &args.source,
        Arc::new(AudioFetcher::new()),
        Arc::new(SymphoniaDecoder),
    );

    let state = session.wait_until_loaded().await;
    if state.has_error {
        bail!("Failed to load {}", args.source);
    }
    if let Some(envelope) = session.envelope() {
        print_envelope(args, &envelope, state.duration)?;
    }

    session.play(args.start);

    let deadline = tokio::time::Instant::now() + Duration::from_secs_f64(seconds);
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => break,
            _ = ticker.tick() => {
                let state = session.state();
                eprintln!("{} [{}]", state.progress_text(), state.status_text());
            }
        }
    }

    session.teardown();
    eprintln!("{}", session.state().progress_text());
    Ok(())
}

fn print_envelope(args: &Args, envelope: &Envelope, duration: f64) -> Result<(), anyhow::Error> {
    if args.json {
        let out = serde_json::json!({
            "source": args.source,
            "duration": duration,
            "envelope": envelope,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    const BAR_WIDTH: f32 = 40.0;
    for value in envelope.values() {
        let len = (value * BAR_WIDTH).round() as usize;
        println!("{:>5.3} {}", value, "█".repeat(len));
    }
    println!("{} buckets, {:.2}s", envelope.len(), duration);
    Ok(())
}

/// cpal's ALSA backend can panic on timestamp queries; log those instead of
/// aborting playback.
#[cfg(feature = "audio-output")]
fn install_alsa_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let panic_msg = format!("{:?}", panic_info);
        if panic_msg.contains("get_htstamp") || panic_msg.contains("get_trigger_htstamp") {
            log::warn!("ALSA timing issue detected (known cpal bug), ignoring...");
            return;
        }
        default_hook(panic_info);
    }));
}
