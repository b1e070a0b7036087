use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sightline::detect::{AllowList, Detector, HttpDetector};
use sightline::vision::{CameraSource, FrameSource};
use sightline::voice::{
    AudioCapture, AudioPlayback, CloudSpeaker, ConsoleListener, ConsoleSpeaker, MicListener,
    OpenAiTts, Speaker, WhisperStt, rms,
};
use sightline::{Config, Daemon};

/// Sightline - voice-driven visual assistant
#[derive(Parser)]
#[command(name = "sightline", version, about)]
struct Cli {
    /// Config file (default: ~/.config/sightline/config.toml)
    #[arg(short, long, env = "SIGHTLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Camera device, e.g. /dev/video0 or stub://desk
    #[arg(long)]
    camera: Option<String>,

    /// Use stdin/stdout instead of microphone and speakers
    #[arg(long)]
    text: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// Capture frames and report timing
    TestCamera {
        /// Number of frames to capture
        #[arg(short, long, default_value = "10")]
        frames: u64,
    },
    /// Capture one frame and print what the detector sees
    DetectOnce,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info",
        1 => "info,sightline=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(camera) = cli.camera {
        config.camera.device = camera;
    }
    tracing::debug!(?config, "loaded configuration");

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker(),
            Command::TestTts { text } => test_tts(&config, &text).await,
            Command::TestCamera { frames } => test_camera(&config, frames).await,
            Command::DetectOnce => detect_once(&config).await,
        };
    }

    let daemon = Daemon::new(config.clone());
    if cli.text {
        tracing::info!("text mode: type commands, Ctrl-D to quit");
        daemon.run(ConsoleListener::new(), ConsoleSpeaker).await?;
    } else {
        let api_key = openai_key(&config)?;
        let stt = WhisperStt::new(api_key.clone(), config.voice.stt_model.clone())?;
        let listener = MicListener::new(AudioCapture::new()?, stt);
        let speaker = CloudSpeaker::new(
            OpenAiTts::new(api_key, &config.voice)?,
            AudioPlayback::new()?,
        );
        daemon.run(listener, speaker).await?;
    }

    Ok(())
}

fn openai_key(config: &Config) -> anyhow::Result<String> {
    config
        .api_keys
        .openai
        .clone()
        .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY is required for voice mode (or use --text)"))
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.drain();
        let energy = rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]", i + 1);
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Run: pactl info | grep 'Default Source'");
    println!("  2. Run: arecord -l (to list devices)");

    Ok(())
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    AudioPlayback::new()?.play_tone(440.0, Duration::from_secs(2))?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If not, run: pactl list sinks short");

    Ok(())
}

/// Speak a sentence through the configured TTS
#[allow(clippy::future_not_send)]
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let tts = OpenAiTts::new(openai_key(config)?, &config.voice)?;
    let mut speaker = CloudSpeaker::new(tts, AudioPlayback::new()?);
    speaker.speak(text).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}

/// Capture frames and print sequence numbers and timing
async fn test_camera(config: &Config, frames: u64) -> anyhow::Result<()> {
    let mut source = CameraSource::open(&config.camera)?;
    println!("Testing camera {} for {frames} frames...\n", source.name());

    let report = tokio::task::spawn_blocking(move || -> sightline::Result<Vec<String>> {
        source.connect()?;
        let start = Instant::now();
        let mut lines = Vec::new();
        for _ in 0..frames {
            let before = Instant::now();
            let frame = source.next_frame()?;
            lines.push(format!(
                "frame #{:<4} {}x{} in {:>4} ms (t+{} ms)",
                frame.sequence(),
                frame.width(),
                frame.height(),
                before.elapsed().as_millis(),
                start.elapsed().as_millis()
            ));
        }
        Ok(lines)
    })
    .await??;

    for line in report {
        println!("{line}");
    }
    Ok(())
}

/// Capture one frame, run the detector, print allowed detections with boxes
async fn detect_once(config: &Config) -> anyhow::Result<()> {
    let mut source = CameraSource::open(&config.camera)?;
    let frame = tokio::task::spawn_blocking(move || {
        source.connect()?;
        source.next_frame()
    })
    .await??;

    let detector = HttpDetector::new(
        config.detection.endpoint.clone(),
        config.detection.request_timeout,
    )?;
    let allow = AllowList::new(&config.detection.relevant_labels);
    let detections = detector.detect(&frame).await?;

    println!("frame #{} ({}x{})", frame.sequence(), frame.width(), frame.height());
    let mut shown = 0usize;
    for detection in detections.iter().filter(|d| allow.contains(&d.label)) {
        shown += 1;
        match detection.bbox {
            Some(b) => println!(
                "  {:<12} {:.2}  [{:.0}, {:.0}, {:.0}, {:.0}]",
                detection.label, detection.confidence, b.x1, b.y1, b.x2, b.y2
            ),
            None => println!("  {:<12} {:.2}", detection.label, detection.confidence),
        }
    }
    println!("{shown} allowed of {} detections", detections.len());

    Ok(())
}
