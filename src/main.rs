use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use visage::audio::{AudioCapture, AudioPlayback, CAPTURE_SAMPLE_RATE, calculate_rms};
use visage::lipsync::{BlendshapeExtractor, BlendshapeSink, HttpExtractor, LipSyncRenderer};
use visage::{AudioClip, Config, ConversationOrchestrator, ResponseGenerator, Synthesizer, Transcriber};

/// Visage - conversational voice pipeline for virtual human avatars
#[derive(Parser)]
#[command(name = "visage", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Capture microphone audio and print the transcript
    Listen {
        /// Capture duration in seconds
        #[arg(short, long)]
        duration: Option<u64>,
    },
    /// Generate a reply to the given text
    Respond {
        /// User text
        text: String,
        /// Optional context line for the prompt
        #[arg(short, long, default_value = "")]
        context: String,
    },
    /// Synthesize text to speech and play it
    Speak {
        /// Text to synthesize
        text: String,
        /// Output file name under the TTS output directory
        #[arg(short, long, default_value = "response.wav")]
        output: String,
    },
    /// Render a lip-synced video for an audio file and push blendshapes
    LipSync {
        /// Input audio file (WAV)
        audio: PathBuf,
        /// Skip pushing blendshapes to the render engine
        #[arg(long)]
        no_send: bool,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,visage=info",
        1 => "info,visage=debug",
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

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env();

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Listen { duration } => listen(&config, duration).await,
            Command::Respond { text, context } => respond(&config, &text, &context).await,
            Command::Speak { text, output } => speak(&config, &text, &output).await,
            Command::LipSync { audio, no_send } => lip_sync(&config, &audio, no_send).await,
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker(),
        };
    }

    run_turn(config).await
}

/// Run one conversational turn, then the lip-sync chain when configured
async fn run_turn(config: Config) -> anyhow::Result<()> {
    config.validate_voice()?;

    let lipsync_configured = config.lipsync_configured();
    let orchestrator = ConversationOrchestrator::new(config.clone())?;
    let report = orchestrator.run_turn().await?;

    println!("You said: {}", report.transcript.text);
    println!("Reply: {}", report.reply.text);

    let (Some(reply_audio), true) = (report.reply_audio, lipsync_configured) else {
        return Ok(());
    };

    let extractor = config
        .lipsync
        .extractor_url
        .clone()
        .map(|url| Box::new(HttpExtractor::new(url)) as Box<dyn BlendshapeExtractor>);
    let renderer = LipSyncRenderer::new(&config.lipsync, extractor)?;
    let outcome = renderer.render(&reply_audio).await?;
    println!("Rendered video: {}", outcome.video.display());

    if let Some(path) = outcome.blendshapes {
        let sink = BlendshapeSink::new(config.sink_url);
        sink.send_file(&path).await?;
    }

    Ok(())
}

/// Capture + transcribe
async fn listen(config: &Config, duration: Option<u64>) -> anyhow::Result<()> {
    let api_key = config.require_api_key()?.to_string();
    let transcriber = Transcriber::new(api_key, &config.asr)?;

    let duration = duration.map_or(config.asr.capture_duration, Duration::from_secs);
    println!("Listening for {} seconds...", duration.as_secs());

    let capture = AudioCapture::new(CAPTURE_SAMPLE_RATE)?;
    let clip = capture.record(duration, &config.asr.capture_file)?;
    let transcript = transcriber.transcribe(&clip).await?;

    println!("Transcription: {}", transcript.text);
    Ok(())
}

/// Generate a reply
async fn respond(config: &Config, text: &str, context: &str) -> anyhow::Result<()> {
    let api_key = config.require_api_key()?.to_string();
    let generator = ResponseGenerator::new(api_key, &config.nlp)?;

    let reply = generator.generate(text, context).await;
    if !reply.is_model_output() {
        tracing::warn!(origin = ?reply.origin, "returned a fallback reply");
    }
    println!("{}", reply.text);
    Ok(())
}

/// Synthesize + play
async fn speak(config: &Config, text: &str, output: &str) -> anyhow::Result<()> {
    let api_key = config.require_api_key()?.to_string();
    let synthesizer = Synthesizer::new(api_key, &config.tts)?;

    let clip = synthesizer.synthesize(text, output).await?;
    println!("Audio file generated: {}", clip.path.display());

    let playback = AudioPlayback::new()?;
    playback.play(&clip)?;
    Ok(())
}

/// Render + extract + push
async fn lip_sync(config: &Config, audio: &Path, no_send: bool) -> anyhow::Result<()> {
    config.validate_lipsync()?;

    let clip = AudioClip::open(audio)?;
    let extractor = config
        .lipsync
        .extractor_url
        .clone()
        .map(|url| Box::new(HttpExtractor::new(url)) as Box<dyn BlendshapeExtractor>);
    let renderer = LipSyncRenderer::new(&config.lipsync, extractor)?;

    let outcome = renderer.render(&clip).await?;
    println!("Rendered video: {}", outcome.video.display());

    match outcome.blendshapes {
        Some(path) if !no_send => {
            let sink = BlendshapeSink::new(config.sink_url.clone());
            sink.send_file(&path).await?;
            println!("Blendshapes pushed to {}", sink.endpoint());
        }
        Some(path) => println!("Blendshapes written to {}", path.display()),
        None => println!("No extractor configured; blendshape step skipped"),
    }

    Ok(())
}

/// Test microphone input
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let capture = AudioCapture::new(CAPTURE_SAMPLE_RATE)?;
    println!("Sample rate: {} Hz", capture.sample_rate());
    println!("---");

    let dir = std::env::temp_dir();
    for i in 0..duration {
        let path = dir.join(format!("visage_mic_test_{i}.wav"));
        let clip = capture.record(Duration::from_secs(1), &path)?;
        let samples = clip.read_samples()?;
        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]", i + 1, energy, peak, meter);
        tokio::fs::remove_file(&path).await.ok();
    }

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    Ok(())
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;

    let sample_rate = 24000_u32;
    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let num_samples = (sample_rate as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    playback.play_samples(&samples, sample_rate)?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    Ok(())
}
