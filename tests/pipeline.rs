//! Conversational stage integration tests
//!
//! Tests the stage contracts without audio hardware or network access.

use std::time::Duration;

use visage::audio::{AudioClip, CAPTURE_SAMPLE_RATE, calculate_rms, samples_to_wav};
use visage::config::{AsrConfig, NlpConfig, TtsConfig};
use visage::nlp::build_prompt;
use visage::{Config, ResponseGenerator, Synthesizer, Transcriber};

/// Generate sine wave audio samples
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (CAPTURE_SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / CAPTURE_SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

fn test_asr_config() -> AsrConfig {
    AsrConfig {
        model: "whisper-1".to_string(),
        capture_duration: Duration::from_secs(5),
        capture_file: "captured_audio.wav".into(),
    }
}

fn test_nlp_config() -> NlpConfig {
    NlpConfig {
        model: "gpt-3.5-turbo-instruct".to_string(),
        max_tokens: 150,
        temperature: 0.7,
    }
}

fn test_tts_config(dir: &std::path::Path) -> TtsConfig {
    TtsConfig {
        model: "tts-1".to_string(),
        voice: "alloy".to_string(),
        speed: 1.0,
        output_dir: dir.to_path_buf(),
    }
}

#[test]
fn samples_to_wav_produces_riff_header() {
    let samples = generate_sine_samples(440.0, 0.1, 0.5);
    let wav_data = samples_to_wav(&samples, CAPTURE_SAMPLE_RATE).unwrap();

    assert_eq!(&wav_data[0..4], b"RIFF");
    assert_eq!(&wav_data[8..12], b"WAVE");
    assert!(wav_data.len() > 44); // WAV header is 44 bytes
}

#[test]
fn clip_open_reads_wav_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");

    let samples = generate_sine_samples(440.0, 0.5, 0.3);
    let wav_data = samples_to_wav(&samples, CAPTURE_SAMPLE_RATE).unwrap();
    std::fs::write(&path, wav_data).unwrap();

    let clip = AudioClip::open(&path).unwrap();
    assert_eq!(clip.sample_rate, CAPTURE_SAMPLE_RATE);
    assert_eq!(clip.channels, 1);
    assert!((clip.duration.as_secs_f32() - 0.5).abs() < 0.01);

    let read_back = clip.read_samples().unwrap();
    assert_eq!(read_back.len(), samples.len());
}

#[test]
fn clip_open_rejects_zero_sample_rate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("zero_rate.wav");

    // Patch the fmt chunk's sample rate and byte rate fields to 0
    let mut wav_data = samples_to_wav(&[0.0; 16], CAPTURE_SAMPLE_RATE).unwrap();
    wav_data[24..28].copy_from_slice(&[0; 4]);
    wav_data[28..32].copy_from_slice(&[0; 4]);
    std::fs::write(&path, wav_data).unwrap();

    let err = AudioClip::open(&path).unwrap_err();
    assert!(matches!(err, visage::Error::Playback(_)));
}

#[test]
fn clip_open_missing_file_is_not_found() {
    let err = AudioClip::open("/nonexistent/audio.wav").unwrap_err();
    assert!(matches!(err, visage::Error::NotFound(_)));
}

#[test]
fn rms_of_silence_is_zero() {
    assert_eq!(calculate_rms(&[]), 0.0);
    assert_eq!(calculate_rms(&[0.0; 1600]), 0.0);

    let tone = generate_sine_samples(440.0, 0.1, 0.5);
    assert!(calculate_rms(&tone) > 0.1);
}

#[tokio::test]
async fn transcribe_missing_file_fails_before_model_call() {
    let transcriber = Transcriber::new("test-key".to_string(), &test_asr_config()).unwrap();

    // A clip whose backing file was removed after creation
    let clip = AudioClip {
        path: "/nonexistent/captured.wav".into(),
        sample_rate: CAPTURE_SAMPLE_RATE,
        channels: 1,
        duration: Duration::from_secs(5),
    };

    let err = transcriber.transcribe(&clip).await.unwrap_err();
    assert!(matches!(err, visage::Error::NotFound(_)));
}

#[test]
fn stage_constructors_require_api_key() {
    let dir = tempfile::tempdir().unwrap();

    assert!(matches!(
        Transcriber::new(String::new(), &test_asr_config()),
        Err(visage::Error::Config(_))
    ));
    assert!(matches!(
        ResponseGenerator::new(String::new(), &test_nlp_config()),
        Err(visage::Error::Config(_))
    ));
    assert!(matches!(
        Synthesizer::new(String::new(), &test_tts_config(dir.path())),
        Err(visage::Error::Config(_))
    ));
}

#[test]
fn prompt_template_is_deterministic() {
    let a = build_prompt("hello", "ctx");
    let b = build_prompt("hello", "ctx");
    assert_eq!(a, b);

    // Empty context gets the fixed placeholder
    let empty = build_prompt("hello", "");
    assert!(empty.contains("Context: No additional context"));
    assert!(empty.contains("User: hello"));
    assert!(empty.ends_with("Assistant:"));
}

#[test]
fn synthesizer_output_naming_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let synthesizer = Synthesizer::new("test-key".to_string(), &test_tts_config(dir.path())).unwrap();

    let first = synthesizer.output_path("response.wav");
    let second = synthesizer.output_path("response.wav");
    assert_eq!(first, second);
    assert_eq!(first, dir.path().join("response.wav"));
}

#[test]
fn config_defaults_ignore_environment() {
    // Default is pure: ambient VISAGE_* variables must not leak in
    let config = Config::default();

    assert!(config.openai_api_key.is_none());
    assert_eq!(config.asr.model, "whisper-1");
    assert_eq!(config.asr.capture_duration, Duration::from_secs(5));
    assert_eq!(config.nlp.model, "gpt-3.5-turbo-instruct");
    assert_eq!(config.nlp.max_tokens, 150);
    assert_eq!(config.tts.voice, "alloy");
    assert_eq!(config.lipsync.renderer_script, "inference.py");
    assert!(config.lipsync.renderer_dir.is_none());
    assert_eq!(config.sink_url, "http://localhost:8080/apply_blendshapes");
}

#[test]
fn lipsync_validation_names_missing_variable() {
    let mut config = Config::default();

    let err = config.validate_lipsync().unwrap_err();
    assert!(err.to_string().contains("VISAGE_RENDERER_DIR"));

    config.lipsync.renderer_dir = Some("/tmp".into());
    let err = config.validate_lipsync().unwrap_err();
    assert!(err.to_string().contains("VISAGE_FACE_IMAGE"));

    config.lipsync.face_image = Some("/tmp/face.jpeg".into());
    assert!(config.validate_lipsync().is_ok());
    assert!(config.lipsync_configured());
}
