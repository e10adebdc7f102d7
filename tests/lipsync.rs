//! Lip-sync chain integration tests
//!
//! Drives the renderer against stub scripts instead of the real renderer,
//! and the sink against unreachable endpoints.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use visage::audio::{AudioClip, CAPTURE_SAMPLE_RATE, samples_to_wav};
use visage::config::LipSyncConfig;
use visage::lipsync::{
    BlendshapeExtractor, BlendshapeSet, BlendshapeSink, LipSyncRenderer, is_recognized,
};

/// Write a short silent WAV clip into `dir`
fn write_test_clip(dir: &Path) -> AudioClip {
    let path = dir.join("speech.wav");
    let samples = vec![0.0f32; CAPTURE_SAMPLE_RATE as usize / 10];
    let wav = samples_to_wav(&samples, CAPTURE_SAMPLE_RATE).unwrap();
    std::fs::write(&path, wav).unwrap();
    AudioClip::open(&path).unwrap()
}

/// Write a stub renderer script that exits with `code`
fn write_stub_renderer(dir: &Path, code: i32) -> PathBuf {
    let script = dir.join("inference.sh");
    std::fs::write(&script, format!("exit {code}\n")).unwrap();
    script
}

/// Lip-sync config pointing at a stub renderer in `dir`
fn stub_config(dir: &Path, exit_code: i32) -> LipSyncConfig {
    write_stub_renderer(dir, exit_code);
    LipSyncConfig {
        renderer_dir: Some(dir.to_path_buf()),
        renderer_bin: "sh".to_string(),
        renderer_script: "inference.sh".to_string(),
        checkpoint: "checkpoints/wav2lip_gan.pth".to_string(),
        face_image: Some(dir.join("face.jpeg")),
        video_dir: dir.join("video"),
        blendshape_dir: dir.join("blendshapes"),
        extractor_url: None,
    }
}

/// Extractor stub that returns a fixed valid set and records invocation
struct StubExtractor {
    called: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl BlendshapeExtractor for StubExtractor {
    async fn extract(&self, _video: &Path) -> visage::Result<BlendshapeSet> {
        self.called.store(true, Ordering::SeqCst);
        let mut set = BlendshapeSet::new();
        set.insert("jawOpen", 0.8)?;
        set.insert("mouthSmileLeft", 0.5)?;
        set.insert("mouthSmileRight", 0.5)?;
        Ok(set)
    }
}

#[test]
fn renderer_requires_configured_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = stub_config(dir.path(), 0);
    config.renderer_dir = None;

    let err = LipSyncRenderer::new(&config, None).unwrap_err();
    assert!(matches!(err, visage::Error::Config(_)));
}

#[test]
fn renderer_rejects_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = stub_config(dir.path(), 0);
    config.renderer_dir = Some("/nonexistent/renderer".into());

    let err = LipSyncRenderer::new(&config, None).unwrap_err();
    assert!(matches!(err, visage::Error::NotFound(_)));
}

#[tokio::test]
async fn render_without_extractor_yields_video_only() {
    let dir = tempfile::tempdir().unwrap();
    let clip = write_test_clip(dir.path());
    let config = stub_config(dir.path(), 0);

    let renderer = LipSyncRenderer::new(&config, None).unwrap();
    let outcome = renderer.render(&clip).await.unwrap();

    assert!(outcome.video.ends_with("lip_synced_video.mp4"));
    assert!(outcome.blendshapes.is_none());
}

#[tokio::test]
async fn render_with_extractor_writes_blendshape_file() {
    let dir = tempfile::tempdir().unwrap();
    let clip = write_test_clip(dir.path());
    let config = stub_config(dir.path(), 0);

    let called = Arc::new(AtomicBool::new(false));
    let extractor = StubExtractor {
        called: Arc::clone(&called),
    };
    let renderer = LipSyncRenderer::new(&config, Some(Box::new(extractor))).unwrap();

    let outcome = renderer.render(&clip).await.unwrap();
    assert!(called.load(Ordering::SeqCst));

    let path = outcome.blendshapes.expect("blendshape file should exist");
    let set = BlendshapeSet::read_file(&path).unwrap();
    assert_eq!(set.get("jawOpen"), Some(0.8));
    for (name, value) in set.iter() {
        assert!(is_recognized(name));
        assert!((0.0..=1.0).contains(&value));
    }
}

#[tokio::test]
async fn render_failure_short_circuits_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let clip = write_test_clip(dir.path());
    let config = stub_config(dir.path(), 1);

    let called = Arc::new(AtomicBool::new(false));
    let extractor = StubExtractor {
        called: Arc::clone(&called),
    };
    let renderer = LipSyncRenderer::new(&config, Some(Box::new(extractor))).unwrap();

    let err = renderer.render(&clip).await.unwrap_err();
    assert!(matches!(err, visage::Error::Render(_)));

    // No partial output: extraction never ran, no blendshape file written
    assert!(!called.load(Ordering::SeqCst));
    assert!(!config.blendshape_dir.join("blendshapes.json").exists());
}

#[tokio::test]
async fn render_missing_audio_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let config = stub_config(dir.path(), 0);

    let clip = AudioClip {
        path: dir.path().join("deleted.wav"),
        sample_rate: CAPTURE_SAMPLE_RATE,
        channels: 1,
        duration: Duration::from_secs(1),
    };

    let renderer = LipSyncRenderer::new(&config, None).unwrap();
    let err = renderer.render(&clip).await.unwrap_err();
    assert!(matches!(err, visage::Error::NotFound(_)));
}

#[tokio::test]
async fn sink_swallows_unreachable_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blendshapes.json");

    let mut set = BlendshapeSet::new();
    set.insert("jawOpen", 0.8).unwrap();
    set.write_file(&path).unwrap();

    // Port 9 (discard) is not listening; delivery failure is logged, not raised
    let sink = BlendshapeSink::new("http://127.0.0.1:9/apply_blendshapes".to_string());
    sink.send_file(&path).await.unwrap();
}

#[tokio::test]
async fn sink_missing_file_is_an_error() {
    let sink = BlendshapeSink::new("http://127.0.0.1:9/apply_blendshapes".to_string());
    let err = sink
        .send_file(Path::new("/nonexistent/blendshapes.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, visage::Error::NotFound(_)));
}

#[tokio::test]
async fn sink_corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blendshapes.json");
    std::fs::write(&path, "not json").unwrap();

    let sink = BlendshapeSink::new("http://127.0.0.1:9/apply_blendshapes".to_string());
    assert!(sink.send_file(&path).await.is_err());
}

#[test]
fn blendshape_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/dir/blendshapes.json");

    let mut set = BlendshapeSet::new();
    set.insert("jawOpen", 0.8).unwrap();
    set.insert("mouthSmileLeft", 0.5).unwrap();
    set.write_file(&path).unwrap();

    let read_back = BlendshapeSet::read_file(&path).unwrap();
    assert_eq!(read_back, set);
}
