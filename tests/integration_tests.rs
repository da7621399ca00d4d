//! Integration tests for stemsplit
//!
//! These drive the workspace end to end with a scripted browser backend and a
//! recording separation engine, so no chromedriver or separation tool is needed.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stemsplit::acquire::{BrowserBackend, BrowserSession, ElementRef, LaunchOptions, Locator, WaitFor};
use stemsplit::config::{ConverterSite, PollConfig, RetryPolicy, Settings};
use stemsplit::separation::StemEngine;
use stemsplit::status::{self, RecordingSink};
use stemsplit::types::{AcquisitionOrigin, AcquisitionRequest, StemCount, StemSet, StereoBuffer};
use stemsplit::workspace::Workspace;
use stemsplit::{Result, SplitError};
use tempfile::TempDir;

/// Generate a sine wave WAV file for testing
///
/// Creates a 16-bit WAV file with the same signal on every channel.
fn generate_sine_wav(path: &Path, frequency_hz: f32, duration_secs: f32, sample_rate: u32, channels: u16) {
    use std::f32::consts::PI;

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create WAV file");

    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let amplitude = 0.5f32; // 50% amplitude to avoid clipping

    for i in 0..num_samples {
        let t = i as f32 / sample_rate as f32;
        let sample = (2.0 * PI * frequency_hz * t).sin() * amplitude;
        let sample_i16 = (sample * 32767.0) as i16;
        for _ in 0..channels {
            writer.write_sample(sample_i16).expect("Failed to write sample");
        }
    }

    writer.finalize().expect("Failed to finalize WAV");
}

// =============================================================================
// Scripted browser
// =============================================================================

/// How one browser session behaves
#[derive(Debug, Clone)]
enum Script {
    /// The download control never becomes visible
    MissingReadyButton,
    /// Clicking download writes this file into the download directory
    Deliver(&'static str),
    /// Clicking download does nothing
    NeverDeliver,
}

struct ScriptedBackend {
    scripts: Mutex<VecDeque<Script>>,
    launches: AtomicUsize,
    quits: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            launches: AtomicUsize::new(0),
            quits: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

struct ScriptedSession {
    script: Script,
    download_dir: std::path::PathBuf,
    download_xpath: String,
    quits: Arc<AtomicUsize>,
}

impl BrowserSession for ScriptedSession {
    fn navigate(&mut self, _url: &str) -> Result<()> {
        Ok(())
    }

    fn find(&mut self, locator: &Locator) -> Result<ElementRef> {
        Ok(ElementRef(locator.selector().to_string()))
    }

    fn wait_for(&mut self, locator: &Locator, _condition: WaitFor, timeout: Duration) -> Result<ElementRef> {
        if matches!(self.script, Script::MissingReadyButton) && locator.selector() == self.download_xpath {
            return Err(SplitError::ElementTimeout {
                what: locator.to_string(),
                timeout_secs: timeout.as_secs_f64(),
            });
        }
        self.find(locator)
    }

    fn click(&mut self, element: &ElementRef) -> Result<()> {
        if element.0 == self.download_xpath {
            if let Script::Deliver(name) = self.script {
                fs::write(self.download_dir.join(name), vec![0u8; 2048])?;
            }
        }
        Ok(())
    }

    fn send_keys(&mut self, _element: &ElementRef, _text: &str) -> Result<()> {
        Ok(())
    }

    fn quit(&mut self) -> Result<()> {
        self.quits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl BrowserBackend for ScriptedBackend {
    fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserSession>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::NeverDeliver);
        Ok(Box::new(ScriptedSession {
            script,
            download_dir: options.download_dir.clone(),
            download_xpath: ConverterSite::default().download_xpath,
            quits: Arc::clone(&self.quits),
        }))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

// =============================================================================
// Recording engine
// =============================================================================

#[derive(Default)]
struct RecordingEngine {
    calls: AtomicUsize,
}

impl RecordingEngine {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StemEngine for RecordingEngine {
    fn separate(&self, input: &Path, stems: StemCount) -> Result<StemSet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(input.is_file(), "engine called with missing input");
        Ok(stems
            .labels()
            .iter()
            .map(|label| {
                let len = 4410;
                (
                    label.to_string(),
                    StereoBuffer::new(vec![0.1; len], vec![-0.1; len], 44100),
                )
            })
            .collect())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Create test settings with fast retry and polling
fn create_test_settings(base: &Path) -> Settings {
    Settings {
        base_dir: base.to_path_buf(),
        retry: RetryPolicy {
            settle_delay: Duration::ZERO,
            ..RetryPolicy::default()
        },
        poll: PollConfig {
            interval: Duration::from_millis(10),
            budget: Duration::from_millis(80),
            grace: Duration::from_millis(10),
            ..PollConfig::default()
        },
        show_progress: false,
        ..Settings::default()
    }
}

fn create_workspace(
    base: &Path,
    backend: Arc<ScriptedBackend>,
    engine: Arc<RecordingEngine>,
) -> Workspace {
    Workspace::new(create_test_settings(base), backend, engine).expect("Failed to create workspace")
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_local_file_two_stem_separation() {
    let base = TempDir::new().expect("Failed to create base dir");
    let music = TempDir::new().expect("Failed to create music dir");

    // ~30s of 44.1kHz stereo is just over 5 MB
    let song = music.path().join("song.wav");
    generate_sine_wav(&song, 440.0, 30.0, 44100, 2);
    assert!(fs::metadata(&song).unwrap().len() > 5 * 1024 * 1024);

    let engine = Arc::new(RecordingEngine::default());
    let ws = create_workspace(base.path(), ScriptedBackend::new(vec![]), engine.clone());
    let sink = RecordingSink::new();

    let acquired = ws
        .acquire(&AcquisitionRequest::Local(song.clone()), &sink)
        .expect("Local acquisition failed");
    assert_eq!(acquired.origin, AcquisitionOrigin::Local);
    assert_eq!(acquired.path, ws.layout().input.join("song.wav"));
    assert_eq!(sink.last().as_deref(), Some(status::MSG_LOCAL_SELECTED));

    let report = ws.separate(StemCount::Two, &sink).expect("Separation failed");
    assert_eq!(engine.calls(), 1);
    assert_eq!(report.input, acquired.path);
    assert!(report.output_dir.starts_with(&ws.layout().output));
    assert!(report
        .output_dir
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("output_"));
    assert_eq!(
        file_names(&report.output_dir),
        vec!["accompaniment.wav".to_string(), "vocals.wav".to_string()]
    );
    assert_eq!(sink.last().as_deref(), Some(status::MSG_SEPARATION_DONE));

    // written stems are valid stereo WAVs
    let reader = hound::WavReader::open(report.output_dir.join("vocals.wav")).unwrap();
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.spec().sample_rate, 44100);
}

#[test]
fn test_remote_second_attempt_succeeds() {
    let base = TempDir::new().unwrap();
    let backend = ScriptedBackend::new(vec![
        Script::MissingReadyButton,
        Script::Deliver("abc123 - Song.mp3"),
        Script::Deliver("never used.mp3"),
    ]);
    let ws = create_workspace(base.path(), backend.clone(), Arc::new(RecordingEngine::default()));
    let sink = RecordingSink::new();

    let acquired = ws
        .acquire(&AcquisitionRequest::parse("youtu.be/abc123"), &sink)
        .expect("Remote acquisition failed");

    assert_eq!(backend.launches(), 2);
    assert_eq!(backend.quits.load(Ordering::SeqCst), 2);
    assert_eq!(acquired.origin, AcquisitionOrigin::Remote);
    assert_eq!(acquired.path, ws.layout().input.join("abc123 - Song.mp3"));
    assert!(acquired.path.is_file());
    assert!(!acquired.path.starts_with(&ws.layout().temp_download));
    assert_eq!(ws.current_file(), Some(acquired.path.clone()));

    assert_eq!(
        sink.lines(),
        vec![
            status::MSG_STARTING_CONVERSION.to_string(),
            status::attempt_message(1, 3),
            status::MSG_DOWNLOAD_BUTTON_MISSING.to_string(),
            status::attempt_message(2, 3),
            status::MSG_DOWNLOAD_STARTED.to_string(),
            status::MSG_DOWNLOAD_READY.to_string(),
        ]
    );

    // every attempt's download directory is gone
    assert!(file_names(&ws.layout().temp_download).is_empty());
}

#[test]
fn test_remote_all_attempts_time_out() {
    let base = TempDir::new().unwrap();
    let music = TempDir::new().unwrap();
    let previous = music.path().join("previous.wav");
    generate_sine_wav(&previous, 220.0, 2.0, 44100, 2);

    let backend = ScriptedBackend::new(vec![Script::NeverDeliver; 3]);
    let ws = create_workspace(base.path(), backend.clone(), Arc::new(RecordingEngine::default()));
    let sink = RecordingSink::new();

    let selected = ws
        .acquire(&AcquisitionRequest::Local(previous), &sink)
        .unwrap();

    let result = ws.acquire(
        &AcquisitionRequest::Remote("https://www.youtube.com/watch?v=abc123".into()),
        &sink,
    );

    assert!(matches!(result, Err(SplitError::AttemptsExhausted { attempts: 3 })));
    assert_eq!(backend.launches(), 3);
    assert_eq!(sink.last(), Some(status::exhausted_message(3)));
    let timeouts = sink
        .lines()
        .iter()
        .filter(|l| l.as_str() == status::MSG_DOWNLOAD_FAILED)
        .count();
    assert_eq!(timeouts, 3);

    // the earlier selection is still the current file
    assert_eq!(ws.current_file(), Some(selected.path));
    assert!(file_names(&ws.layout().temp_download).is_empty());
}

#[test]
fn test_invalid_url_launches_no_browser() {
    let base = TempDir::new().unwrap();
    let backend = ScriptedBackend::new(vec![Script::Deliver("x.mp3")]);
    let ws = create_workspace(base.path(), backend.clone(), Arc::new(RecordingEngine::default()));
    let sink = RecordingSink::new();

    let result = ws.acquire(&AcquisitionRequest::Remote("https://vimeo.com/12345".into()), &sink);
    assert!(matches!(result, Err(SplitError::InvalidUrl(_))));
    assert_eq!(backend.launches(), 0);
    assert_eq!(sink.lines(), vec![status::MSG_INVALID_URL.to_string()]);
}

// =============================================================================
// Validation never reaches the engine
// =============================================================================

#[test]
fn test_engine_not_called_without_file() {
    let base = TempDir::new().unwrap();
    let engine = Arc::new(RecordingEngine::default());
    let ws = create_workspace(base.path(), ScriptedBackend::new(vec![]), engine.clone());
    let sink = RecordingSink::new();

    let result = ws.separate(StemCount::Four, &sink);
    assert!(matches!(result, Err(SplitError::NoFileSelected)));
    assert_eq!(sink.last().as_deref(), Some(status::MSG_NO_FILE));
    assert_eq!(engine.calls(), 0);
    assert!(file_names(&ws.layout().output).is_empty());
}

#[test]
fn test_engine_not_called_for_missing_file() {
    let base = TempDir::new().unwrap();
    let engine = Arc::new(RecordingEngine::default());
    let ws = create_workspace(base.path(), ScriptedBackend::new(vec![]), engine.clone());
    let sink = RecordingSink::new();

    let result = ws.separate_file(&base.path().join("gone.mp3"), StemCount::Two, &sink);
    assert!(matches!(result, Err(SplitError::FileNotFound(_))));
    assert_eq!(sink.last().as_deref(), Some(status::MSG_FILE_NOT_FOUND));
    assert_eq!(engine.calls(), 0);
}

#[test]
fn test_engine_not_called_for_small_file() {
    let base = TempDir::new().unwrap();
    let engine = Arc::new(RecordingEngine::default());
    let ws = create_workspace(base.path(), ScriptedBackend::new(vec![]), engine.clone());
    let sink = RecordingSink::new();

    // 50 KB, like an aborted download
    let small = base.path().join("small.mp3");
    fs::write(&small, vec![0u8; 50 * 1024]).unwrap();

    let result = ws.separate_file(&small, StemCount::Two, &sink);
    assert!(matches!(result, Err(SplitError::FileTooSmall { .. })));
    assert_eq!(sink.last().as_deref(), Some(status::MSG_FILE_TOO_SMALL));
    assert_eq!(engine.calls(), 0);
}

#[test]
fn test_engine_not_called_for_short_audio() {
    let base = TempDir::new().unwrap();
    let engine = Arc::new(RecordingEngine::default());
    let ws = create_workspace(base.path(), ScriptedBackend::new(vec![]), engine.clone());
    let sink = RecordingSink::new();

    // half a second at 96kHz stereo clears the size floor but not the duration floor
    let short = base.path().join("short.wav");
    generate_sine_wav(&short, 440.0, 0.5, 96000, 2);
    assert!(fs::metadata(&short).unwrap().len() > 104_858);

    let result = ws.separate_file(&short, StemCount::Two, &sink);
    assert!(matches!(result, Err(SplitError::AudioTooShort { .. })));
    assert_eq!(sink.last().as_deref(), Some(status::MSG_AUDIO_TOO_SHORT));
    assert_eq!(engine.calls(), 0);
}

// =============================================================================
// Threading
// =============================================================================

#[test]
fn test_worker_streams_status_over_channel() {
    let base = TempDir::new().unwrap();
    let backend = ScriptedBackend::new(vec![Script::Deliver("track.mp3")]);
    let engine = Arc::new(RecordingEngine::default());
    let ws = Arc::new(create_workspace(base.path(), backend, engine.clone()));

    // remote files are placeholders, so separate a real file afterwards
    let real = base.path().join("real.wav");
    generate_sine_wav(&real, 330.0, 2.0, 44100, 2);

    let (handle, rx) = ws.spawn(move |ws, status| {
        ws.acquire(&AcquisitionRequest::parse("https://youtu.be/abc123"), status)?;
        ws.separate_file(&real, StemCount::Five, status)
    });

    let lines: Vec<String> = rx.iter().collect();
    let report = handle.join().expect("worker panicked").expect("worker failed");

    assert_eq!(report.files.len(), 5);
    assert_eq!(engine.calls(), 1);
    assert_eq!(lines.first().map(String::as_str), Some(status::MSG_STARTING_CONVERSION));
    assert!(lines.iter().any(|l| l == status::MSG_DOWNLOAD_READY));
    assert_eq!(lines.last().map(String::as_str), Some(status::MSG_SEPARATION_DONE));
    assert!(!ws.is_busy());
}

#[test]
fn test_overlapping_trigger_rejected() {
    let base = TempDir::new().unwrap();
    // Never delivers, so the acquisition stays busy for the whole poll budget
    let backend = ScriptedBackend::new(vec![Script::NeverDeliver; 3]);
    let ws = Arc::new(create_workspace(
        base.path(),
        backend,
        Arc::new(RecordingEngine::default()),
    ));

    let (handle, rx) = ws.spawn(|ws, status| {
        ws.acquire(&AcquisitionRequest::parse("https://youtu.be/abc123"), status)
    });

    // wait until the worker is inside its first attempt
    let first = rx.recv().expect("worker reported nothing");
    assert_eq!(first, status::MSG_STARTING_CONVERSION);
    assert!(ws.is_busy());

    let result = ws.separate(StemCount::Two, &RecordingSink::new());
    assert!(matches!(result, Err(SplitError::Busy)));

    drop(rx);
    let outcome = handle.join().unwrap();
    assert!(matches!(outcome, Err(SplitError::AttemptsExhausted { .. })));
    assert!(!ws.is_busy());
}
