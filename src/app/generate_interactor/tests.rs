use super::*;
use crate::output::OverwritePolicy;
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

struct FakeProbe {
    info: MediaInfo,
    calls: AtomicUsize,
}

#[async_trait]
impl MediaProbePort for FakeProbe {
    async fn probe_media(&self, _file_path: &Path) -> Result<MediaInfo, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.info.clone())
    }
}

enum Behavior {
    Succeed,
    Fail(&'static str),
    Hang,
}

struct FakeEngine {
    behavior: Behavior,
    requests: Mutex<Vec<TranscodeRequest>>,
}

#[async_trait]
impl TranscodePort for FakeEngine {
    async fn load(&self) -> Result<(), DomainError> {
        Ok(())
    }

    async fn transcode(
        &self,
        request: &TranscodeRequest,
        signals: UnboundedSender<EngineSignal>,
    ) -> Result<Vec<u8>, DomainError> {
        self.requests.lock().unwrap().push(request.clone());
        let _ = signals.send(EngineSignal::Log("frame=20".to_string()));
        match self.behavior {
            Behavior::Succeed => Ok(b"GIF89a fake gif".to_vec()),
            Behavior::Fail(message) => Err(DomainError::EngineExecutionFailure(message.to_string())),
            Behavior::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

struct Answer(bool, Mutex<Vec<String>>);

impl ConfirmationPort for Answer {
    fn confirm(&self, prompt: &str) -> bool {
        self.1.lock().unwrap().push(prompt.to_string());
        self.0
    }
}

#[derive(Default)]
struct Recorder(Mutex<Vec<String>>);

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl ProgressCallback for Recorder {
    fn on_start(&self, _operation: &str) {
        self.0.lock().unwrap().push("start".to_string());
    }
    fn on_progress(&self, percent: f64, _message: &str) {
        self.0.lock().unwrap().push(format!("{}", percent));
    }
    fn on_complete(&self, bytes: usize) {
        self.0.lock().unwrap().push(format!("complete:{}", bytes));
    }
    fn on_error(&self, error: &str) {
        self.0.lock().unwrap().push(format!("error:{}", error));
    }
    fn on_cancel(&self) {
        self.0.lock().unwrap().push("cancel".to_string());
    }
}

fn media_info(file_size: u64, duration: f64) -> MediaInfo {
    MediaInfo {
        width: 1920,
        height: 1080,
        duration: TimeSpec::from_seconds(duration),
        frame_rate: 30.0,
        codec: "h264".to_string(),
        format: "mp4".to_string(),
        file_size,
        has_audio: true,
    }
}

struct Fixture {
    interactor: GenerateInteractor,
    probe: Arc<FakeProbe>,
    engine: Arc<FakeEngine>,
    confirm: Arc<Answer>,
    dir: tempfile::TempDir,
}

fn fixture(info: MediaInfo, behavior: Behavior, answer: bool) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let probe = Arc::new(FakeProbe {
        info,
        calls: AtomicUsize::new(0),
    });
    let engine = Arc::new(FakeEngine {
        behavior,
        requests: Mutex::new(Vec::new()),
    });
    let confirm = Arc::new(Answer(answer, Mutex::new(Vec::new())));
    let interactor = GenerateInteractor::new(
        probe.clone(),
        engine.clone(),
        confirm.clone(),
        ArtifactWriter::new(dir.path(), OverwritePolicy::Never),
        GenerationPolicy::default(),
        ResourceLimits::default(),
        CropSettings::default(),
    );
    Fixture {
        interactor,
        probe,
        engine,
        confirm,
        dir,
    }
}

fn display_command() -> GenerateCommand {
    GenerateCommand {
        source: PathBuf::from("holiday.mp4"),
        start_time: TimeSpec::from_seconds(2.0),
        selection: CropSelection::Display {
            region: CropRegion::new(300.0, 168.75, 180.0),
            container: Size::new(800.0, 450.0).unwrap(),
        },
    }
}

fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[tokio::test]
async fn test_generate_writes_artifact() {
    let fx = fixture(media_info(1024, 10.0), Behavior::Succeed, true);
    let recorder = Recorder::default();

    let artifact = fx
        .interactor
        .execute(display_command(), &recorder, std::future::pending())
        .await
        .unwrap();

    assert_eq!(artifact.crop, SourceCropParams::new(720, 405, 432));
    assert_eq!(artifact.bytes, 15);
    assert_eq!(std::fs::read(&artifact.path).unwrap(), b"GIF89a fake gif");
    let name = artifact.path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("gif-thumbnail-") && name.ends_with(".gif"));

    let events = recorder.events();
    assert_eq!(events.first().map(String::as_str), Some("start"));
    assert_eq!(events[events.len() - 2], "100");
    assert_eq!(events.last().map(String::as_str), Some("complete:15"));

    let sent = fx.engine.requests.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!((sent[0].crop_x, sent[0].crop_y, sent[0].crop_size), (720, 405, 432));
    assert_eq!((sent[0].duration_seconds, sent[0].fps, sent[0].output_size), (4.0, 10, 62));
    assert!(fx.confirm.1.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unsupported_file_is_rejected_before_probing() {
    let fx = fixture(media_info(1024, 10.0), Behavior::Succeed, true);
    let mut command = display_command();
    command.source = PathBuf::from("notes.txt");

    let err = fx.interactor.prepare(&command).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidInput(ref m) if m.starts_with("Please select a valid video file")));
    assert_eq!(fx.probe.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_declined_advisory_stops_generation() {
    let fx = fixture(media_info(300 * 1024 * 1024, 10.0), Behavior::Succeed, false);

    let err = fx.interactor.prepare(&display_command()).await.unwrap_err();
    assert!(matches!(err, DomainError::ResourceLimit(_)));
    assert_eq!(
        fx.confirm.1.lock().unwrap().as_slice(),
        ["Large file detected (>200MB). Processing may be slow. Continue?".to_string()]
    );
}

#[tokio::test]
async fn test_accepted_advisories_continue() {
    let fx = fixture(media_info(300 * 1024 * 1024, 90.0), Behavior::Succeed, true);

    let request = fx.interactor.prepare(&display_command()).await.unwrap();
    assert_eq!(request.crop, SourceCropParams::new(720, 405, 432));
    assert_eq!(fx.confirm.1.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_start_past_end_is_invalid() {
    let fx = fixture(media_info(1024, 3.0), Behavior::Succeed, true);
    let mut command = display_command();
    command.start_time = TimeSpec::from_seconds(3.0);

    assert!(matches!(
        fx.interactor.prepare(&command).await,
        Err(DomainError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_engine_failure_leaves_no_file() {
    let fx = fixture(media_info(1024, 10.0), Behavior::Fail("Conversion failed!"), true);
    let recorder = Recorder::default();

    let err = fx
        .interactor
        .execute(display_command(), &recorder, std::future::pending())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Conversion failed!");
    assert_eq!(recorder.events().last().map(String::as_str), Some("error:Conversion failed!"));
    assert_eq!(files_in(fx.dir.path()), 0);
}

#[tokio::test]
async fn test_cancel_stops_running_job() {
    let fx = fixture(media_info(1024, 10.0), Behavior::Hang, true);
    let recorder = Recorder::default();

    let err = fx
        .interactor
        .execute(display_command(), &recorder, tokio::time::sleep(Duration::from_millis(50)))
        .await
        .unwrap_err();

    assert!(matches!(err, GifCropError::Domain(DomainError::Cancelled)));
    assert_eq!(recorder.events().last().map(String::as_str), Some("cancel"));
    assert_eq!(files_in(fx.dir.path()), 0);
}

#[test]
fn test_resolve_crop_variants() {
    let fx = fixture(media_info(1024, 10.0), Behavior::Succeed, true);
    let media = MediaDimensions::new(1920, 1080).unwrap();

    assert_eq!(
        fx.interactor.resolve_crop(&CropSelection::Centered, media).unwrap(),
        SourceCropParams::new(744, 324, 432)
    );
    assert_eq!(
        fx.interactor
            .resolve_crop(&CropSelection::Source(SourceCropParams::new(1800, 900, 1200)), media)
            .unwrap(),
        SourceCropParams::new(840, 0, 1080)
    );

    let outside = CropSelection::Display {
        region: CropRegion::new(700.0, 0.0, 180.0),
        container: Size::new(800.0, 450.0).unwrap(),
    };
    assert!(matches!(
        fx.interactor.resolve_crop(&outside, media),
        Err(DomainError::InvalidInput(_))
    ));
}
