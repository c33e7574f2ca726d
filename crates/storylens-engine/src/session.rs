//! The analysis orchestrator.
//!
//! [`StoryboardSession`] owns the state machine
//! `Idle → Analyzing → Capturing → Success` (with `Error` reachable from
//! either in-flight state) and publishes [`AnalysisSnapshot`]s through a
//! watch channel on every transition and every capture progress tick.
//! Consumers render from the latest snapshot only.
//!
//! One run is one logical task: the file read, the external analysis
//! call, the one-time metadata wait, and every per-scene seek settle are
//! strictly sequential suspension points. The capture loop drives a
//! hidden frame source; user-initiated jumps reposition a separate
//! display source bound to the same file, so the two never contend.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tokio::sync::watch;
use tracing::debug;

use storylens_media::{capture_thumbnails, FfmpegFrameSource, FrameSource};
use storylens_models::{exceeds_upload_limit, resolve_offset, AnalysisSnapshot, AnalysisStatus};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::gemini::StoryboardAnalyzer;
use crate::logging::RunLogger;

type FrameSourceFactory = Box<dyn Fn(&Path) -> Box<dyn FrameSource> + Send + Sync>;

/// The clip currently bound to the session.
#[derive(Debug, Clone)]
struct SelectedClip {
    path: PathBuf,
    size: u64,
    mime_type: &'static str,
}

/// Orchestrates one storyboard analysis session.
pub struct StoryboardSession<A: StoryboardAnalyzer> {
    analyzer: A,
    state: watch::Sender<AnalysisSnapshot>,
    /// Bumped on every select/submit; stale runs stop publishing.
    generation: Arc<AtomicU64>,
    clip: Option<SelectedClip>,
    display: Option<Box<dyn FrameSource>>,
    frame_sources: FrameSourceFactory,
}

impl<A: StoryboardAnalyzer> StoryboardSession<A> {
    /// Create a session backed by FFmpeg frame sources.
    pub fn new(analyzer: A, config: EngineConfig) -> Self {
        let timeout = config.seek_timeout_secs;
        Self::with_frame_sources(analyzer, move |path| {
            Box::new(FfmpegFrameSource::new(path).with_seek_timeout(timeout))
                as Box<dyn FrameSource>
        })
    }

    /// Create a session with a custom frame source factory.
    ///
    /// The factory is invoked once per bound clip for the display source
    /// and once per run for the hidden capture source.
    pub fn with_frame_sources<F>(analyzer: A, frame_sources: F) -> Self
    where
        F: Fn(&Path) -> Box<dyn FrameSource> + Send + Sync + 'static,
    {
        let (state, _) = watch::channel(AnalysisSnapshot::idle());
        Self {
            analyzer,
            state,
            generation: Arc::new(AtomicU64::new(0)),
            clip: None,
            display: None,
            frame_sources: Box::new(frame_sources),
        }
    }

    /// Subscribe to state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<AnalysisSnapshot> {
        self.state.subscribe()
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> AnalysisSnapshot {
        self.state.borrow().clone()
    }

    /// Current run status.
    pub fn status(&self) -> AnalysisStatus {
        self.state.borrow().status
    }

    /// Bind a clip to the session.
    ///
    /// Discards any prior result or error and returns to `Idle` without
    /// starting a run. An in-flight run's remaining progress updates are
    /// invalidated.
    pub async fn select_clip(&mut self, path: impl AsRef<Path>) -> EngineResult<()> {
        let path = path.as_ref();
        let file_meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| EngineError::transport(format!("failed to read clip metadata: {}", e)))?;

        self.generation.fetch_add(1, Ordering::SeqCst);
        self.clip = Some(SelectedClip {
            path: path.to_path_buf(),
            size: file_meta.len(),
            mime_type: clip_mime_type(path),
        });
        self.display = Some((self.frame_sources)(path));
        self.state.send_modify(|s| s.clear());
        debug!(clip = %path.display(), "clip selected");
        Ok(())
    }

    /// Run the analysis for the bound clip.
    ///
    /// Preconditions are checked before any transition: a clip must be
    /// bound, it must be within the upload cap, and no run may already be
    /// in flight (only `Idle` and `Error` accept a submit). Precondition
    /// failures leave the published state untouched.
    pub async fn run_analysis(&mut self) -> EngineResult<()> {
        let clip = self.clip.as_ref().ok_or(EngineError::NoClipSelected)?;
        if exceeds_upload_limit(clip.size) {
            return Err(EngineError::file_too_large(clip.size));
        }
        let status = self.state.borrow().status;
        if !matches!(status, AnalysisStatus::Idle | AnalysisStatus::Error) {
            return Err(EngineError::RunAlreadyInFlight);
        }

        let run_gen = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let logger = RunLogger::new("storyboard_analysis");
        logger.log_start(&format!("analyzing {}", clip.path.display()));
        self.state.send_modify(|s| s.begin_analyzing());

        match self.execute_run(run_gen, &logger).await {
            Ok(()) => {
                logger.log_completion("storyboard ready");
                Ok(())
            }
            Err(e) => {
                let message = e.user_message();
                logger.log_error(&message);
                if self.generation.load(Ordering::SeqCst) == run_gen {
                    self.state.send_modify(|s| s.fail(message));
                }
                Err(e)
            }
        }
    }

    async fn execute_run(&mut self, run_gen: u64, logger: &RunLogger) -> EngineResult<()> {
        let (path, mime_type) = {
            let clip = self.clip.as_ref().expect("clip checked by run_analysis");
            (clip.path.clone(), clip.mime_type)
        };

        // Suspension point: read and encode the clip payload.
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| EngineError::transport(format!("failed to read clip: {}", e)))?;
        let payload = BASE64.encode(&bytes);
        drop(bytes);

        // Suspension point: external analysis.
        let storyboard = self.analyzer.analyze(&payload, mime_type).await?;
        if storyboard.scenes.is_empty() {
            return Err(EngineError::EmptyResponse);
        }
        logger.log_progress(&format!("{} scenes identified", storyboard.scenes.len()));

        let mut scenes = storyboard.scenes.clone();
        self.publish(run_gen, |s| s.begin_capturing(storyboard));

        // The hidden capture source is a fresh instance; the display
        // source stays free for user seeks.
        let mut capture_source = (self.frame_sources)(&path);
        let state = &self.state;
        let generation = &self.generation;
        capture_thumbnails(&mut scenes, capture_source.as_mut(), |snapshot| {
            if generation.load(Ordering::SeqCst) == run_gen {
                state.send_modify(|s| s.update_scenes(snapshot));
            }
        })
        .await?;

        self.publish(run_gen, |s| {
            s.update_scenes(scenes);
            s.complete();
        });
        Ok(())
    }

    /// Resolve a scene timestamp against the display source and seek it.
    ///
    /// Returns the resolved offset in seconds.
    pub async fn jump_to(&mut self, timestamp: &str) -> EngineResult<f64> {
        let display = self.display.as_mut().ok_or(EngineError::NoClipSelected)?;
        let meta = display.metadata().await?;
        let offset = resolve_offset(timestamp, Some(meta.duration))?;
        display.seek_to(offset).await?;
        Ok(offset)
    }

    fn publish(&self, run_gen: u64, update: impl FnOnce(&mut AnalysisSnapshot)) {
        if self.generation.load(Ordering::SeqCst) == run_gen {
            self.state.send_modify(update);
        }
    }
}

/// Media type of a clip, derived from its extension.
fn clip_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("mpg" | "mpeg") => "video/mpeg",
        _ => "video/mp4",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::RgbImage;
    use std::io::Write;
    use std::sync::Mutex;

    use storylens_media::{MediaError, MediaMetadata, MediaResult};
    use storylens_models::{Scene, Storyboard};

    fn scene(ts: &str) -> Scene {
        Scene {
            timestamp: ts.to_string(),
            duration_label: "1.0s".to_string(),
            shot_type: "Wide".to_string(),
            camera_movement: "Static".to_string(),
            description: "d".to_string(),
            action: "a".to_string(),
            lighting: "l".to_string(),
            subtitles: None,
            reproduction_prompt: "p".to_string(),
            thumbnail: None,
        }
    }

    fn board(timestamps: &[&str]) -> Storyboard {
        Storyboard {
            title: "Test Clip".to_string(),
            summary: "summary".to_string(),
            scenes: timestamps.iter().map(|ts| scene(ts)).collect(),
        }
    }

    struct StaticAnalyzer(Storyboard);

    #[async_trait]
    impl StoryboardAnalyzer for StaticAnalyzer {
        async fn analyze(&self, _video: &str, _mime: &str) -> EngineResult<Storyboard> {
            Ok(self.0.clone())
        }
    }

    struct FailingAnalyzer(String);

    #[async_trait]
    impl StoryboardAnalyzer for FailingAnalyzer {
        async fn analyze(&self, _video: &str, _mime: &str) -> EngineResult<Storyboard> {
            Err(EngineError::external(self.0.clone()))
        }
    }

    /// In-memory frame source; records seeks into a shared log.
    struct ScriptedFrameSource {
        duration: f64,
        seeks: Arc<Mutex<Vec<f64>>>,
        frame: Option<RgbImage>,
        position: f64,
    }

    #[async_trait]
    impl FrameSource for ScriptedFrameSource {
        async fn metadata(&mut self) -> MediaResult<MediaMetadata> {
            Ok(MediaMetadata {
                duration: self.duration,
                width: 4,
                height: 2,
                fps: 30.0,
            })
        }

        async fn seek_to(&mut self, offset_secs: f64) -> MediaResult<()> {
            self.seeks.lock().unwrap().push(offset_secs);
            self.frame = Some(RgbImage::from_pixel(4, 2, image::Rgb([1, 2, 3])));
            self.position = offset_secs;
            Ok(())
        }

        fn current_frame(&self) -> MediaResult<&RgbImage> {
            self.frame.as_ref().ok_or(MediaError::NoFrameDecoded)
        }

        fn position(&self) -> f64 {
            self.position
        }
    }

    fn session_with<Az: StoryboardAnalyzer>(
        analyzer: Az,
        duration: f64,
    ) -> (StoryboardSession<Az>, Arc<Mutex<Vec<f64>>>) {
        let seeks = Arc::new(Mutex::new(Vec::new()));
        let log = seeks.clone();
        let session = StoryboardSession::with_frame_sources(analyzer, move |_path| {
            Box::new(ScriptedFrameSource {
                duration,
                seeks: log.clone(),
                frame: None,
                position: 0.0,
            }) as Box<dyn FrameSource>
        });
        (session, seeks)
    }

    fn temp_clip() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".mp4").tempfile().unwrap();
        file.write_all(b"fake clip bytes").unwrap();
        file
    }

    #[tokio::test]
    async fn test_full_run_reaches_success() {
        let clip = temp_clip();
        let (mut session, seeks) =
            session_with(StaticAnalyzer(board(&["00:00", "00:15", "00:30"])), 30.0);

        session.select_clip(clip.path()).await.unwrap();
        assert_eq!(session.status(), AnalysisStatus::Idle);

        session.run_analysis().await.unwrap();

        let snap = session.snapshot();
        assert_eq!(snap.status, AnalysisStatus::Success);
        let result = snap.result.unwrap();
        assert_eq!(result.title, "Test Clip");
        assert!(result.thumbnails_complete());

        // the outro at the clip's full duration is clamped half a second back
        assert_eq!(*seeks.lock().unwrap(), vec![0.0, 15.0, 29.5]);
    }

    #[tokio::test]
    async fn test_progress_ticks_bump_event_seq() {
        let clip = temp_clip();
        let (mut session, _) = session_with(StaticAnalyzer(board(&["00:00", "00:01"])), 10.0);

        session.select_clip(clip.path()).await.unwrap();
        let seq_before = session.snapshot().event_seq;
        session.run_analysis().await.unwrap();

        // begin + 2 capture ticks + final update/complete, at minimum
        assert!(session.snapshot().event_seq >= seq_before + 4);
    }

    #[tokio::test]
    async fn test_analyzer_failure_surfaces_message() {
        let clip = temp_clip();
        let (mut session, _) =
            session_with(FailingAnalyzer("quota exceeded".to_string()), 10.0);

        session.select_clip(clip.path()).await.unwrap();
        let err = session.run_analysis().await.unwrap_err();
        assert!(matches!(err, EngineError::External(_)));

        let snap = session.snapshot();
        assert_eq!(snap.status, AnalysisStatus::Error);
        assert_eq!(snap.error_message.as_deref(), Some("quota exceeded"));
        // failure happened before the external call returned anything
        assert!(snap.result.is_none());
    }

    #[tokio::test]
    async fn test_empty_storyboard_is_empty_response() {
        let clip = temp_clip();
        let (mut session, _) = session_with(StaticAnalyzer(board(&[])), 10.0);

        session.select_clip(clip.path()).await.unwrap();
        let err = session.run_analysis().await.unwrap_err();
        assert!(matches!(err, EngineError::EmptyResponse));
        assert_eq!(session.status(), AnalysisStatus::Error);
    }

    #[tokio::test]
    async fn test_oversize_clip_rejected_before_any_transition() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.mp4");
        let file = std::fs::File::create(&path).unwrap();
        // sparse file just over the cap
        file.set_len(storylens_models::MAX_UPLOAD_BYTES + 1).unwrap();

        let (mut session, _) = session_with(StaticAnalyzer(board(&["00:00"])), 10.0);
        session.select_clip(&path).await.unwrap();

        let err = session.run_analysis().await.unwrap_err();
        assert!(matches!(err, EngineError::FileTooLarge { .. }));

        let snap = session.snapshot();
        assert_eq!(snap.status, AnalysisStatus::Idle);
        assert!(snap.error_message.is_none());
    }

    #[tokio::test]
    async fn test_submit_without_clip_rejected() {
        let (mut session, _) = session_with(StaticAnalyzer(board(&["00:00"])), 10.0);
        let err = session.run_analysis().await.unwrap_err();
        assert!(matches!(err, EngineError::NoClipSelected));
        assert_eq!(session.status(), AnalysisStatus::Idle);
    }

    #[tokio::test]
    async fn test_submit_only_from_idle_or_error() {
        let clip = temp_clip();
        let (mut session, _) = session_with(StaticAnalyzer(board(&["00:00"])), 10.0);
        session.select_clip(clip.path()).await.unwrap();

        session.run_analysis().await.unwrap();
        assert_eq!(session.status(), AnalysisStatus::Success);

        // a finished result must be re-bound before another run
        let err = session.run_analysis().await.unwrap_err();
        assert!(matches!(err, EngineError::RunAlreadyInFlight));

        session.select_clip(clip.path()).await.unwrap();
        session.run_analysis().await.unwrap();
        assert_eq!(session.status(), AnalysisStatus::Success);
    }

    #[tokio::test]
    async fn test_retry_from_error_is_allowed() {
        let clip = temp_clip();
        let (mut session, _) =
            session_with(FailingAnalyzer("transient outage".to_string()), 10.0);
        session.select_clip(clip.path()).await.unwrap();

        session.run_analysis().await.unwrap_err();
        assert_eq!(session.status(), AnalysisStatus::Error);

        // retry is a manual submit from Error; the guard lets it through
        let err = session.run_analysis().await.unwrap_err();
        assert!(matches!(err, EngineError::External(_)));
        assert_eq!(session.status(), AnalysisStatus::Error);
    }

    #[tokio::test]
    async fn test_select_clip_resets_state() {
        let clip = temp_clip();
        let (mut session, _) = session_with(FailingAnalyzer("boom".to_string()), 10.0);
        session.select_clip(clip.path()).await.unwrap();
        session.run_analysis().await.unwrap_err();
        assert_eq!(session.status(), AnalysisStatus::Error);

        session.select_clip(clip.path()).await.unwrap();
        let snap = session.snapshot();
        assert_eq!(snap.status, AnalysisStatus::Idle);
        assert!(snap.error_message.is_none());
        assert!(snap.result.is_none());
    }

    #[tokio::test]
    async fn test_jump_to_clamps_against_display_duration() {
        let clip = temp_clip();
        let (mut session, seeks) = session_with(StaticAnalyzer(board(&["00:00"])), 30.0);
        session.select_clip(clip.path()).await.unwrap();

        let offset = session.jump_to("01:00").await.unwrap();
        assert_eq!(offset, 29.5);
        assert_eq!(*seeks.lock().unwrap(), vec![29.5]);

        let err = session.jump_to("nonsense").await.unwrap_err();
        assert!(matches!(err, EngineError::Timestamp(_)));
    }

    #[tokio::test]
    async fn test_missing_clip_file_is_transport_error() {
        let (mut session, _) = session_with(StaticAnalyzer(board(&["00:00"])), 10.0);
        let err = session.select_clip("/nonexistent/clip.mp4").await.unwrap_err();
        assert!(matches!(err, EngineError::Transport(_)));
    }

    #[test]
    fn test_clip_mime_type() {
        assert_eq!(clip_mime_type(Path::new("a.mp4")), "video/mp4");
        assert_eq!(clip_mime_type(Path::new("a.MOV")), "video/quicktime");
        assert_eq!(clip_mime_type(Path::new("a.webm")), "video/webm");
        assert_eq!(clip_mime_type(Path::new("a.mkv")), "video/x-matroska");
        assert_eq!(clip_mime_type(Path::new("noext")), "video/mp4");
    }
}
