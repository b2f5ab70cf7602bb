//! Session controller
//!
//! Owns the media writer and capture source, routes samples to tracks,
//! and drives the start/stop state machine. All stop triggers (signal,
//! size limit, source error) funnel through the same `stop` entry point,
//! which is guarded so finalization runs exactly once per session.

use super::monitor::{FsSizeProbe, SizeLimits, SizeMonitor, SizeMonitorHandle, SizeProbe};
use super::state::{
    RecordingConfig, SessionCounters, SessionEvent, SessionOutcome, SessionState, SessionStatus,
    StopTrigger,
};
use crate::capture::{BoxSource, Sample, SampleKind, SourceStreams};
use crate::utils::{RecordError, RecordResult};
use crate::writer::{
    AudioTrackSettings, BoxWriter, TrackId, TrackSettings, VideoTrackSettings, WriterStatus,
};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Track handles for the session; identities are fixed after setup
struct TrackSet {
    video: TrackId,
    system_audio: Option<TrackId>,
    microphone: Option<TrackId>,
}

impl TrackSet {
    fn for_kind(&self, kind: SampleKind) -> Option<TrackId> {
        match kind {
            SampleKind::Video => Some(self.video),
            SampleKind::SystemAudio => self.system_audio,
            SampleKind::Microphone => self.microphone,
        }
    }

    fn all(&self) -> Vec<TrackId> {
        let mut tracks = vec![self.video];
        tracks.extend(self.system_audio);
        tracks.extend(self.microphone);
        tracks
    }
}

/// Writer plus the routing state that must change atomically with it
///
/// The lock around this struct is the critical section that serializes the
/// origin-time set-once check against concurrent producers.
struct WriterShared {
    writer: BoxWriter,
    tracks: TrackSet,
    /// Presentation timestamp of the first accepted video sample
    origin_ms: Option<f64>,
}

#[derive(Default)]
struct Counters {
    frames_written: AtomicU64,
    system_audio_samples: AtomicU64,
    microphone_samples: AtomicU64,
    audio_samples_total: AtomicU64,
    video_frames_dropped: AtomicU64,
    audio_dropped_before_origin: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> SessionCounters {
        SessionCounters {
            frames_written: self.frames_written.load(Ordering::SeqCst),
            system_audio_samples: self.system_audio_samples.load(Ordering::SeqCst),
            microphone_samples: self.microphone_samples.load(Ordering::SeqCst),
            audio_samples_total: self.audio_samples_total.load(Ordering::SeqCst),
            video_frames_dropped: self.video_frames_dropped.load(Ordering::SeqCst),
            audio_dropped_before_origin: self.audio_dropped_before_origin.load(Ordering::SeqCst),
        }
    }
}

/// Orchestrates one recording session
pub struct SessionController {
    session_id: Uuid,
    config: RecordingConfig,

    /// Current session state
    state: RwLock<SessionState>,

    /// Writer, track table, and origin time behind one lock
    writer: Mutex<WriterShared>,

    /// Capture source; only the start/stop paths touch it
    source: tokio::sync::Mutex<BoxSource>,

    /// Set-and-checked before any stop side effect begins
    stopping: AtomicBool,

    counters: Counters,

    /// Completion sender, consumed exactly once by the stop sequence
    done_tx: Mutex<Option<oneshot::Sender<SessionOutcome>>>,

    /// Size monitor handle while monitoring is active
    monitor: Mutex<Option<SizeMonitorHandle>>,

    /// Sample pump tasks, joined during stop so routing has quiesced
    /// before tracks are marked finished
    pumps: Mutex<Vec<JoinHandle<()>>>,

    trigger_tx: mpsc::Sender<StopTrigger>,
    trigger_rx: Mutex<Option<mpsc::Receiver<StopTrigger>>>,

    /// Event broadcaster
    event_tx: broadcast::Sender<SessionEvent>,

    /// Wall-clock start, for duration reporting
    started_at: Mutex<Option<Instant>>,

    probe: Arc<dyn SizeProbe>,
    monitor_tick: Duration,
}

impl SessionController {
    /// Configure a session: writer tracks first, then the matching source
    /// outputs
    ///
    /// The video track is mandatory and its failure is fatal. Audio tracks
    /// degrade: a track that cannot be added, or whose source output cannot
    /// be registered, is logged and skipped without failing the session.
    pub fn configure(
        config: RecordingConfig,
        mut writer: BoxWriter,
        mut source: BoxSource,
    ) -> RecordResult<Self> {
        let session_id = Uuid::new_v4();
        tracing::info!(
            %session_id,
            container = %config.container,
            "configuring session -> {:?}",
            config.output_path
        );

        let video_settings = TrackSettings::Video(VideoTrackSettings {
            width: config.width,
            height: config.height,
            frame_rate: config.frame_rate,
            bitrate: config.bitrate,
        });
        let audio_settings = TrackSettings::Audio(AudioTrackSettings {
            channels: config.audio_channels,
            sample_rate: config.audio_sample_rate,
        });

        let video = writer.add_track(SampleKind::Video, &video_settings)?;
        source.register_output(SampleKind::Video)?;

        let system_audio = if config.capture_system_audio {
            Self::add_audio_track(
                &mut writer,
                &mut *source,
                SampleKind::SystemAudio,
                &audio_settings,
            )
        } else {
            None
        };

        let microphone = if config.capture_microphone {
            Self::add_audio_track(
                &mut writer,
                &mut *source,
                SampleKind::Microphone,
                &audio_settings,
            )
        } else {
            None
        };

        let (trigger_tx, trigger_rx) = mpsc::channel(8);
        let (event_tx, _) = broadcast::channel(64);

        Ok(Self {
            session_id,
            config,
            state: RwLock::new(SessionState::Ready),
            writer: Mutex::new(WriterShared {
                writer,
                tracks: TrackSet {
                    video,
                    system_audio,
                    microphone,
                },
                origin_ms: None,
            }),
            source: tokio::sync::Mutex::new(source),
            stopping: AtomicBool::new(false),
            counters: Counters::default(),
            done_tx: Mutex::new(None),
            monitor: Mutex::new(None),
            pumps: Mutex::new(Vec::new()),
            trigger_tx,
            trigger_rx: Mutex::new(Some(trigger_rx)),
            event_tx,
            started_at: Mutex::new(None),
            probe: Arc::new(FsSizeProbe),
            monitor_tick: Duration::from_secs(1),
        })
    }

    /// Add an optional audio track and register its source output.
    /// Either failure degrades the capability instead of failing the
    /// session; a track added before a failed registration stays in the
    /// container and is finalized empty.
    fn add_audio_track(
        writer: &mut BoxWriter,
        source: &mut dyn crate::capture::CaptureSource,
        kind: SampleKind,
        settings: &TrackSettings,
    ) -> Option<TrackId> {
        let track = match writer.add_track(kind, settings) {
            Ok(track) => track,
            Err(e) => {
                tracing::warn!("could not add {} track, capture disabled: {}", kind, e);
                return None;
            }
        };

        if let Err(e) = source.register_output(kind) {
            tracing::warn!("could not register {} output, capture disabled: {}", kind, e);
        }
        Some(track)
    }

    /// Replace the size probe and poll cadence used by the size monitor
    pub fn with_size_monitor(mut self, probe: Arc<dyn SizeProbe>, tick: Duration) -> Self {
        self.probe = probe;
        self.monitor_tick = tick;
        self
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Sender for stop triggers (signal handlers, external stop requests)
    pub fn trigger_sender(&self) -> mpsc::Sender<StopTrigger> {
        self.trigger_tx.clone()
    }

    /// Snapshot of the routing counters
    pub fn counters(&self) -> SessionCounters {
        self.counters.snapshot()
    }

    /// Origin time of the session, once the first video sample arrived
    pub fn origin_ms(&self) -> Option<f64> {
        self.writer.lock().origin_ms
    }

    /// Wall-clock recording duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        (*self.started_at.lock())
            .map(|t| t.elapsed().as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }

    /// Start recording
    ///
    /// Fails without side effects unless the writer has never been
    /// started. On success the returned receiver resolves exactly once,
    /// with the session outcome, when finalization completes.
    pub async fn start(self: &Arc<Self>) -> RecordResult<oneshot::Receiver<SessionOutcome>> {
        // Taking the trigger receiver doubles as the start-once guard.
        let mut trigger_rx = self
            .trigger_rx
            .lock()
            .take()
            .ok_or_else(|| RecordError::Session("session already started".into()))?;

        {
            let mut shared = self.writer.lock();
            let status = shared.writer.status();
            if status != WriterStatus::Idle {
                return Err(RecordError::Session(format!(
                    "cannot start: writer is {}",
                    status
                )));
            }
            shared.writer.start_writing()?;
        }

        let streams = match self.source.lock().await.start().await {
            Ok(streams) => streams,
            Err(e) => {
                tracing::error!("capture source failed to start: {}", e);
                *self.state.write() = SessionState::Failed;
                return Err(e.into());
            }
        };

        let (done_tx, done_rx) = oneshot::channel();
        *self.done_tx.lock() = Some(done_tx);
        *self.started_at.lock() = Some(Instant::now());

        self.spawn_pumps(streams);

        if let Some(max_bytes) = self.config.max_size_bytes {
            let handle = SizeMonitor::spawn(
                self.config.output_path.clone(),
                SizeLimits {
                    max_bytes,
                    warning_percent: self.config.warning_percent,
                },
                Arc::clone(&self.probe),
                self.trigger_tx.clone(),
                self.event_tx.clone(),
                self.monitor_tick,
            );
            *self.monitor.lock() = Some(handle);
        }

        // Supervisor: the first trigger through the funnel runs the stop
        // sequence; everything after it hits the already-stopping guard.
        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            if let Some(trigger) = trigger_rx.recv().await {
                supervisor.stop(trigger).await;
            }
        });

        *self.state.write() = SessionState::Recording;
        let _ = self.event_tx.send(SessionEvent::Started);
        tracing::info!(session_id = %self.session_id, "recording started");

        Ok(done_rx)
    }

    /// Spawn one pump task per sample kind plus the fatal-error watcher.
    /// Per-kind channels keep producers independent; every pump routes
    /// through the same synchronized entry point.
    fn spawn_pumps(self: &Arc<Self>, streams: SourceStreams) {
        let mut pumps = Vec::new();

        let mut receivers = vec![streams.video];
        receivers.extend(streams.system_audio);
        receivers.extend(streams.microphone);

        for mut rx in receivers {
            let controller = Arc::clone(self);
            pumps.push(tokio::spawn(async move {
                while let Some(sample) = rx.recv().await {
                    controller.route(sample);
                }
            }));
        }

        // Not joined on stop: the oneshot is dropped unresolved on a clean
        // source stop, which ends this task on its own.
        let triggers = self.trigger_tx.clone();
        let fatal = streams.fatal;
        tokio::spawn(async move {
            if let Ok(err) = fatal.await {
                tracing::error!("capture source failed: {}", err);
                let _ = triggers.send(StopTrigger::SourceError).await;
            }
        });

        *self.pumps.lock() = pumps;
    }

    /// Route one arriving sample to its track
    ///
    /// Safe to call concurrently from the per-kind pump tasks. Samples
    /// still in flight once stopping has begun are dropped, never appended
    /// to a track being finished.
    pub fn route(&self, sample: Sample) {
        if self.stopping.load(Ordering::SeqCst) {
            tracing::debug!(kind = %sample.kind, "dropping sample arriving after stop began");
            return;
        }

        // Audio and any future kinds resolve through the track table; a
        // kind with no track is dropped in route_audio.
        match sample.kind {
            SampleKind::Video => self.route_video(sample),
            SampleKind::SystemAudio | SampleKind::Microphone => self.route_audio(sample),
        }
    }

    fn route_video(&self, sample: Sample) {
        let mut shared = self.writer.lock();

        let track = shared.tracks.video;
        if !shared.writer.is_ready(track) {
            // Backpressure is handled by dropping, not queuing; the source
            // decides delivery cadence.
            self.counters.video_frames_dropped.fetch_add(1, Ordering::SeqCst);
            tracing::debug!("video track not ready, dropping frame");
            return;
        }

        if shared.origin_ms.is_none() {
            shared.origin_ms = Some(sample.pts_ms);
            shared.writer.open_session(sample.pts_ms);
            tracing::info!(origin_ms = sample.pts_ms, "session origin established");
        }

        if shared.writer.append(track, &sample) {
            self.counters.frames_written.fetch_add(1, Ordering::SeqCst);
        } else {
            self.counters.video_frames_dropped.fetch_add(1, Ordering::SeqCst);
            if shared.writer.status() == WriterStatus::Failed {
                tracing::warn!("writer reported failed status on video append");
            } else {
                tracing::debug!("video append refused, dropping frame");
            }
        }
    }

    fn route_audio(&self, sample: Sample) {
        let mut shared = self.writer.lock();

        let Some(track) = shared.tracks.for_kind(sample.kind) else {
            return;
        };
        if !shared.writer.is_ready(track) {
            return;
        }
        if shared.origin_ms.is_none() {
            // Audio before the first video frame is dropped, never buffered.
            self.counters
                .audio_dropped_before_origin
                .fetch_add(1, Ordering::SeqCst);
            return;
        }

        if shared.writer.append(track, &sample) {
            match sample.kind {
                SampleKind::SystemAudio => {
                    self.counters.system_audio_samples.fetch_add(1, Ordering::SeqCst);
                }
                SampleKind::Microphone => {
                    self.counters.microphone_samples.fetch_add(1, Ordering::SeqCst);
                }
                _ => {}
            }
            self.counters.audio_samples_total.fetch_add(1, Ordering::SeqCst);
        } else if shared.writer.status() == WriterStatus::Failed {
            tracing::warn!(kind = %sample.kind, "writer reported failed status on audio append");
        }
    }

    /// Stop the session and finalize the output file
    ///
    /// Idempotent: the first caller wins the atomic guard and runs the
    /// whole sequence; every later trigger returns immediately. Order
    /// matters here — monitor cancellation is confirmed before the source
    /// stops, routing quiesces before tracks are marked finished, and the
    /// completion sender fires exactly once at the end.
    pub async fn stop(&self, trigger: StopTrigger) {
        if self.stopping.swap(true, Ordering::SeqCst) {
            tracing::debug!(%trigger, "stop requested but session is already stopping");
            return;
        }

        tracing::info!(%trigger, "stopping session");
        *self.state.write() = SessionState::Stopping;
        let _ = self.event_tx.send(SessionEvent::Stopping(trigger));

        let monitor = self.monitor.lock().take();
        if let Some(handle) = monitor {
            handle.cancel().await;
        }

        if let Err(e) = self.source.lock().await.stop().await {
            tracing::warn!("capture source did not stop cleanly: {}", e);
        }

        let pumps = std::mem::take(&mut *self.pumps.lock());
        for pump in pumps {
            if let Err(e) = pump.await {
                tracing::error!("sample pump panicked: {}", e);
            }
        }

        let finish_rx = {
            let mut shared = self.writer.lock();
            if shared.writer.status() == WriterStatus::Writing {
                for track in shared.tracks.all() {
                    shared.writer.mark_finished(track);
                }
                Some(shared.writer.finish_writing())
            } else {
                tracing::warn!(
                    status = %shared.writer.status(),
                    "writer not in a writing state at stop, nothing to finalize"
                );
                None
            }
        };

        let final_status = match finish_rx {
            Some(rx) => rx.await.unwrap_or(WriterStatus::Failed),
            None => self.writer.lock().writer.status(),
        };
        let error = self
            .writer
            .lock()
            .writer
            .take_error()
            .map(|e| e.to_string());

        let completed = final_status == WriterStatus::Completed;
        let counters = self.counters.snapshot();
        let duration_ms = self.duration_ms();

        let outcome = SessionOutcome {
            session_id: self.session_id,
            status: if completed {
                SessionStatus::Completed
            } else {
                SessionStatus::Failed
            },
            trigger,
            output_path: self.config.output_path.to_string_lossy().to_string(),
            duration_ms,
            counters,
            error,
            finished_at: Utc::now(),
        };

        *self.state.write() = if completed {
            SessionState::Finalized
        } else {
            SessionState::Failed
        };
        let _ = self.event_tx.send(if completed {
            SessionEvent::Finalized
        } else {
            SessionEvent::Error(format!("writer finished as {}", final_status))
        });

        tracing::info!(
            frames = counters.frames_written,
            audio_samples = counters.audio_samples_total,
            duration_ms,
            status = %final_status,
            "session finalized"
        );

        if let Some(done_tx) = self.done_tx.lock().take() {
            let _ = done_tx.send(outcome);
        }
    }
}
