#![allow(dead_code)]
// Test doubles for the session controller's collaborators.
//
// The mock writer and source keep their observable state behind an Arc
// handle so tests can script readiness/failures and inspect call order
// after the controller has taken ownership of the boxed trait object.

use async_trait::async_trait;
use parking_lot::Mutex;
use screenreel::capture::{CaptureError, CaptureSource, Sample, SampleKind, SourceStreams};
use screenreel::recorder::SizeProbe;
use screenreel::writer::{MediaWriter, TrackId, TrackSettings, WriterError, WriterStatus};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// One track inside the mock writer
pub struct MockTrack {
    pub kind: SampleKind,
    pub ready: bool,
    pub appended: Vec<f64>,
    pub finished: bool,
}

/// Shared, inspectable state of the mock writer
pub struct MockWriterState {
    pub status: Mutex<WriterStatus>,
    pub tracks: Mutex<Vec<MockTrack>>,
    pub opened_at: Mutex<Option<f64>>,
    pub finish_calls: AtomicU64,
    pub reject_tracks: Mutex<HashSet<SampleKind>>,
    pub finish_result: Mutex<WriterStatus>,
    pub calls: Mutex<Vec<String>>,
}

impl MockWriterState {
    pub fn set_ready(&self, track: TrackId, ready: bool) {
        self.tracks.lock()[track.0].ready = ready;
    }

    pub fn set_ready_for_kind(&self, kind: SampleKind, ready: bool) {
        for track in self.tracks.lock().iter_mut() {
            if track.kind == kind {
                track.ready = ready;
            }
        }
    }

    pub fn appended_for_kind(&self, kind: SampleKind) -> usize {
        self.tracks
            .lock()
            .iter()
            .filter(|t| t.kind == kind)
            .map(|t| t.appended.len())
            .sum()
    }

    pub fn all_tracks_finished(&self) -> bool {
        self.tracks.lock().iter().all(|t| t.finished)
    }

    pub fn track_kinds(&self) -> Vec<SampleKind> {
        self.tracks.lock().iter().map(|t| t.kind).collect()
    }
}

/// Scriptable media writer double
pub struct MockWriter {
    state: Arc<MockWriterState>,
}

impl MockWriter {
    pub fn new() -> (Self, Arc<MockWriterState>) {
        let state = Arc::new(MockWriterState {
            status: Mutex::new(WriterStatus::Idle),
            tracks: Mutex::new(Vec::new()),
            opened_at: Mutex::new(None),
            finish_calls: AtomicU64::new(0),
            reject_tracks: Mutex::new(HashSet::new()),
            finish_result: Mutex::new(WriterStatus::Completed),
            calls: Mutex::new(Vec::new()),
        });
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }

    /// Writer that refuses to add tracks of the given kinds
    pub fn rejecting(kinds: &[SampleKind]) -> (Self, Arc<MockWriterState>) {
        let (writer, state) = Self::new();
        state.reject_tracks.lock().extend(kinds.iter().copied());
        (writer, state)
    }
}

impl MediaWriter for MockWriter {
    fn add_track(
        &mut self,
        kind: SampleKind,
        _settings: &TrackSettings,
    ) -> Result<TrackId, WriterError> {
        if self.state.reject_tracks.lock().contains(&kind) {
            return Err(WriterError::TrackNotSupported(kind));
        }
        let mut tracks = self.state.tracks.lock();
        tracks.push(MockTrack {
            kind,
            ready: true,
            appended: Vec::new(),
            finished: false,
        });
        Ok(TrackId(tracks.len() - 1))
    }

    fn start_writing(&mut self) -> Result<(), WriterError> {
        let mut status = self.state.status.lock();
        if *status != WriterStatus::Idle {
            return Err(WriterError::InvalidState {
                expected: WriterStatus::Idle,
                actual: *status,
            });
        }
        *status = WriterStatus::Writing;
        self.state.calls.lock().push("start_writing".to_string());
        Ok(())
    }

    fn open_session(&mut self, at_ms: f64) {
        *self.state.opened_at.lock() = Some(at_ms);
        self.state
            .calls
            .lock()
            .push(format!("open_session:{}", at_ms));
    }

    fn is_ready(&self, track: TrackId) -> bool {
        self.state
            .tracks
            .lock()
            .get(track.0)
            .map(|t| t.ready && !t.finished)
            .unwrap_or(false)
    }

    fn append(&mut self, track: TrackId, sample: &Sample) -> bool {
        if *self.state.status.lock() != WriterStatus::Writing {
            return false;
        }
        let mut tracks = self.state.tracks.lock();
        let track = &mut tracks[track.0];
        if !track.ready || track.finished {
            return false;
        }
        track.appended.push(sample.pts_ms);
        true
    }

    fn mark_finished(&mut self, track: TrackId) {
        let mut tracks = self.state.tracks.lock();
        let kind = tracks[track.0].kind;
        tracks[track.0].finished = true;
        self.state
            .calls
            .lock()
            .push(format!("mark_finished:{}", kind));
    }

    fn finish_writing(&mut self) -> oneshot::Receiver<WriterStatus> {
        self.state.finish_calls.fetch_add(1, Ordering::SeqCst);
        self.state.calls.lock().push("finish_writing".to_string());
        let result = *self.state.finish_result.lock();
        *self.state.status.lock() = result;
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        rx
    }

    fn status(&self) -> WriterStatus {
        *self.state.status.lock()
    }

    fn take_error(&mut self) -> Option<WriterError> {
        if *self.state.status.lock() == WriterStatus::Failed {
            Some(WriterError::Failed("mock writer failed".to_string()))
        } else {
            None
        }
    }
}

struct SenderSet {
    video: mpsc::Sender<Sample>,
    system_audio: Option<mpsc::Sender<Sample>>,
    microphone: Option<mpsc::Sender<Sample>>,
}

/// Shared, inspectable state of the mock source
pub struct SourceHandle {
    senders: Mutex<Option<SenderSet>>,
    fatal: Mutex<Option<oneshot::Sender<CaptureError>>>,
    pub registered: Mutex<HashSet<SampleKind>>,
    pub stop_calls: AtomicU64,
}

impl SourceHandle {
    /// Push one sample into the running source; false once stopped
    pub async fn send(&self, kind: SampleKind, pts_ms: f64) -> bool {
        let tx = {
            let senders = self.senders.lock();
            senders.as_ref().and_then(|s| match kind {
                SampleKind::Video => Some(s.video.clone()),
                SampleKind::SystemAudio => s.system_audio.clone(),
                SampleKind::Microphone => s.microphone.clone(),
                _ => None,
            })
        };
        match tx {
            Some(tx) => {
                tx.send(Sample::new(kind, pts_ms, vec![0u8; 16]))
                    .await
                    .is_ok()
            }
            None => false,
        }
    }

    /// Simulate a fatal pipeline failure
    pub fn raise_fatal(&self, error: CaptureError) {
        if let Some(tx) = self.fatal.lock().take() {
            let _ = tx.send(error);
        }
    }
}

/// Scriptable capture source double
pub struct MockSource {
    handle: Arc<SourceHandle>,
    reject_outputs: HashSet<SampleKind>,
}

impl MockSource {
    pub fn new() -> (Self, Arc<SourceHandle>) {
        let handle = Arc::new(SourceHandle {
            senders: Mutex::new(None),
            fatal: Mutex::new(None),
            registered: Mutex::new(HashSet::new()),
            stop_calls: AtomicU64::new(0),
        });
        (
            Self {
                handle: Arc::clone(&handle),
                reject_outputs: HashSet::new(),
            },
            handle,
        )
    }

    /// Source that refuses to register outputs of the given kinds
    pub fn rejecting(kinds: &[SampleKind]) -> (Self, Arc<SourceHandle>) {
        let (mut source, handle) = Self::new();
        source.reject_outputs.extend(kinds.iter().copied());
        (source, handle)
    }
}

#[async_trait]
impl CaptureSource for MockSource {
    fn register_output(&mut self, kind: SampleKind) -> Result<(), CaptureError> {
        if self.reject_outputs.contains(&kind) {
            return Err(CaptureError::OutputNotSupported(kind));
        }
        self.handle.registered.lock().insert(kind);
        Ok(())
    }

    async fn start(&mut self) -> Result<SourceStreams, CaptureError> {
        let registered = self.handle.registered.lock().clone();

        let (video_tx, video_rx) = mpsc::channel(64);
        let (system_audio_tx, system_audio_rx) = if registered.contains(&SampleKind::SystemAudio) {
            let (tx, rx) = mpsc::channel(64);
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };
        let (microphone_tx, microphone_rx) = if registered.contains(&SampleKind::Microphone) {
            let (tx, rx) = mpsc::channel(64);
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };
        let (fatal_tx, fatal_rx) = oneshot::channel();

        *self.handle.senders.lock() = Some(SenderSet {
            video: video_tx,
            system_audio: system_audio_tx,
            microphone: microphone_tx,
        });
        *self.handle.fatal.lock() = Some(fatal_tx);

        Ok(SourceStreams {
            video: video_rx,
            system_audio: system_audio_rx,
            microphone: microphone_rx,
            fatal: fatal_rx,
        })
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        self.handle.stop_calls.fetch_add(1, Ordering::SeqCst);
        // Dropping the senders drains the pumps; dropping the fatal sender
        // ends the error watcher.
        *self.handle.senders.lock() = None;
        *self.handle.fatal.lock() = None;
        Ok(())
    }
}

/// Size probe driven by a closure of the 1-based call index
pub struct FnProbe {
    calls: AtomicU64,
    f: Box<dyn Fn(u64) -> std::io::Result<u64> + Send + Sync>,
}

impl FnProbe {
    pub fn new(f: impl Fn(u64) -> std::io::Result<u64> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU64::new(0),
            f: Box::new(f),
        })
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SizeProbe for FnProbe {
    fn size_of(&self, _path: &Path) -> std::io::Result<u64> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        (self.f)(call)
    }
}
