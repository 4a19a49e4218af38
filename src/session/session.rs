use super::listener::TestListener;
use super::params::{Operation, OperationKind, DEFAULT_RECORD_SECS};
use super::stats::SessionStats;
use crate::engine::{
    AudioEngine, EngineFailure, MixerHandle, PcmDirection, PcmHandle, PcmParams, TestEvent,
};
use anyhow::Result;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Result code returned when an engine error carries no numeric code
pub const CODE_UNKNOWN_FAILURE: i32 = -1;

/// Façade over the audio engine for the four hardware test operations
///
/// A session owns at most one registered [`TestListener`]. Engine
/// events flow through an internal channel drained by a background
/// task, so listener callbacks never run on an engine thread. The
/// session performs no locking around operations themselves: callers
/// that need serialized access to one device must serialize their own
/// calls, and overlapping operations are engine-defined.
pub struct AudioTestSession {
    id: String,
    engine: Arc<dyn AudioEngine>,
    listener: Arc<RwLock<Option<Arc<dyn TestListener>>>>,
    last_error: RwLock<String>,
    event_tx: mpsc::UnboundedSender<TestEvent>,
    drain_task: JoinHandle<()>,
    started_at: chrono::DateTime<Utc>,
    operations_run: AtomicUsize,
    failures: AtomicUsize,
}

impl AudioTestSession {
    /// Create a session over `engine`. Must be called from within a
    /// tokio runtime; the event drain task is spawned here.
    pub fn new(engine: Arc<dyn AudioEngine>) -> Self {
        let id = format!("audiotest-{}", uuid::Uuid::new_v4());
        info!("Creating audio test session {} (engine: {})", id, engine.name());

        let listener: Arc<RwLock<Option<Arc<dyn TestListener>>>> = Arc::new(RwLock::new(None));
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<TestEvent>();

        // Drain engine events and forward them to whichever listener is
        // registered at delivery time. An event racing a deregistration
        // is dropped, never delivered to a stale listener.
        let drain_listener = Arc::clone(&listener);
        let drain_task = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                let current = drain_listener
                    .read()
                    .unwrap_or_else(|p| p.into_inner())
                    .clone();

                match (current, event) {
                    (Some(l), TestEvent::Progress { percent }) => l.on_progress(percent),
                    (Some(l), TestEvent::Complete { success, message }) => {
                        l.on_complete(success, &message)
                    }
                    (None, event) => debug!("No listener registered, dropping {:?}", event),
                }
            }
        });

        Self {
            id,
            engine,
            listener,
            last_error: RwLock::new(String::new()),
            event_tx,
            drain_task,
            started_at: Utc::now(),
            operations_run: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Register `listener` for progress/completion events, or
    /// deregister with `None`. Returns the previously registered
    /// listener; its disposal is the caller's responsibility.
    /// Redundant deregistration is a no-op.
    pub fn set_listener(
        &self,
        listener: Option<Arc<dyn TestListener>>,
    ) -> Option<Arc<dyn TestListener>> {
        let registered = listener.is_some();
        let previous = {
            let mut slot = self.listener.write().unwrap_or_else(|p| p.into_inner());
            std::mem::replace(&mut *slot, listener)
        };

        // Keep the engine-side registration in step so a cleared
        // session stops receiving events at the source.
        if registered {
            self.engine.set_event_sink(Some(self.event_tx.clone()));
        } else {
            self.engine.set_event_sink(None);
        }

        previous
    }

    /// Most recent failure description; empty before any failure and
    /// overwritten by each failing call.
    pub fn last_error(&self) -> String {
        self.last_error
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            session_id: self.id.clone(),
            started_at: self.started_at,
            operations_run: self.operations_run.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
            last_error: self.last_error(),
        }
    }

    /// Record from the digital microphone into `file_path`
    pub async fn dmic_record(&self, file_path: impl Into<PathBuf>, duration_secs: u32) -> i32 {
        self.run(Operation::record(
            OperationKind::DmicRecord,
            file_path,
            duration_secs,
        ))
        .await
    }

    /// Play a DMIC recording through the default output route
    pub async fn dmic_playback(&self, file_path: impl Into<PathBuf>) -> i32 {
        self.run(Operation::playback(
            OperationKind::DmicPlayback,
            file_path,
        ))
        .await
    }

    /// Record from the analog line-in into `file_path`
    pub async fn linein_record(&self, file_path: impl Into<PathBuf>, duration_secs: u32) -> i32 {
        self.run(Operation::record(
            OperationKind::LineinRecord,
            file_path,
            duration_secs,
        ))
        .await
    }

    /// Play a line-in recording through the default output route
    pub async fn linein_playback(&self, file_path: impl Into<PathBuf>) -> i32 {
        self.run(Operation::playback(
            OperationKind::LineinPlayback,
            file_path,
        ))
        .await
    }

    /// Dispatch one operation to the engine and convert its outcome to
    /// a result code: 0 on success, the engine's failure code (or
    /// [`CODE_UNKNOWN_FAILURE`]) otherwise.
    pub async fn run(&self, op: Operation) -> i32 {
        info!("Session {}: running {} on {}", self.id, op.kind, op.file_path.display());
        self.operations_run.fetch_add(1, Ordering::SeqCst);

        let params = op.kind.pcm_params();
        let outcome = if op.kind.is_record() {
            let secs = op.duration_seconds.unwrap_or(DEFAULT_RECORD_SECS);
            self.engine
                .record(&params, &op.file_path, Duration::from_secs(secs as u64))
                .await
        } else {
            self.engine.playback(&params, &op.file_path).await
        };

        match outcome {
            Ok(()) => 0,
            Err(e) => {
                let code = e
                    .downcast_ref::<EngineFailure>()
                    .map(|f| f.code)
                    .unwrap_or(CODE_UNKNOWN_FAILURE);
                warn!("Session {}: {} failed with code {}: {:#}", self.id, op.kind, code, e);
                self.remember_failure(format!("{:#}", e));
                code
            }
        }
    }

    // Pass-through PCM surface for advanced callers; failures are
    // recorded in last-error like test operations.

    pub fn pcm_open(&self, params: &PcmParams, direction: PcmDirection) -> Result<PcmHandle> {
        self.engine
            .pcm_open(params, direction)
            .map_err(|e| self.noted(e))
    }

    pub fn pcm_close(&self, handle: PcmHandle) -> Result<()> {
        self.engine.pcm_close(handle).map_err(|e| self.noted(e))
    }

    pub fn pcm_start(&self, handle: PcmHandle) -> Result<()> {
        self.engine.pcm_start(handle).map_err(|e| self.noted(e))
    }

    pub fn pcm_stop(&self, handle: PcmHandle) -> Result<()> {
        self.engine.pcm_stop(handle).map_err(|e| self.noted(e))
    }

    pub fn pcm_write(&self, handle: PcmHandle, data: &[u8]) -> Result<usize> {
        self.engine.pcm_write(handle, data).map_err(|e| self.noted(e))
    }

    pub fn pcm_read(&self, handle: PcmHandle, data: &mut [u8]) -> Result<usize> {
        self.engine.pcm_read(handle, data).map_err(|e| self.noted(e))
    }

    pub fn pcm_buffer_size(&self, handle: PcmHandle) -> Result<usize> {
        self.engine.pcm_buffer_size(handle).map_err(|e| self.noted(e))
    }

    // Pass-through mixer surface

    pub fn mixer_open(&self, card: u32) -> Result<MixerHandle> {
        self.engine.mixer_open(card).map_err(|e| self.noted(e))
    }

    pub fn mixer_close(&self, handle: MixerHandle) -> Result<()> {
        self.engine.mixer_close(handle).map_err(|e| self.noted(e))
    }

    pub fn mixer_set(&self, handle: MixerHandle, control: &str, value: i32) -> Result<()> {
        self.engine
            .mixer_set(handle, control, value)
            .map_err(|e| self.noted(e))
    }

    pub fn mixer_get(&self, handle: MixerHandle, control: &str) -> Result<i32> {
        self.engine
            .mixer_get(handle, control)
            .map_err(|e| self.noted(e))
    }

    fn remember_failure(&self, message: String) {
        self.failures.fetch_add(1, Ordering::SeqCst);
        let mut slot = self.last_error.write().unwrap_or_else(|p| p.into_inner());
        *slot = message;
    }

    fn noted(&self, e: anyhow::Error) -> anyhow::Error {
        self.remember_failure(format!("{:#}", e));
        e
    }
}

impl Drop for AudioTestSession {
    fn drop(&mut self) {
        // Tear down the engine registration before the drain task so no
        // event targets a dead session.
        self.engine.set_event_sink(None);
        self.drain_task.abort();
    }
}
