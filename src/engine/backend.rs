use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;

/// Card index of the digital microphone input
pub const CARD_DMIC: u32 = 1;
/// Card index of the analog line-in input
pub const CARD_LINEIN: u32 = 0;
/// Default sub-device index
pub const DEVICE_DEFAULT: u32 = 0;

pub const DEFAULT_CHANNELS: u16 = 2;
pub const DEFAULT_RATE_DMIC: u32 = 48000;
pub const DEFAULT_RATE_LINEIN: u32 = 44100;
pub const DEFAULT_BITS: u16 = 16;
pub const DEFAULT_PERIOD_SIZE: u32 = 1024;
pub const DEFAULT_PERIOD_COUNT: u32 = 4;

/// Event emitted by the engine while a test operation runs
///
/// Zero or more `Progress` events followed by exactly one `Complete`
/// event per operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TestEvent {
    /// Percentage of the operation finished (0..=100, non-decreasing)
    Progress { percent: u8 },
    /// Final outcome of the operation
    Complete { success: bool, message: String },
}

/// Opaque engine failure: a non-zero numeric code plus a human-readable
/// description. The code space is engine-defined.
#[derive(Debug, Clone)]
pub struct EngineFailure {
    pub code: i32,
    pub message: String,
}

impl EngineFailure {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for EngineFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "engine error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for EngineFailure {}

/// Direction of a raw PCM stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PcmDirection {
    Capture,
    Playback,
}

/// Hardware endpoint parameters for one PCM stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmParams {
    pub card: u32,
    pub device: u32,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits: u16,
    pub period_size: u32,
    pub period_count: u32,
}

impl PcmParams {
    /// Digital microphone capture route (card 1, 48 kHz stereo)
    pub fn dmic() -> Self {
        Self {
            card: CARD_DMIC,
            device: DEVICE_DEFAULT,
            channels: DEFAULT_CHANNELS,
            sample_rate: DEFAULT_RATE_DMIC,
            bits: DEFAULT_BITS,
            period_size: DEFAULT_PERIOD_SIZE,
            period_count: DEFAULT_PERIOD_COUNT,
        }
    }

    /// Analog line-in capture route (card 0, 44.1 kHz stereo)
    pub fn linein() -> Self {
        Self {
            card: CARD_LINEIN,
            sample_rate: DEFAULT_RATE_LINEIN,
            ..Self::dmic()
        }
    }

    /// Default playback route (card 0); the engine takes the actual
    /// rate and channel count from the file being played.
    pub fn default_output() -> Self {
        Self {
            card: CARD_LINEIN,
            ..Self::dmic()
        }
    }

    /// Total PCM buffer size in bytes
    pub fn buffer_bytes(&self) -> usize {
        self.period_size as usize
            * self.period_count as usize
            * self.channels as usize
            * (self.bits as usize / 8)
    }
}

/// Handle to an open PCM stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PcmHandle(pub u32);

/// Handle to an open mixer control context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MixerHandle(pub u32);

/// Contract of the native audio engine
///
/// The real implementation lives in a vendor library driving ALSA; the
/// in-tree [`SimEngine`](super::sim::SimEngine) implements the same
/// contract in-process so the session layer can be exercised without
/// hardware.
///
/// Record and playback block until the operation finishes. While one
/// runs, the engine posts [`TestEvent`]s to the registered sink, if
/// any. Behavior of overlapping operations on the same device is
/// engine-defined.
#[async_trait::async_trait]
pub trait AudioEngine: Send + Sync {
    /// Capture `duration` of audio from the route described by `params`
    /// and write it as a WAV file at `path` (overwriting any existing
    /// file).
    async fn record(&self, params: &PcmParams, path: &Path, duration: Duration) -> Result<()>;

    /// Play the WAV file at `path` through the output route described
    /// by `params`.
    async fn playback(&self, params: &PcmParams, path: &Path) -> Result<()>;

    /// Register the event sink for progress/completion events, or
    /// deregister it with `None`. Registering replaces any previous
    /// sink; deregistering redundantly is a no-op.
    fn set_event_sink(&self, sink: Option<mpsc::UnboundedSender<TestEvent>>);

    // Raw PCM surface

    fn pcm_open(&self, params: &PcmParams, direction: PcmDirection) -> Result<PcmHandle>;
    fn pcm_close(&self, handle: PcmHandle) -> Result<()>;
    fn pcm_start(&self, handle: PcmHandle) -> Result<()>;
    fn pcm_stop(&self, handle: PcmHandle) -> Result<()>;
    /// Write raw interleaved sample bytes; returns the byte count accepted
    fn pcm_write(&self, handle: PcmHandle, data: &[u8]) -> Result<usize>;
    /// Read raw interleaved sample bytes; returns the byte count filled
    fn pcm_read(&self, handle: PcmHandle, data: &mut [u8]) -> Result<usize>;
    fn pcm_buffer_size(&self, handle: PcmHandle) -> Result<usize>;

    // Mixer surface

    fn mixer_open(&self, card: u32) -> Result<MixerHandle>;
    fn mixer_close(&self, handle: MixerHandle) -> Result<()>;
    fn mixer_set(&self, handle: MixerHandle, control: &str, value: i32) -> Result<()>;
    fn mixer_get(&self, handle: MixerHandle, control: &str) -> Result<i32>;

    /// Engine name for logging
    fn name(&self) -> &str;
}
