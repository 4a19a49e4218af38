use anyhow::Result;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::backend::{
    AudioEngine, EngineFailure, MixerHandle, PcmDirection, PcmHandle, PcmParams, TestEvent,
    CARD_DMIC, CARD_LINEIN,
};

/// Engine-defined failure codes reported by the simulated engine
pub mod codes {
    /// Bad argument (zero duration, unsupported bit depth, unknown control)
    pub const INVALID_ARGUMENT: i32 = 1;
    /// Filesystem or device I/O error
    pub const IO: i32 = 2;
    /// File exists but is not playable audio
    pub const BAD_FORMAT: i32 = 3;
    /// Operation on a closed or unknown handle
    pub const BAD_HANDLE: i32 = 4;
}

/// Frequency of the synthesized test tone
const TEST_TONE_HZ: f32 = 440.0;
/// Test tone amplitude relative to full scale
const TEST_TONE_GAIN: f32 = 0.3;

/// Configuration for the simulated engine
#[derive(Debug, Clone)]
pub struct SimEngineConfig {
    /// Wall-clock pacing per simulated second of audio. Zero (the
    /// default) runs operations as fast as they can be computed.
    pub tick: Duration,
}

impl Default for SimEngineConfig {
    fn default() -> Self {
        Self {
            tick: Duration::ZERO,
        }
    }
}

struct PcmStream {
    params: PcmParams,
    direction: PcmDirection,
    running: bool,
    buffer: VecDeque<u8>,
}

struct MixerContext {
    card: u32,
    controls: HashMap<String, i32>,
}

/// In-process engine implementing the full [`AudioEngine`] contract
///
/// Record synthesizes a test tone and writes it as a 16-bit WAV file;
/// playback reads the file back and consumes every sample. PCM handles
/// are loopback byte buffers and mixer handles are per-card control
/// maps, enough to exercise the pass-through surface.
pub struct SimEngine {
    config: SimEngineConfig,
    sink: Mutex<Option<mpsc::UnboundedSender<TestEvent>>>,
    pcm_streams: Mutex<HashMap<u32, PcmStream>>,
    mixers: Mutex<HashMap<u32, MixerContext>>,
    next_handle: AtomicU32,
}

impl SimEngine {
    pub fn new(config: SimEngineConfig) -> Self {
        info!("Simulated audio engine initialized (tick: {:?})", config.tick);

        Self {
            config,
            sink: Mutex::new(None),
            pcm_streams: Mutex::new(HashMap::new()),
            mixers: Mutex::new(HashMap::new()),
            next_handle: AtomicU32::new(1),
        }
    }

    fn fail(code: i32, message: impl Into<String>) -> anyhow::Error {
        EngineFailure::new(code, message).into()
    }

    fn emit(&self, event: TestEvent) {
        let sink = self.sink.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(tx) = sink.as_ref() {
            // A receiver dropped mid-operation just means nobody is
            // listening anymore; not an engine failure.
            if tx.send(event).is_err() {
                debug!("Event sink closed, dropping event");
            }
        }
    }

    fn emit_progress(&self, done: u64, total: u64) {
        let percent = if total == 0 {
            100
        } else {
            ((done * 100) / total).min(100) as u8
        };
        self.emit(TestEvent::Progress { percent });
    }

    async fn pace(&self) {
        if !self.config.tick.is_zero() {
            tokio::time::sleep(self.config.tick).await;
        }
    }

    async fn do_record(&self, params: &PcmParams, path: &Path, duration: Duration) -> Result<()> {
        let seconds = duration.as_secs();
        if seconds == 0 {
            return Err(Self::fail(
                codes::INVALID_ARGUMENT,
                "record duration must be at least one second",
            ));
        }
        if params.bits != 16 {
            return Err(Self::fail(
                codes::INVALID_ARGUMENT,
                format!("unsupported bit depth: {}", params.bits),
            ));
        }

        info!(
            "Recording {}s from card {} device {} to {}",
            seconds,
            params.card,
            params.device,
            path.display()
        );

        let spec = hound::WavSpec {
            channels: params.channels,
            sample_rate: params.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(path, spec).map_err(|e| {
            Self::fail(codes::IO, format!("cannot create {}: {}", path.display(), e))
        })?;

        let rate = params.sample_rate as u64;
        self.emit_progress(0, seconds);

        for sec in 0..seconds {
            for i in 0..rate {
                let t = (sec * rate + i) as f32 / params.sample_rate as f32;
                let sample = (TEST_TONE_GAIN
                    * i16::MAX as f32
                    * (2.0 * std::f32::consts::PI * TEST_TONE_HZ * t).sin())
                    as i16;

                for _ in 0..params.channels {
                    writer.write_sample(sample).map_err(|e| {
                        Self::fail(codes::IO, format!("write to {}: {}", path.display(), e))
                    })?;
                }
            }

            self.pace().await;
            self.emit_progress(sec + 1, seconds);
        }

        writer.finalize().map_err(|e| {
            Self::fail(codes::IO, format!("finalize {}: {}", path.display(), e))
        })?;

        Ok(())
    }

    async fn do_playback(&self, params: &PcmParams, path: &Path) -> Result<()> {
        let mut reader = hound::WavReader::open(path).map_err(|e| {
            Self::fail(codes::IO, format!("cannot open {}: {}", path.display(), e))
        })?;

        let spec = reader.spec();
        if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
            return Err(Self::fail(
                codes::BAD_FORMAT,
                format!(
                    "{}: expected 16-bit integer PCM, got {}-bit {:?}",
                    path.display(),
                    spec.bits_per_sample,
                    spec.sample_format
                ),
            ));
        }

        let samples: Vec<i16> = reader
            .samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                Self::fail(codes::BAD_FORMAT, format!("{}: {}", path.display(), e))
            })?;

        if samples.is_empty() {
            return Err(Self::fail(
                codes::BAD_FORMAT,
                format!("{}: file contains no audio", path.display()),
            ));
        }

        info!(
            "Playing {} ({} samples, {}Hz, {}ch) on card {}",
            path.display(),
            samples.len(),
            spec.sample_rate,
            spec.channels,
            params.card
        );

        // Consume the stream one second at a time, reporting progress
        let per_second = (spec.sample_rate as usize * spec.channels as usize).max(1);
        let total = samples.len();
        self.emit_progress(0, total as u64);

        let mut played = 0usize;
        for chunk in samples.chunks(per_second) {
            // A real engine would hand the chunk to the PCM device here
            played += chunk.len();
            self.pace().await;
            self.emit_progress(played as u64, total as u64);
        }

        Ok(())
    }

    fn alloc_handle(&self) -> u32 {
        self.next_handle.fetch_add(1, Ordering::SeqCst)
    }

    /// Controls seeded on a freshly opened mixer context
    fn seed_controls(card: u32) -> HashMap<String, i32> {
        let mut controls = HashMap::new();
        match card {
            CARD_DMIC => {
                controls.insert("DMIC Capture Volume".to_string(), 60);
                controls.insert("DMIC Capture Switch".to_string(), 1);
            }
            CARD_LINEIN => {
                controls.insert("Line In Capture Volume".to_string(), 60);
                controls.insert("Line In Capture Switch".to_string(), 1);
                controls.insert("Master Playback Volume".to_string(), 80);
            }
            _ => {}
        }
        controls
    }
}

#[async_trait::async_trait]
impl AudioEngine for SimEngine {
    async fn record(&self, params: &PcmParams, path: &Path, duration: Duration) -> Result<()> {
        match self.do_record(params, path, duration).await {
            Ok(()) => {
                self.emit(TestEvent::Complete {
                    success: true,
                    message: format!(
                        "recorded {}s to {}",
                        duration.as_secs(),
                        path.display()
                    ),
                });
                Ok(())
            }
            Err(e) => {
                self.emit(TestEvent::Complete {
                    success: false,
                    message: format!("{:#}", e),
                });
                Err(e)
            }
        }
    }

    async fn playback(&self, params: &PcmParams, path: &Path) -> Result<()> {
        match self.do_playback(params, path).await {
            Ok(()) => {
                self.emit(TestEvent::Complete {
                    success: true,
                    message: format!("played {}", path.display()),
                });
                Ok(())
            }
            Err(e) => {
                self.emit(TestEvent::Complete {
                    success: false,
                    message: format!("{:#}", e),
                });
                Err(e)
            }
        }
    }

    fn set_event_sink(&self, sink: Option<mpsc::UnboundedSender<TestEvent>>) {
        let mut slot = self.sink.lock().unwrap_or_else(|p| p.into_inner());
        match (&*slot, &sink) {
            (Some(_), None) => debug!("Event sink deregistered"),
            (_, Some(_)) => debug!("Event sink registered"),
            (None, None) => {}
        }
        *slot = sink;
    }

    fn pcm_open(&self, params: &PcmParams, direction: PcmDirection) -> Result<PcmHandle> {
        if params.bits != 16 {
            return Err(Self::fail(
                codes::INVALID_ARGUMENT,
                format!("unsupported bit depth: {}", params.bits),
            ));
        }

        let id = self.alloc_handle();
        let mut streams = self.pcm_streams.lock().unwrap_or_else(|p| p.into_inner());
        streams.insert(
            id,
            PcmStream {
                params: *params,
                direction,
                running: false,
                buffer: VecDeque::new(),
            },
        );

        debug!(
            "PCM opened: handle {} card {} device {} ({:?})",
            id, params.card, params.device, direction
        );
        Ok(PcmHandle(id))
    }

    fn pcm_close(&self, handle: PcmHandle) -> Result<()> {
        let mut streams = self.pcm_streams.lock().unwrap_or_else(|p| p.into_inner());
        streams
            .remove(&handle.0)
            .map(|_| ())
            .ok_or_else(|| Self::fail(codes::BAD_HANDLE, format!("no PCM stream {}", handle.0)))
    }

    fn pcm_start(&self, handle: PcmHandle) -> Result<()> {
        let mut streams = self.pcm_streams.lock().unwrap_or_else(|p| p.into_inner());
        let stream = streams
            .get_mut(&handle.0)
            .ok_or_else(|| Self::fail(codes::BAD_HANDLE, format!("no PCM stream {}", handle.0)))?;
        stream.running = true;
        Ok(())
    }

    fn pcm_stop(&self, handle: PcmHandle) -> Result<()> {
        let mut streams = self.pcm_streams.lock().unwrap_or_else(|p| p.into_inner());
        let stream = streams
            .get_mut(&handle.0)
            .ok_or_else(|| Self::fail(codes::BAD_HANDLE, format!("no PCM stream {}", handle.0)))?;
        stream.running = false;
        Ok(())
    }

    fn pcm_write(&self, handle: PcmHandle, data: &[u8]) -> Result<usize> {
        let mut streams = self.pcm_streams.lock().unwrap_or_else(|p| p.into_inner());
        let stream = streams
            .get_mut(&handle.0)
            .ok_or_else(|| Self::fail(codes::BAD_HANDLE, format!("no PCM stream {}", handle.0)))?;
        stream.buffer.extend(data.iter().copied());
        Ok(data.len())
    }

    fn pcm_read(&self, handle: PcmHandle, data: &mut [u8]) -> Result<usize> {
        let mut streams = self.pcm_streams.lock().unwrap_or_else(|p| p.into_inner());
        let stream = streams
            .get_mut(&handle.0)
            .ok_or_else(|| Self::fail(codes::BAD_HANDLE, format!("no PCM stream {}", handle.0)))?;

        let mut filled = 0;
        while filled < data.len() {
            match stream.buffer.pop_front() {
                Some(byte) => {
                    data[filled] = byte;
                    filled += 1;
                }
                None => break,
            }
        }

        // A capture device always has signal; pad with silence
        if stream.direction == PcmDirection::Capture {
            for slot in &mut data[filled..] {
                *slot = 0;
            }
            filled = data.len();
        }

        Ok(filled)
    }

    fn pcm_buffer_size(&self, handle: PcmHandle) -> Result<usize> {
        let streams = self.pcm_streams.lock().unwrap_or_else(|p| p.into_inner());
        let stream = streams
            .get(&handle.0)
            .ok_or_else(|| Self::fail(codes::BAD_HANDLE, format!("no PCM stream {}", handle.0)))?;
        Ok(stream.params.buffer_bytes())
    }

    fn mixer_open(&self, card: u32) -> Result<MixerHandle> {
        let id = self.alloc_handle();
        let mut mixers = self.mixers.lock().unwrap_or_else(|p| p.into_inner());
        mixers.insert(
            id,
            MixerContext {
                card,
                controls: Self::seed_controls(card),
            },
        );

        debug!("Mixer opened: handle {} card {}", id, card);
        Ok(MixerHandle(id))
    }

    fn mixer_close(&self, handle: MixerHandle) -> Result<()> {
        let mut mixers = self.mixers.lock().unwrap_or_else(|p| p.into_inner());
        mixers
            .remove(&handle.0)
            .map(|_| ())
            .ok_or_else(|| Self::fail(codes::BAD_HANDLE, format!("no mixer {}", handle.0)))
    }

    fn mixer_set(&self, handle: MixerHandle, control: &str, value: i32) -> Result<()> {
        let mut mixers = self.mixers.lock().unwrap_or_else(|p| p.into_inner());
        let mixer = mixers
            .get_mut(&handle.0)
            .ok_or_else(|| Self::fail(codes::BAD_HANDLE, format!("no mixer {}", handle.0)))?;

        match mixer.controls.get_mut(control) {
            Some(slot) => {
                debug!("Mixer {} (card {}): {} = {}", handle.0, mixer.card, control, value);
                *slot = value;
                Ok(())
            }
            None => Err(Self::fail(
                codes::INVALID_ARGUMENT,
                format!("card {} has no control '{}'", mixer.card, control),
            )),
        }
    }

    fn mixer_get(&self, handle: MixerHandle, control: &str) -> Result<i32> {
        let mixers = self.mixers.lock().unwrap_or_else(|p| p.into_inner());
        let mixer = mixers
            .get(&handle.0)
            .ok_or_else(|| Self::fail(codes::BAD_HANDLE, format!("no mixer {}", handle.0)))?;

        mixer.controls.get(control).copied().ok_or_else(|| {
            Self::fail(
                codes::INVALID_ARGUMENT,
                format!("card {} has no control '{}'", mixer.card, control),
            )
        })
    }

    fn name(&self) -> &str {
        "sim"
    }
}
