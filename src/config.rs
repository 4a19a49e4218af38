use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub audio: AudioConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// Directory test recordings are written to and played from
    pub music_dir: String,
    /// Record duration applied when a command does not override it
    pub record_duration_secs: u32,
}

#[derive(Debug, Deserialize)]
pub struct EngineConfig {
    /// Wall-clock milliseconds the simulated engine spends per second
    /// of audio; zero runs operations at full speed
    pub tick_ms: u64,
}

impl Config {
    /// Load configuration from `path` (extension-less config file
    /// name); missing file falls back to defaults.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("audio.music_dir", "music")?
            .set_default("audio.record_duration_secs", 15_i64)?
            .set_default("engine.tick_ms", 0_i64)?
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
