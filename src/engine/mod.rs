pub mod backend;
pub mod sim;

pub use backend::{
    AudioEngine, EngineFailure, MixerHandle, PcmDirection, PcmHandle, PcmParams, TestEvent,
    CARD_DMIC, CARD_LINEIN, DEFAULT_BITS, DEFAULT_CHANNELS, DEFAULT_PERIOD_COUNT,
    DEFAULT_PERIOD_SIZE, DEFAULT_RATE_DMIC, DEFAULT_RATE_LINEIN, DEVICE_DEFAULT,
};
pub use sim::{SimEngine, SimEngineConfig};
