pub mod config;
pub mod engine;
pub mod session;

pub use config::Config;
pub use engine::{
    AudioEngine, EngineFailure, MixerHandle, PcmDirection, PcmHandle, PcmParams, SimEngine,
    SimEngineConfig, TestEvent,
};
pub use session::{
    AudioTestSession, LogListener, Operation, OperationKind, OperationRunner, SessionStats,
    TestListener, CODE_UNKNOWN_FAILURE, DEFAULT_MAX_IN_FLIGHT, DEFAULT_RECORD_SECS,
};
