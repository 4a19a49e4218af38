use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::engine::PcmParams;

/// Default record duration in seconds
pub const DEFAULT_RECORD_SECS: u32 = 15;

/// One of the four hardware audio test operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    DmicRecord,
    DmicPlayback,
    LineinRecord,
    LineinPlayback,
}

impl OperationKind {
    pub fn is_record(&self) -> bool {
        matches!(self, Self::DmicRecord | Self::LineinRecord)
    }

    /// PCM route used by this operation
    pub fn pcm_params(&self) -> PcmParams {
        match self {
            Self::DmicRecord => PcmParams::dmic(),
            Self::LineinRecord => PcmParams::linein(),
            Self::DmicPlayback | Self::LineinPlayback => PcmParams::default_output(),
        }
    }

    /// Conventional file name for this operation's audio path
    pub fn default_file_name(&self) -> &'static str {
        match self {
            Self::DmicRecord | Self::DmicPlayback => "dmic.wav",
            Self::LineinRecord | Self::LineinPlayback => "amic.wav",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DmicRecord => "dmic-record",
            Self::DmicPlayback => "dmic-playback",
            Self::LineinRecord => "linein-record",
            Self::LineinPlayback => "linein-playback",
        };
        f.write_str(name)
    }
}

/// One invocation of a test operation; lives only for the duration of
/// the call into the engine
#[derive(Debug, Clone)]
pub struct Operation {
    pub kind: OperationKind,
    pub file_path: PathBuf,
    /// Present only for record kinds
    pub duration_seconds: Option<u32>,
}

impl Operation {
    pub fn record(kind: OperationKind, file_path: impl Into<PathBuf>, duration_secs: u32) -> Self {
        debug_assert!(kind.is_record());
        Self {
            kind,
            file_path: file_path.into(),
            duration_seconds: Some(duration_secs),
        }
    }

    pub fn playback(kind: OperationKind, file_path: impl Into<PathBuf>) -> Self {
        debug_assert!(!kind.is_record());
        Self {
            kind,
            file_path: file_path.into(),
            duration_seconds: None,
        }
    }

    /// Build an operation using the conventional file name under
    /// `music_dir` and the given record duration
    pub fn with_defaults(kind: OperationKind, music_dir: &Path, record_secs: u32) -> Self {
        let file_path = music_dir.join(kind.default_file_name());
        if kind.is_record() {
            Self::record(kind, file_path, record_secs)
        } else {
            Self::playback(kind, file_path)
        }
    }
}
