use std::fmt::Display;

use serde::{Deserialize, Serialize};

const LEVEL_SOFT: u8 = 0;
const LEVEL_HARD: u8 = 1;

/// How much a failing dependency matters to the service as a whole.
///
/// Serialized as `0` (soft) or `1` (hard) in status snapshots.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Level {
    /// The service keeps working while this dependency is down.
    #[default]
    Soft,
    /// The service is unhealthy whenever this dependency is.
    Hard,
}

impl Level {
    pub fn is_hard(&self) -> bool {
        matches!(self, Level::Hard)
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        match level {
            Level::Soft => LEVEL_SOFT,
            Level::Hard => LEVEL_HARD,
        }
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            LEVEL_SOFT => Ok(Level::Soft),
            LEVEL_HARD => Ok(Level::Hard),
            _ => Err(format!("unknown dependency level {}", value)),
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Soft => write!(f, "soft"),
            Level::Hard => write!(f, "hard"),
        }
    }
}
