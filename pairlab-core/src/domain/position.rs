//! Position: the three-state label threaded through the signal pass.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which way the pair is held.
///
/// `Long1Short2` is long asset 1 and short asset 2; `Short1Long2` is the
/// mirror image. There is no sizing: a pair position is either on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    #[default]
    Neutral,
    #[serde(rename = "long1_short2")]
    Long1Short2,
    #[serde(rename = "short1_long2")]
    Short1Long2,
}

impl Position {
    pub fn is_neutral(self) -> bool {
        self == Position::Neutral
    }

    /// Stable label used in trace artifacts.
    pub fn label(self) -> &'static str {
        match self {
            Position::Neutral => "neutral",
            Position::Long1Short2 => "long1_short2",
            Position::Short1Long2 => "short1_long2",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
