//! Time-of-day alert kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An alert derived from the wall clock. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TickAlert {
    /// On-the-hour alert during the active window
    Hourly,
    /// Field boss spawn
    FieldBoss,
}

impl TickAlert {
    pub fn as_str(&self) -> &'static str {
        match self {
            TickAlert::Hourly => "hourly",
            TickAlert::FieldBoss => "field-boss",
        }
    }
}

impl fmt::Display for TickAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
