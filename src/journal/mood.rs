use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mood {
    Stressed,
    Sad,
    Neutral,
    Peaceful,
    Excited,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown mood: {0}")]
pub struct UnknownMood(pub String);

impl Mood {
    pub const ALL: [Mood; 5] = [
        Mood::Stressed,
        Mood::Sad,
        Mood::Neutral,
        Mood::Peaceful,
        Mood::Excited,
    ];

    /// Persisted name
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Stressed => "STRESSED",
            Mood::Sad => "SAD",
            Mood::Neutral => "NEUTRAL",
            Mood::Peaceful => "PEACEFUL",
            Mood::Excited => "EXCITED",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive lookup by name
impl FromStr for Mood {
    type Err = UnknownMood;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownMood(s.to_string()))
    }
}
