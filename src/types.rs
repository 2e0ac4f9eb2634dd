// Core identifiers shared by every squad component

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform identifier of a live participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Platform identifier of a voice or text channel (or a channel grouping)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A member of the live voice session, valid for one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    #[serde(default)]
    pub is_bot: bool,
}

impl Participant {
    pub fn new(id: u64, display_name: impl Into<String>) -> Self {
        Self {
            id: ParticipantId(id),
            display_name: display_name.into(),
            is_bot: false,
        }
    }

    pub fn bot(id: u64, display_name: impl Into<String>) -> Self {
        Self {
            is_bot: true,
            ..Self::new(id, display_name)
        }
    }
}

/// Positional squad label.
///
/// Stored as a zero-based index and rendered spreadsheet-style
/// (`A`..`Z`, `AA`, `AB`, ...), so there is no upper bound at 26 squads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SquadLabel(u16);

impl SquadLabel {
    pub const fn from_index(index: u16) -> Self {
        Self(index)
    }

    pub const fn index(self) -> u16 {
        self.0
    }
}

impl fmt::Display for SquadLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut n = u32::from(self.0) + 1;
        let mut letters = Vec::new();
        while n > 0 {
            let rem = ((n - 1) % 26) as u8;
            letters.push((b'A' + rem) as char);
            n = (n - 1) / 26;
        }
        let label: String = letters.into_iter().rev().collect();
        f.write_str(&label)
    }
}
