//! Platform collaborator abstractions
//!
//! The squad core never talks to a chat platform directly. It consumes three
//! narrow async interfaces (voice membership, text messaging, speech
//! announcements) so that every side effect can be replaced by a mock or by
//! the in-memory platform in tests and in the simulator.

pub mod memory;
pub mod messaging;
pub mod speech;
pub mod voice;

pub use memory::InMemoryPlatform;
pub use messaging::{MessageAction, MessagingApi, OutgoingMessage};
pub use speech::SpeechAnnouncer;
pub use voice::{Occupant, PermissionTarget, VoicePlatform};

#[cfg(any(test, feature = "testing"))]
pub use messaging::MockMessagingApi;
#[cfg(any(test, feature = "testing"))]
pub use speech::MockSpeechAnnouncer;
#[cfg(any(test, feature = "testing"))]
pub use voice::MockVoicePlatform;

use crate::types::{ChannelId, ParticipantId};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("channel {channel} does not exist")]
    ChannelNotFound { channel: ChannelId },
    #[error("participant {participant} is not connected")]
    MemberNotFound { participant: ParticipantId },
    #[error("missing permission: {reason}")]
    PermissionDenied { reason: String },
    #[error("rate limited by platform")]
    RateLimited,
    #[error("platform unavailable: {message}")]
    Unavailable { message: String },
}
