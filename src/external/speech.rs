//! Speech announcement interface
//!
//! The synthesis backend is opaque: callers hand over text and a voice
//! channel and only learn whether playback was accepted.

use super::PlatformError;
use crate::types::ChannelId;
use async_trait::async_trait;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait SpeechAnnouncer: Send + Sync {
    async fn announce_in_channel(&self, channel: ChannelId, text: &str)
        -> Result<(), PlatformError>;
}
