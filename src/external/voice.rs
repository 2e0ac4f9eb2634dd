//! Voice membership interface

use super::PlatformError;
use crate::types::{ChannelId, ParticipantId};
use async_trait::async_trait;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

/// A participant currently connected to a voice channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupant {
    pub id: ParticipantId,
    pub display_name: String,
    pub is_bot: bool,
}

/// Subject of a connect-permission overwrite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionTarget {
    /// The platform's default role, i.e. everyone
    Everyone,
    Participant(ParticipantId),
}

/// Membership and channel management on the voice platform
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait VoicePlatform: Send + Sync {
    /// List everyone connected to `channel`, bots included
    async fn list_occupants(&self, channel: ChannelId) -> Result<Vec<Occupant>, PlatformError>;

    /// Move a connected participant into `channel`
    async fn move_member(
        &self,
        participant: ParticipantId,
        channel: ChannelId,
    ) -> Result<(), PlatformError>;

    /// Create a voice channel, optionally under a parent grouping
    async fn create_channel(
        &self,
        name: &str,
        parent: Option<ChannelId>,
    ) -> Result<ChannelId, PlatformError>;

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), PlatformError>;

    /// Allow or deny connecting to `channel` for `target`
    async fn set_connect_permission(
        &self,
        channel: ChannelId,
        target: PermissionTarget,
        allow: bool,
    ) -> Result<(), PlatformError>;
}
