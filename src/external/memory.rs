//! In-memory voice platform
//!
//! Implements all three collaborator traits over a single mutex-guarded world
//! model. Used by the `simulate` command and by the integration tests, with
//! switches to inject failures into individual operations.

use super::{
    MessagingApi, Occupant, OutgoingMessage, PermissionTarget, PlatformError, SpeechAnnouncer,
    VoicePlatform,
};
use crate::types::{ChannelId, Participant, ParticipantId};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ChannelState {
    pub name: String,
    pub parent: Option<ChannelId>,
    pub permissions: Vec<(PermissionTarget, bool)>,
}

#[derive(Debug, Default)]
struct World {
    next_channel: u64,
    channels: BTreeMap<ChannelId, ChannelState>,
    members: HashMap<ParticipantId, Participant>,
    connected: HashMap<ParticipantId, ChannelId>,
    messages: Vec<(ChannelId, OutgoingMessage)>,
    announcements: Vec<(ChannelId, String)>,
    occupancy_reads: usize,
    failing_moves: HashSet<ParticipantId>,
    fail_creates: bool,
    fail_deletes: bool,
    fail_announcements: bool,
    fail_messages: bool,
    fail_occupancy: bool,
}

#[derive(Debug)]
pub struct InMemoryPlatform {
    world: Mutex<World>,
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self {
            world: Mutex::new(World {
                next_channel: 1000,
                ..World::default()
            }),
        }
    }

    fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a pre-existing channel such as the lobby or the home text channel
    pub fn add_channel(&self, channel: ChannelId, name: &str) {
        self.world().channels.insert(
            channel,
            ChannelState {
                name: name.to_string(),
                parent: None,
                permissions: Vec::new(),
            },
        );
    }

    /// Connect a participant to a voice channel
    pub fn connect(&self, participant: &Participant, channel: ChannelId) {
        let mut world = self.world();
        world.members.insert(participant.id, participant.clone());
        world.connected.insert(participant.id, channel);
    }

    /// Drop a participant's voice connection entirely
    pub fn disconnect(&self, participant: ParticipantId) {
        self.world().connected.remove(&participant);
    }

    /// Delete a channel without going through the trait, as a moderator would
    pub fn remove_channel_externally(&self, channel: ChannelId) {
        let mut world = self.world();
        world.channels.remove(&channel);
        world.connected.retain(|_, c| *c != channel);
    }

    pub fn channel(&self, channel: ChannelId) -> Option<ChannelState> {
        self.world().channels.get(&channel).cloned()
    }

    pub fn channel_exists(&self, channel: ChannelId) -> bool {
        self.world().channels.contains_key(&channel)
    }

    pub fn channel_count(&self) -> usize {
        self.world().channels.len()
    }

    pub fn location_of(&self, participant: ParticipantId) -> Option<ChannelId> {
        self.world().connected.get(&participant).copied()
    }

    pub fn members_in(&self, channel: ChannelId) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self
            .world()
            .connected
            .iter()
            .filter(|(_, c)| **c == channel)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    pub fn messages(&self) -> Vec<(ChannelId, OutgoingMessage)> {
        self.world().messages.clone()
    }

    pub fn messages_in(&self, channel: ChannelId) -> Vec<OutgoingMessage> {
        self.world()
            .messages
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn announcements(&self) -> Vec<(ChannelId, String)> {
        self.world().announcements.clone()
    }

    pub fn occupancy_reads(&self) -> usize {
        self.world().occupancy_reads
    }

    pub fn fail_all_moves(&self) {
        let mut world = self.world();
        let ids: Vec<_> = world.members.keys().copied().collect();
        world.failing_moves.extend(ids);
    }

    pub fn set_fail_creates(&self, fail: bool) {
        self.world().fail_creates = fail;
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.world().fail_deletes = fail;
    }

    pub fn set_fail_announcements(&self, fail: bool) {
        self.world().fail_announcements = fail;
    }

    pub fn set_fail_messages(&self, fail: bool) {
        self.world().fail_messages = fail;
    }

    pub fn set_fail_occupancy(&self, fail: bool) {
        self.world().fail_occupancy = fail;
    }
}

#[async_trait]
impl VoicePlatform for InMemoryPlatform {
    async fn list_occupants(&self, channel: ChannelId) -> Result<Vec<Occupant>, PlatformError> {
        let mut world = self.world();
        world.occupancy_reads += 1;
        if world.fail_occupancy {
            return Err(PlatformError::Unavailable {
                message: "occupancy lookup failed".to_string(),
            });
        }
        if !world.channels.contains_key(&channel) {
            return Err(PlatformError::ChannelNotFound { channel });
        }
        let mut occupants: Vec<Occupant> = world
            .connected
            .iter()
            .filter(|(_, c)| **c == channel)
            .filter_map(|(id, _)| world.members.get(id))
            .map(|p| Occupant {
                id: p.id,
                display_name: p.display_name.clone(),
                is_bot: p.is_bot,
            })
            .collect();
        occupants.sort_by_key(|o| o.id);
        Ok(occupants)
    }

    async fn move_member(
        &self,
        participant: ParticipantId,
        channel: ChannelId,
    ) -> Result<(), PlatformError> {
        let mut world = self.world();
        if world.failing_moves.contains(&participant) {
            return Err(PlatformError::PermissionDenied {
                reason: "move members".to_string(),
            });
        }
        if !world.channels.contains_key(&channel) {
            return Err(PlatformError::ChannelNotFound { channel });
        }
        match world.connected.get_mut(&participant) {
            Some(current) => {
                *current = channel;
                Ok(())
            }
            None => Err(PlatformError::MemberNotFound { participant }),
        }
    }

    async fn create_channel(
        &self,
        name: &str,
        parent: Option<ChannelId>,
    ) -> Result<ChannelId, PlatformError> {
        let mut world = self.world();
        if world.fail_creates {
            return Err(PlatformError::Unavailable {
                message: "channel creation failed".to_string(),
            });
        }
        world.next_channel += 1;
        let id = ChannelId(world.next_channel);
        world.channels.insert(
            id,
            ChannelState {
                name: name.to_string(),
                parent,
                permissions: Vec::new(),
            },
        );
        debug!(channel = %id, name, "in-memory channel created");
        Ok(id)
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), PlatformError> {
        let mut world = self.world();
        if world.fail_deletes {
            return Err(PlatformError::PermissionDenied {
                reason: "manage channels".to_string(),
            });
        }
        if world.channels.remove(&channel).is_none() {
            return Err(PlatformError::ChannelNotFound { channel });
        }
        world.connected.retain(|_, c| *c != channel);
        Ok(())
    }

    async fn set_connect_permission(
        &self,
        channel: ChannelId,
        target: PermissionTarget,
        allow: bool,
    ) -> Result<(), PlatformError> {
        let mut world = self.world();
        let state = world
            .channels
            .get_mut(&channel)
            .ok_or(PlatformError::ChannelNotFound { channel })?;
        state.permissions.retain(|(t, _)| *t != target);
        state.permissions.push((target, allow));
        Ok(())
    }
}

#[async_trait]
impl MessagingApi for InMemoryPlatform {
    async fn post_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> Result<(), PlatformError> {
        let mut world = self.world();
        if world.fail_messages {
            return Err(PlatformError::Unavailable {
                message: "message delivery failed".to_string(),
            });
        }
        world.messages.push((channel, message));
        Ok(())
    }
}

#[async_trait]
impl SpeechAnnouncer for InMemoryPlatform {
    async fn announce_in_channel(
        &self,
        channel: ChannelId,
        text: &str,
    ) -> Result<(), PlatformError> {
        let mut world = self.world();
        if world.fail_announcements {
            return Err(PlatformError::Unavailable {
                message: "speech backend offline".to_string(),
            });
        }
        world.announcements.push((channel, text.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn moves_require_a_live_connection() {
        let platform = InMemoryPlatform::new();
        platform.add_channel(ChannelId(1), "lobby");
        let alice = Participant::new(10, "alice");

        let err = platform
            .move_member(alice.id, ChannelId(1))
            .await
            .unwrap_err();
        assert_eq!(err, PlatformError::MemberNotFound { participant: alice.id });

        platform.connect(&alice, ChannelId(1));
        let created = platform.create_channel("Team A", None).await.unwrap();
        platform.move_member(alice.id, created).await.unwrap();
        assert_eq!(platform.location_of(alice.id), Some(created));
    }

    #[tokio::test]
    async fn deleting_a_channel_disconnects_its_occupants() {
        let platform = InMemoryPlatform::new();
        let channel = platform.create_channel("Team A", None).await.unwrap();
        let bob = Participant::new(11, "bob");
        platform.connect(&bob, channel);

        platform.delete_channel(channel).await.unwrap();

        assert_eq!(platform.location_of(bob.id), None);
        assert!(matches!(
            platform.list_occupants(channel).await,
            Err(PlatformError::ChannelNotFound { .. })
        ));
    }
}
