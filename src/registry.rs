// Session Registry - the only shared mutable state in the crate.
//
// Callers lock, touch one key, and release before awaiting any platform call.

use crate::types::{ChannelId, Participant, ParticipantId, SquadLabel};
use crate::voting::VoteRecord;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// A running watchdog over one squad channel
#[derive(Debug)]
pub struct TrackingSession {
    pub session_id: Uuid,
    pub label: SquadLabel,
    pub channel: ChannelId,
    /// Member ids at the moment the channel was provisioned
    pub members: BTreeSet<ParticipantId>,
    pub started_at: DateTime<Utc>,
    handle: JoinHandle<()>,
}

impl TrackingSession {
    pub fn new(
        session_id: Uuid,
        label: SquadLabel,
        channel: ChannelId,
        members: BTreeSet<ParticipantId>,
        handle: JoinHandle<()>,
    ) -> Self {
        Self {
            session_id,
            label,
            channel,
            members,
            started_at: Utc::now(),
            handle,
        }
    }

    /// Stop the poll loop and the deadline together
    pub fn retire(self) {
        self.handle.abort();
    }
}

/// A squad whose channel exists and whose members may vote for a replay
#[derive(Debug, Clone)]
pub struct ActiveSquad {
    pub label: SquadLabel,
    pub channel: ChannelId,
    pub members: Vec<Participant>,
    pub votes: VoteRecord,
    /// Formation round that created the squad
    pub round: u64,
}

impl ActiveSquad {
    pub fn new(label: SquadLabel, channel: ChannelId, members: Vec<Participant>) -> Self {
        let votes = VoteRecord::new(label, members.iter().map(|m| m.id));
        Self {
            label,
            channel,
            members,
            votes,
            round: 0,
        }
    }

    pub fn in_round(mut self, round: u64) -> Self {
        self.round = round;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushSummary {
    pub trackers_retired: usize,
    pub squads_cleared: usize,
    /// Every squad channel the registry knew about, displaced ones included
    pub channels: Vec<(SquadLabel, ChannelId)>,
}

#[derive(Debug, Default)]
pub struct RegistryState {
    trackers: HashMap<ChannelId, TrackingSession>,
    squads: BTreeMap<SquadLabel, ActiveSquad>,
    /// Channels of squads overwritten by a later formation, still owed a teardown
    displaced: Vec<(SquadLabel, ChannelId)>,
    invoker: Option<ParticipantId>,
    round: u64,
}

impl RegistryState {
    /// Install a watchdog for its channel, retiring any watchdog already there.
    ///
    /// Returns the id of the retired session.
    pub fn install_tracker(&mut self, session: TrackingSession) -> Option<Uuid> {
        let previous = self.trackers.insert(session.channel, session);
        previous.map(|old| {
            let id = old.session_id;
            debug!(channel = %old.channel, session = %id, "Retiring superseded watchdog");
            old.retire();
            id
        })
    }

    /// Remove the tracker on `channel` only if it is still `session_id`
    pub fn remove_tracker(&mut self, channel: ChannelId, session_id: Uuid) -> bool {
        match self.trackers.get(&channel) {
            Some(current) if current.session_id == session_id => {
                self.trackers.remove(&channel);
                true
            }
            _ => false,
        }
    }

    pub fn tracker(&self, channel: ChannelId) -> Option<&TrackingSession> {
        self.trackers.get(&channel)
    }

    pub fn tracker_count(&self) -> usize {
        self.trackers.len()
    }

    /// Returns the squad previously registered under the same label.
    ///
    /// A replaced squad's channel stays on record until the next flush.
    pub fn register_squad(&mut self, squad: ActiveSquad) -> Option<ActiveSquad> {
        let channel = squad.channel;
        let previous = self.squads.insert(squad.label, squad)?;
        if previous.channel != channel {
            warn!(
                squad = %previous.label,
                channel = %previous.channel,
                round = previous.round,
                "Squad replaced by a later formation, keeping its channel for teardown"
            );
            self.displaced.push((previous.label, previous.channel));
        }
        Some(previous)
    }

    pub fn squad(&self, label: SquadLabel) -> Option<&ActiveSquad> {
        self.squads.get(&label)
    }

    pub fn squad_mut(&mut self, label: SquadLabel) -> Option<&mut ActiveSquad> {
        self.squads.get_mut(&label)
    }

    pub fn squads(&self) -> impl Iterator<Item = &ActiveSquad> {
        self.squads.values()
    }

    pub fn squad_count(&self) -> usize {
        self.squads.len()
    }

    pub fn squad_of(&self, participant: ParticipantId) -> Option<SquadLabel> {
        self.squads
            .values()
            .find(|s| s.votes.is_eligible(participant))
            .map(|s| s.label)
    }

    /// Record the organizer of a new formation and return its round id
    pub fn begin_round(&mut self, invoker: ParticipantId) -> u64 {
        self.invoker = Some(invoker);
        self.round += 1;
        self.round
    }

    pub fn invoker(&self) -> Option<ParticipantId> {
        self.invoker
    }

    /// Drop every vote record and retire every watchdog
    pub fn flush(&mut self) -> FlushSummary {
        let mut channels: Vec<_> = self.squads.values().map(|s| (s.label, s.channel)).collect();
        channels.append(&mut self.displaced);
        let summary = FlushSummary {
            trackers_retired: self.trackers.len(),
            squads_cleared: self.squads.len(),
            channels,
        };
        for (_, session) in self.trackers.drain() {
            session.retire();
        }
        self.squads.clear();
        self.invoker = None;
        summary
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty() && self.squads.is_empty() && self.displaced.is_empty()
    }
}

/// Process-wide handle onto the registry state
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().await
    }

    /// Lock without waiting, from synchronous test doubles
    #[cfg(test)]
    pub(crate) fn try_lock(&self) -> Option<MutexGuard<'_, RegistryState>> {
        self.state.try_lock().ok()
    }

    pub async fn is_empty(&self) -> bool {
        self.lock().await.is_empty()
    }

    pub async fn tracker_count(&self) -> usize {
        self.lock().await.tracker_count()
    }

    pub async fn squad_count(&self) -> usize {
        self.lock().await.squad_count()
    }

    pub async fn invoker(&self) -> Option<ParticipantId> {
        self.lock().await.invoker()
    }

    /// Labels and channels of every active squad, in label order
    pub async fn squad_channels(&self) -> Vec<(SquadLabel, ChannelId)> {
        self.lock()
            .await
            .squads()
            .map(|s| (s.label, s.channel))
            .collect()
    }

    pub async fn flush(&self) -> FlushSummary {
        self.lock().await.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    /// Spawn a task that never finishes on its own; the receiver errors once it is dropped
    fn idle_task() -> (JoinHandle<()>, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _tx = tx;
            std::future::pending::<()>().await;
        });
        (handle, rx)
    }

    fn session(channel: u64) -> (TrackingSession, oneshot::Receiver<()>) {
        let (handle, rx) = idle_task();
        let session = TrackingSession::new(
            Uuid::new_v4(),
            SquadLabel::from_index(0),
            ChannelId(channel),
            BTreeSet::from([ParticipantId(1)]),
            handle,
        );
        (session, rx)
    }

    #[tokio::test]
    async fn installing_twice_retires_the_first_watchdog() {
        let mut state = RegistryState::default();
        let (first, first_alive) = session(10);
        let first_id = first.session_id;
        let (second, _second_alive) = session(10);
        let second_id = second.session_id;

        assert_eq!(state.install_tracker(first), None);
        assert_eq!(state.install_tracker(second), Some(first_id));
        assert_eq!(state.tracker_count(), 1);
        assert_eq!(state.tracker(ChannelId(10)).map(|s| s.session_id), Some(second_id));

        // the first task was aborted, dropping its sender
        assert!(first_alive.await.is_err());
    }

    #[tokio::test]
    async fn stale_sessions_cannot_remove_their_successor() {
        let mut state = RegistryState::default();
        let (first, _a) = session(10);
        let first_id = first.session_id;
        let (second, _b) = session(10);
        let second_id = second.session_id;
        state.install_tracker(first);
        state.install_tracker(second);

        assert!(!state.remove_tracker(ChannelId(10), first_id));
        assert_eq!(state.tracker_count(), 1);
        assert!(state.remove_tracker(ChannelId(10), second_id));
        assert_eq!(state.tracker_count(), 0);
    }

    #[tokio::test]
    async fn flush_empties_everything() {
        let registry = SessionRegistry::new();
        let (tracker, alive) = session(10);
        {
            let mut state = registry.lock().await;
            state.install_tracker(tracker);
            state.register_squad(ActiveSquad::new(
                SquadLabel::from_index(0),
                ChannelId(10),
                vec![Participant::new(1, "ana")],
            ));
            state.begin_round(ParticipantId(1));
        }

        let summary = registry.flush().await;

        assert_eq!(
            summary,
            FlushSummary {
                trackers_retired: 1,
                squads_cleared: 1,
                channels: vec![(SquadLabel::from_index(0), ChannelId(10))],
            }
        );
        assert!(registry.is_empty().await);
        assert_eq!(registry.invoker().await, None);
        assert!(alive.await.is_err());
    }

    #[tokio::test]
    async fn squad_lookup_by_member() {
        let mut state = RegistryState::default();
        state.register_squad(ActiveSquad::new(
            SquadLabel::from_index(0),
            ChannelId(10),
            vec![Participant::new(1, "ana"), Participant::new(2, "bo")],
        ));
        state.register_squad(ActiveSquad::new(
            SquadLabel::from_index(1),
            ChannelId(11),
            vec![Participant::new(3, "cy")],
        ));

        assert_eq!(state.squad_of(ParticipantId(3)), Some(SquadLabel::from_index(1)));
        assert_eq!(state.squad_of(ParticipantId(9)), None);
    }

    #[tokio::test]
    async fn replaced_squad_channels_are_kept_until_flush() {
        let registry = SessionRegistry::new();
        let label = SquadLabel::from_index(0);
        {
            let mut state = registry.lock().await;
            let first = state.begin_round(ParticipantId(1));
            state.register_squad(
                ActiveSquad::new(label, ChannelId(10), vec![Participant::new(1, "ana")]).in_round(first),
            );
            let second = state.begin_round(ParticipantId(1));
            assert_eq!(second, first + 1);
            let previous = state.register_squad(
                ActiveSquad::new(label, ChannelId(20), vec![Participant::new(1, "ana")]).in_round(second),
            );

            assert_eq!(previous.map(|s| s.round), Some(first));
            assert_eq!(state.squad(label).map(|s| s.channel), Some(ChannelId(20)));
        }
        assert_eq!(registry.squad_channels().await, vec![(label, ChannelId(20))]);

        let summary = registry.flush().await;
        assert_eq!(summary.squads_cleared, 1);
        assert_eq!(
            summary.channels,
            vec![(label, ChannelId(20)), (label, ChannelId(10))]
        );
        assert!(registry.is_empty().await);
    }
}
