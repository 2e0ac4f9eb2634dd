use super::record::{both_teams_have_votes, VoteSnapshot};
use crate::errors::ConsensusViolation;
use crate::observability::squad_metrics;
use crate::registry::SessionRegistry;
use crate::types::{ParticipantId, SquadLabel};
use serde::Serialize;
use tracing::info;

/// Result of one vote, read under the same lock that recorded it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteProgress {
    pub snapshot: VoteSnapshot,
    pub both_teams_have_votes: bool,
    /// Formation round of the squad the vote landed in
    pub round: u64,
}

impl VoteProgress {
    /// A unanimous squad plus a second squad that has started voting
    pub fn quorum_reached(&self) -> bool {
        self.snapshot.all_voted && self.both_teams_have_votes
    }
}

/// Vote bookkeeping over the registry's per-squad records
#[derive(Debug, Clone)]
pub struct VoteCoordinator {
    registry: SessionRegistry,
}

impl VoteCoordinator {
    pub fn new(registry: SessionRegistry) -> Self {
        Self { registry }
    }

    /// Record a replay vote. Repeat votes by the same member are no-ops.
    pub async fn register_vote(
        &self,
        label: SquadLabel,
        voter: ParticipantId,
    ) -> Result<VoteSnapshot, ConsensusViolation> {
        self.cast(label, voter).await.map(|progress| progress.snapshot)
    }

    /// Record a vote and evaluate the cross-squad signal atomically
    pub async fn cast(
        &self,
        label: SquadLabel,
        voter: ParticipantId,
    ) -> Result<VoteProgress, ConsensusViolation> {
        let mut state = self.registry.lock().await;
        let squad = state
            .squad_mut(label)
            .ok_or(ConsensusViolation::UnknownSquad { label })?;
        let snapshot = squad.votes.register(voter)?;
        let round = squad.round;
        let both = both_teams_have_votes(state.squads().map(|s| &s.votes));
        drop(state);

        squad_metrics().record_vote();
        info!(
            squad = %label,
            voter = %voter,
            voted = snapshot.voted_count,
            total = snapshot.total_members,
            both_teams = both,
            "Replay vote registered"
        );

        Ok(VoteProgress {
            snapshot,
            both_teams_have_votes: both,
            round,
        })
    }

    pub async fn both_teams_have_votes(&self) -> bool {
        let state = self.registry.lock().await;
        both_teams_have_votes(state.squads().map(|s| &s.votes))
    }

    pub async fn squad_of(&self, voter: ParticipantId) -> Option<SquadLabel> {
        self.registry.lock().await.squad_of(voter)
    }

    /// One snapshot per registered squad, in label order
    pub async fn vote_status(&self) -> Vec<VoteSnapshot> {
        self.registry
            .lock()
            .await
            .squads()
            .map(|s| s.votes.snapshot())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ActiveSquad;
    use crate::types::{ChannelId, Participant};

    async fn registry_with_two_squads() -> SessionRegistry {
        let registry = SessionRegistry::new();
        {
            let mut state = registry.lock().await;
            state.register_squad(ActiveSquad::new(
                SquadLabel::from_index(0),
                ChannelId(100),
                vec![Participant::new(1, "ana"), Participant::new(2, "bo")],
            ));
            state.register_squad(ActiveSquad::new(
                SquadLabel::from_index(1),
                ChannelId(101),
                vec![Participant::new(3, "cy"), Participant::new(4, "di")],
            ));
        }
        registry
    }

    #[tokio::test]
    async fn quorum_fires_when_one_side_is_unanimous_and_the_other_engaged() {
        let votes = VoteCoordinator::new(registry_with_two_squads().await);
        let a = SquadLabel::from_index(0);
        let b = SquadLabel::from_index(1);

        let first = votes.cast(a, ParticipantId(1)).await.unwrap();
        assert!(!first.both_teams_have_votes);

        let other_side = votes.cast(b, ParticipantId(3)).await.unwrap();
        assert!(other_side.both_teams_have_votes);
        assert!(!other_side.quorum_reached());

        let closing = votes.cast(a, ParticipantId(2)).await.unwrap();
        assert!(closing.snapshot.all_voted);
        assert!(closing.quorum_reached());
    }

    #[tokio::test]
    async fn unanimity_on_one_side_alone_is_not_quorum() {
        let votes = VoteCoordinator::new(registry_with_two_squads().await);
        let a = SquadLabel::from_index(0);

        votes.register_vote(a, ParticipantId(1)).await.unwrap();
        let progress = votes.cast(a, ParticipantId(2)).await.unwrap();
        assert!(progress.snapshot.all_voted);
        assert!(!progress.quorum_reached());
        assert!(!votes.both_teams_have_votes().await);
    }

    #[tokio::test]
    async fn repeat_votes_do_not_count_twice() {
        let votes = VoteCoordinator::new(registry_with_two_squads().await);
        let a = SquadLabel::from_index(0);

        let once = votes.register_vote(a, ParticipantId(1)).await.unwrap();
        let twice = votes.register_vote(a, ParticipantId(1)).await.unwrap();
        assert_eq!(once.voted_count, 1);
        assert_eq!(twice.voted_count, 1);
    }

    #[tokio::test]
    async fn unknown_squads_and_outsiders_are_denied() {
        let votes = VoteCoordinator::new(registry_with_two_squads().await);
        let z = SquadLabel::from_index(25);

        assert_eq!(
            votes.register_vote(z, ParticipantId(1)).await,
            Err(ConsensusViolation::UnknownSquad { label: z })
        );
        assert!(votes
            .register_vote(SquadLabel::from_index(0), ParticipantId(3))
            .await
            .is_err());

        let status = votes.vote_status().await;
        assert!(status.iter().all(|s| s.voted_count == 0));
    }
}
