use crate::errors::ConsensusViolation;
use crate::types::{ParticipantId, SquadLabel};
use serde::Serialize;
use std::collections::BTreeSet;

/// Replay votes for one squad. `voted` is always a subset of `eligible`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRecord {
    label: SquadLabel,
    eligible: BTreeSet<ParticipantId>,
    voted: BTreeSet<ParticipantId>,
}

/// Progress of one squad's vote after a registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteSnapshot {
    pub label: SquadLabel,
    pub voted_count: usize,
    pub total_members: usize,
    pub all_voted: bool,
    pub some_voted: bool,
    pub missing: Vec<ParticipantId>,
}

impl VoteRecord {
    pub fn new(label: SquadLabel, eligible: impl IntoIterator<Item = ParticipantId>) -> Self {
        Self {
            label,
            eligible: eligible.into_iter().collect(),
            voted: BTreeSet::new(),
        }
    }

    pub fn is_eligible(&self, voter: ParticipantId) -> bool {
        self.eligible.contains(&voter)
    }

    /// Record `voter`'s vote. Voting twice changes nothing.
    pub fn register(&mut self, voter: ParticipantId) -> Result<VoteSnapshot, ConsensusViolation> {
        if !self.is_eligible(voter) {
            return Err(ConsensusViolation::NotASquadMember {
                voter,
                label: Some(self.label),
            });
        }
        self.voted.insert(voter);
        Ok(self.snapshot())
    }

    pub fn some_voted(&self) -> bool {
        !self.voted.is_empty()
    }

    pub fn snapshot(&self) -> VoteSnapshot {
        let voted_count = self.voted.len();
        let total_members = self.eligible.len();
        VoteSnapshot {
            label: self.label,
            voted_count,
            total_members,
            all_voted: voted_count >= total_members,
            some_voted: voted_count > 0,
            missing: self.eligible.difference(&self.voted).copied().collect(),
        }
    }
}

/// True once at least two distinct squads each have at least one vote.
///
/// Unanimity inside either squad is not required.
pub fn both_teams_have_votes<'a>(records: impl IntoIterator<Item = &'a VoteRecord>) -> bool {
    records.into_iter().filter(|r| r.some_voted()).take(2).count() >= 2
}
