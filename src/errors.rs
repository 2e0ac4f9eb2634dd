// Error taxonomy for squad formation, voting and reset.
//
// Only `ValidationError` and `ConsensusViolation` are ever returned to callers.
// Everything a best-effort sequence absorbs is recorded as an `OperationFailure`.

use crate::external::PlatformError;
use crate::types::{ChannelId, ParticipantId, SquadLabel};
use serde::Serialize;
use thiserror::Error;

/// Request rejected before any side effect
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("group size {requested} is not supported (allowed: {min}..={max})")]
    UnsupportedGroupSize {
        requested: usize,
        min: usize,
        max: usize,
    },
    #[error("at least 2 eligible participants are required, found {eligible}")]
    NotEnoughParticipants { eligible: usize },
    #[error("{eligible} participants cannot form a squad of size {group_size}")]
    NoSquadFormed { eligible: usize, group_size: usize },
}

/// Vote or override from someone without authority over the squads
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusViolation {
    #[error("squad {label} has no active vote")]
    UnknownSquad { label: SquadLabel },
    #[error("participant {voter} is not a member of {}", squad_name(.label))]
    NotASquadMember {
        voter: ParticipantId,
        label: Option<SquadLabel>,
    },
    #[error("participant {caller} did not start the current squads")]
    NotInitiator { caller: ParticipantId },
}

fn squad_name(label: &Option<SquadLabel>) -> String {
    match label {
        Some(label) => format!("squad {label}"),
        None => "any active squad".to_string(),
    }
}

/// Errors surfaced to the command-trigger layer as explicit denials
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SquadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Consensus(#[from] ConsensusViolation),
}

/// Which part of the taxonomy an absorbed failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    Provisioning,
    Announcement,
}

/// A failure absorbed by a best-effort step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
pub enum OperationFailure {
    #[error("could not create channel for squad {label}: {reason}")]
    ChannelCreate { label: SquadLabel, reason: String },
    #[error("could not apply access policy on {channel}: {reason}")]
    Permission { channel: ChannelId, reason: String },
    #[error("could not move {participant} into {channel}: {reason}")]
    Relocation {
        participant: ParticipantId,
        channel: ChannelId,
        reason: String,
    },
    #[error("could not read occupants of {channel}: {reason}")]
    OccupancyRead { channel: ChannelId, reason: String },
    #[error("could not delete {channel}: {reason}")]
    ChannelDelete { channel: ChannelId, reason: String },
    #[error("voice announcement in {channel} failed: {reason}")]
    Announcement { channel: ChannelId, reason: String },
    #[error("message to {channel} failed: {reason}")]
    Notification { channel: ChannelId, reason: String },
}

impl OperationFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            OperationFailure::Announcement { .. } | OperationFailure::Notification { .. } => {
                FailureKind::Announcement
            }
            _ => FailureKind::Provisioning,
        }
    }

    pub(crate) fn reason(err: &PlatformError) -> String {
        err.to_string()
    }
}
