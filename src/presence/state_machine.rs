use crate::types::{ChannelId, Participant, ParticipantId, SquadLabel};
use statig::prelude::*;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    /// Non-bot occupants seen on the latest poll
    Polled { present: BTreeSet<ParticipantId> },
    /// The squad channel no longer exists
    ChannelGone,
    /// The hard timeout elapsed
    Deadline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerOutcome {
    Abandoned {
        absent: Vec<Participant>,
        channel_gone: bool,
    },
    Expired,
}

/// Watch over one squad. ACTIVE moves to ABANDONED or EXPIRED, both terminal.
pub struct SquadWatch {
    label: SquadLabel,
    channel: ChannelId,
    snapshot: Vec<Participant>,
    polls: u32,
    outcome: Option<TrackerOutcome>,
}

impl SquadWatch {
    pub fn new(label: SquadLabel, channel: ChannelId, members: Vec<Participant>) -> Self {
        Self {
            label,
            channel,
            snapshot: members,
            polls: 0,
            outcome: None,
        }
    }

    pub fn outcome(&self) -> Option<&TrackerOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_settled(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }

    fn absent_from(&self, present: &BTreeSet<ParticipantId>) -> Vec<Participant> {
        self.snapshot
            .iter()
            .filter(|m| !present.contains(&m.id))
            .cloned()
            .collect()
    }
}

#[state_machine(initial = "State::active()")]
impl SquadWatch {
    #[state]
    fn active(&mut self, event: &TrackerEvent) -> Outcome<State> {
        match event {
            TrackerEvent::Polled { present } => {
                self.polls += 1;
                let absent = self.absent_from(present);
                if absent.is_empty() {
                    return Handled;
                }
                tracing::info!(
                    squad = %self.label,
                    channel = %self.channel,
                    absent = absent.len(),
                    "Squad member left the channel"
                );
                self.outcome = Some(TrackerOutcome::Abandoned {
                    absent,
                    channel_gone: false,
                });
                Transition(State::abandoned())
            }
            TrackerEvent::ChannelGone => {
                tracing::info!(
                    squad = %self.label,
                    channel = %self.channel,
                    "Squad channel disappeared"
                );
                self.outcome = Some(TrackerOutcome::Abandoned {
                    absent: self.snapshot.clone(),
                    channel_gone: true,
                });
                Transition(State::abandoned())
            }
            TrackerEvent::Deadline => {
                tracing::debug!(squad = %self.label, polls = self.polls, "Squad watch expired");
                self.outcome = Some(TrackerOutcome::Expired);
                Transition(State::expired())
            }
        }
    }

    #[state]
    fn abandoned(&mut self, event: &TrackerEvent) -> Outcome<State> {
        tracing::trace!(squad = %self.label, event = ?event, "Ignored after abandonment");
        Handled
    }

    #[state]
    fn expired(&mut self, event: &TrackerEvent) -> Outcome<State> {
        tracing::trace!(squad = %self.label, event = ?event, "Ignored after expiry");
        Handled
    }
}
