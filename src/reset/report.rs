use crate::errors::{FailureKind, OperationFailure};
use crate::types::{ChannelId, ParticipantId, SquadLabel};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// What started a reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResetTrigger {
    /// `squad` became unanimous while another squad had votes
    Quorum { squad: SquadLabel },
    /// The participant who formed the squads asked for it
    Override { invoker: ParticipantId },
}

/// Everything one reset run did, including the failures it absorbed
#[derive(Debug, Clone, Serialize)]
pub struct ResetReport {
    pub correlation_id: String,
    pub trigger: ResetTrigger,
    pub started_at: DateTime<Utc>,
    pub announced_in: Vec<ChannelId>,
    pub relocated: usize,
    pub channels_deleted: usize,
    pub trackers_retired: usize,
    pub squads_cleared: usize,
    pub confirmation_posted: bool,
    pub failures: Vec<OperationFailure>,
}

impl ResetReport {
    pub fn new(correlation_id: String, trigger: ResetTrigger) -> Self {
        Self {
            correlation_id,
            trigger,
            started_at: Utc::now(),
            announced_in: Vec::new(),
            relocated: 0,
            channels_deleted: 0,
            trackers_retired: 0,
            squads_cleared: 0,
            confirmation_posted: false,
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures_of(&self, kind: FailureKind) -> usize {
        self.failures.iter().filter(|f| f.kind() == kind).count()
    }

    /// One log line for the whole run
    pub fn log(&self) {
        if self.is_clean() {
            info!(
                correlation_id = %self.correlation_id,
                trigger = ?self.trigger,
                relocated = self.relocated,
                channels_deleted = self.channels_deleted,
                squads_cleared = self.squads_cleared,
                "Squad reset completed"
            );
        } else {
            warn!(
                correlation_id = %self.correlation_id,
                trigger = ?self.trigger,
                relocated = self.relocated,
                channels_deleted = self.channels_deleted,
                squads_cleared = self.squads_cleared,
                provisioning_failures = self.failures_of(FailureKind::Provisioning),
                announcement_failures = self.failures_of(FailureKind::Announcement),
                failures = ?self.failures,
                "Squad reset completed with failures"
            );
        }
    }

    pub fn summary(&self) -> String {
        let mut text = format!(
            "Squads reset: {} moved back to the lobby, {} channel(s) removed.",
            self.relocated, self.channels_deleted
        );
        if !self.failures.is_empty() {
            text.push_str(&format!(" {} step(s) could not be completed.", self.failures.len()));
        }
        text
    }
}
