use super::report::{ResetReport, ResetTrigger};
use crate::errors::OperationFailure;
use crate::external::{MessagingApi, OutgoingMessage, PlatformError, SpeechAnnouncer, VoicePlatform};
use crate::observability::{squad_metrics, OperationTimer};
use crate::registry::SessionRegistry;
use crate::telemetry::{create_squad_span, generate_correlation_id};
use crate::types::{ChannelId, SquadLabel};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

#[derive(Debug, Clone)]
pub struct ResetSettings {
    /// Shared voice channel everyone returns to
    pub lobby_channel: ChannelId,
    /// Spoken into the opposing squad's channel before teardown
    pub announcement: String,
}

pub struct ResetOrchestrator {
    platform: Arc<dyn VoicePlatform>,
    messaging: Arc<dyn MessagingApi>,
    speech: Arc<dyn SpeechAnnouncer>,
    registry: SessionRegistry,
    settings: ResetSettings,
}

impl ResetOrchestrator {
    pub fn new(
        platform: Arc<dyn VoicePlatform>,
        messaging: Arc<dyn MessagingApi>,
        speech: Arc<dyn SpeechAnnouncer>,
        registry: SessionRegistry,
        settings: ResetSettings,
    ) -> Self {
        Self {
            platform,
            messaging,
            speech,
            registry,
            settings,
        }
    }

    /// Tear down every registered squad, including channels of squads a later
    /// formation replaced.
    ///
    /// No step aborts the run; the registry is always flushed before the
    /// confirmation goes to `origin`.
    pub async fn run(&self, trigger: ResetTrigger, origin: ChannelId) -> ResetReport {
        let correlation_id = generate_correlation_id();
        let span = create_squad_span("reset", None, Some(&correlation_id));
        self.run_steps(correlation_id, trigger, origin)
            .instrument(span)
            .await
    }

    async fn run_steps(
        &self,
        correlation_id: String,
        trigger: ResetTrigger,
        origin: ChannelId,
    ) -> ResetReport {
        let timer = OperationTimer::new("squad_reset");
        let mut report = ResetReport::new(correlation_id, trigger);
        let squads = self.registry.squad_channels().await;
        info!(trigger = ?trigger, squads = squads.len(), "Starting squad reset");

        self.announce(trigger, &squads, &mut report).await;
        for (label, channel) in &squads {
            self.send_home(*label, *channel, &mut report).await;
        }
        for (label, channel) in &squads {
            self.tear_down(*label, *channel, &mut report).await;
        }

        // squads replaced by a re-formation, or registered after the snapshot
        let flushed = self.registry.flush().await;
        let leftovers: Vec<_> = flushed
            .channels
            .iter()
            .filter(|entry| !squads.contains(entry))
            .copied()
            .collect();
        if !leftovers.is_empty() {
            info!(squads = leftovers.len(), "Clearing squad channels outside the reset snapshot");
        }
        for (label, channel) in &leftovers {
            self.send_home(*label, *channel, &mut report).await;
            self.tear_down(*label, *channel, &mut report).await;
        }
        report.trackers_retired = flushed.trackers_retired;
        report.squads_cleared = flushed.squads_cleared;

        self.confirm(origin, &mut report).await;

        squad_metrics().record_reset();
        squad_metrics().record_failures(report.failures.len());
        report.log();
        timer.finish();
        report
    }

    async fn announce(
        &self,
        trigger: ResetTrigger,
        squads: &[(SquadLabel, ChannelId)],
        report: &mut ResetReport,
    ) {
        for channel in announcement_targets(trigger, squads) {
            match self
                .speech
                .announce_in_channel(channel, &self.settings.announcement)
                .await
            {
                Ok(()) => report.announced_in.push(channel),
                Err(e) => {
                    warn!(channel = %channel, error = %e, "Reset announcement failed");
                    report.failures.push(OperationFailure::Announcement {
                        channel,
                        reason: OperationFailure::reason(&e),
                    });
                }
            }
        }
    }

    async fn send_home(&self, label: SquadLabel, channel: ChannelId, report: &mut ResetReport) {
        let occupants = match self.platform.list_occupants(channel).await {
            Ok(occupants) => occupants,
            Err(PlatformError::ChannelNotFound { .. }) => {
                debug!(squad = %label, channel = %channel, "Squad channel already gone");
                return;
            }
            Err(e) => {
                warn!(squad = %label, channel = %channel, error = %e, "Could not list squad channel");
                report.failures.push(OperationFailure::OccupancyRead {
                    channel,
                    reason: OperationFailure::reason(&e),
                });
                return;
            }
        };

        let lobby = self.settings.lobby_channel;
        for occupant in occupants.into_iter().filter(|o| !o.is_bot) {
            match self.platform.move_member(occupant.id, lobby).await {
                Ok(()) => report.relocated += 1,
                Err(e) => {
                    warn!(
                        squad = %label,
                        participant = %occupant.id,
                        error = %e,
                        "Could not move member back to the lobby"
                    );
                    report.failures.push(OperationFailure::Relocation {
                        participant: occupant.id,
                        channel: lobby,
                        reason: OperationFailure::reason(&e),
                    });
                }
            }
        }
    }

    async fn tear_down(&self, label: SquadLabel, channel: ChannelId, report: &mut ResetReport) {
        match self.platform.delete_channel(channel).await {
            Ok(()) => {
                report.channels_deleted += 1;
                debug!(squad = %label, channel = %channel, "Squad channel deleted");
            }
            Err(PlatformError::ChannelNotFound { .. }) => {
                debug!(squad = %label, channel = %channel, "Squad channel was already deleted");
            }
            Err(e) => {
                warn!(squad = %label, channel = %channel, error = %e, "Could not delete squad channel");
                report.failures.push(OperationFailure::ChannelDelete {
                    channel,
                    reason: OperationFailure::reason(&e),
                });
            }
        }
    }

    async fn confirm(&self, origin: ChannelId, report: &mut ResetReport) {
        let message = OutgoingMessage::text(report.summary());
        match self.messaging.post_message(origin, message).await {
            Ok(()) => report.confirmation_posted = true,
            Err(e) => {
                warn!(channel = %origin, error = %e, "Reset confirmation could not be posted");
                report.failures.push(OperationFailure::Notification {
                    channel: origin,
                    reason: OperationFailure::reason(&e),
                });
            }
        }
    }
}

/// Channels that hear the reset announcement.
///
/// A quorum reset is announced to the first other squad in label order, since
/// that side did not vote unanimously. An override is announced everywhere.
pub fn announcement_targets(
    trigger: ResetTrigger,
    squads: &[(SquadLabel, ChannelId)],
) -> Vec<ChannelId> {
    match trigger {
        ResetTrigger::Quorum { squad } => squads
            .iter()
            .find(|(label, _)| *label != squad)
            .map(|(_, channel)| vec![*channel])
            .unwrap_or_default(),
        ResetTrigger::Override { .. } => squads.iter().map(|(_, channel)| *channel).collect(),
    }
}
