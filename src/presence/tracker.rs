use super::state_machine::{SquadWatch, TrackerEvent, TrackerOutcome};
use crate::external::{MessageAction, MessagingApi, OutgoingMessage, PlatformError, VoicePlatform};
use crate::observability::squad_metrics;
use crate::registry::{SessionRegistry, TrackingSession};
use crate::telemetry::create_squad_span;
use crate::types::{ChannelId, Participant, SquadLabel};
use statig::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

/// Floor for the poll period; `interval_at` rejects a zero period
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    /// Hard lifetime of a watchdog
    pub timeout: Duration,
    /// Time between occupancy polls; the first poll happens one period in
    pub poll_interval: Duration,
    /// Text channel that receives abandonment notices
    pub home_channel: ChannelId,
}

impl TrackerSettings {
    pub fn new(home_channel: ChannelId) -> Self {
        Self {
            timeout: Duration::from_secs(180),
            poll_interval: Duration::from_secs(10),
            home_channel,
        }
    }
}

/// Spawns and owns the per-squad watchdogs
#[derive(Clone)]
pub struct PresenceTracker {
    platform: Arc<dyn VoicePlatform>,
    messaging: Arc<dyn MessagingApi>,
    registry: SessionRegistry,
    settings: TrackerSettings,
}

impl PresenceTracker {
    pub fn new(
        platform: Arc<dyn VoicePlatform>,
        messaging: Arc<dyn MessagingApi>,
        registry: SessionRegistry,
        settings: TrackerSettings,
    ) -> Self {
        Self {
            platform,
            messaging,
            registry,
            settings,
        }
    }

    /// Start watching `channel` for `members`.
    ///
    /// Any watchdog already installed on `channel` is retired under the same
    /// lock that installs the new one.
    pub async fn watch(
        &self,
        label: SquadLabel,
        channel: ChannelId,
        members: Vec<Participant>,
    ) -> Uuid {
        let session_id = Uuid::new_v4();
        let member_ids = members.iter().map(|m| m.id).collect();

        let span = create_squad_span(
            "watch",
            Some(&label.to_string()),
            Some(&session_id.to_string()),
        );

        let mut state = self.registry.lock().await;
        let handle = tokio::spawn(
            self.clone()
                .run(session_id, label, channel, members)
                .instrument(span),
        );
        let replaced = state.install_tracker(TrackingSession::new(
            session_id, label, channel, member_ids, handle,
        ));
        drop(state);

        match replaced {
            Some(previous) => info!(
                squad = %label,
                channel = %channel,
                session = %session_id,
                replaced = %previous,
                "Squad watchdog replaced"
            ),
            None => info!(squad = %label, channel = %channel, session = %session_id, "Squad watchdog started"),
        }
        session_id
    }

    async fn run(
        self,
        session_id: Uuid,
        label: SquadLabel,
        channel: ChannelId,
        members: Vec<Participant>,
    ) {
        let mut watch = SquadWatch::new(label, channel, members).state_machine();

        let deadline = sleep(self.settings.timeout);
        tokio::pin!(deadline);
        let period = self.settings.poll_interval.max(MIN_POLL_INTERVAL);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // one task owns both timers, so a poll and the deadline never interleave
        while !watch.inner().is_settled() {
            tokio::select! {
                biased;
                _ = &mut deadline => watch.handle(&TrackerEvent::Deadline),
                _ = ticker.tick() => {
                    if let Some(event) = self.poll(label, channel).await {
                        watch.handle(&event);
                    }
                }
            }
        }

        match watch.inner().outcome().cloned() {
            Some(TrackerOutcome::Abandoned {
                absent,
                channel_gone,
            }) => {
                squad_metrics().record_abandonment();
                self.notify_abandoned(label, channel, &absent, channel_gone)
                    .await;
            }
            Some(TrackerOutcome::Expired) => {
                squad_metrics().record_expiration();
                debug!(squad = %label, channel = %channel, "Squad watchdog expired without drift");
            }
            None => {}
        }

        self.registry
            .lock()
            .await
            .remove_tracker(channel, session_id);
    }

    async fn poll(&self, label: SquadLabel, channel: ChannelId) -> Option<TrackerEvent> {
        match self.platform.list_occupants(channel).await {
            Ok(occupants) => Some(TrackerEvent::Polled {
                present: occupants
                    .into_iter()
                    .filter(|o| !o.is_bot)
                    .map(|o| o.id)
                    .collect(),
            }),
            Err(PlatformError::ChannelNotFound { .. }) => Some(TrackerEvent::ChannelGone),
            Err(e) => {
                warn!(squad = %label, channel = %channel, error = %e, "Occupancy poll failed, will retry");
                squad_metrics().record_failures(1);
                None
            }
        }
    }

    async fn notify_abandoned(
        &self,
        label: SquadLabel,
        channel: ChannelId,
        absent: &[Participant],
        channel_gone: bool,
    ) {
        let message = abandonment_notice(label, channel, absent, channel_gone);
        if let Err(e) = self
            .messaging
            .post_message(self.settings.home_channel, message)
            .await
        {
            warn!(
                squad = %label,
                home = %self.settings.home_channel,
                error = %e,
                "Abandonment notice could not be posted"
            );
            squad_metrics().record_failures(1);
        }
    }
}

/// Notice naming the absent members, with the two acknowledgement controls
pub fn abandonment_notice(
    label: SquadLabel,
    channel: ChannelId,
    absent: &[Participant],
    channel_gone: bool,
) -> OutgoingMessage {
    let names = absent
        .iter()
        .map(|p| p.display_name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let text = if channel_gone {
        format!("Team {label}'s voice channel is gone ({names}). Did they step away, or should the squad be removed?")
    } else {
        format!("{names} left Team {label}. Did they step away for a moment, or should the squad be removed?")
    };

    OutgoingMessage::text(text)
        .with_action(MessageAction::new(
            format!("squad-returned:{label}:{}", channel.0),
            "Returned temporarily",
        ))
        .with_action(MessageAction::new(
            format!("squad-remove:{label}:{}", channel.0),
            "Remove squad",
        ))
}
