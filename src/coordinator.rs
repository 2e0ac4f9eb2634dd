use crate::config::{FormationConfig, SquadsConfig};
use crate::errors::{ConsensusViolation, OperationFailure, SquadError};
use crate::external::{MessagingApi, SpeechAnnouncer, VoicePlatform};
use crate::observability::{squad_metrics, OperationTimer};
use crate::partition::{partition, validate, Partition};
use crate::presence::{PresenceTracker, TrackerSettings};
use crate::provisioning::ChannelProvisioner;
use crate::registry::{ActiveSquad, SessionRegistry};
use crate::reset::{ResetOrchestrator, ResetReport, ResetSettings, ResetTrigger};
use crate::telemetry::{create_squad_span, generate_correlation_id};
use crate::types::{ChannelId, Participant, ParticipantId, SquadLabel};
use crate::voting::{VoteCoordinator, VoteProgress, VoteSnapshot};
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn, Instrument};

/// What the command-trigger layer passes in to start squads
#[derive(Debug, Clone)]
pub struct FormationRequest {
    pub participants: Vec<Participant>,
    /// Falls back to the configured default
    pub group_size: Option<usize>,
    pub invoker: ParticipantId,
    /// Falls back to the configured parent grouping
    pub parent: Option<ChannelId>,
}

impl FormationRequest {
    pub fn new(participants: Vec<Participant>, invoker: ParticipantId) -> Self {
        Self {
            participants,
            group_size: None,
            invoker,
            parent: None,
        }
    }

    pub fn with_group_size(mut self, group_size: usize) -> Self {
        self.group_size = Some(group_size);
        self
    }

    pub fn with_parent(mut self, parent: ChannelId) -> Self {
        self.parent = Some(parent);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FormedSquad {
    pub label: SquadLabel,
    pub members: Vec<Participant>,
    /// `None` when the channel could not be created
    pub channel: Option<ChannelId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormationSummary {
    pub correlation_id: String,
    pub group_size: usize,
    pub squads: Vec<FormedSquad>,
    pub waiting: Vec<Participant>,
    pub relocated: usize,
    pub failures: Vec<OperationFailure>,
}

impl FormationSummary {
    /// Text posted back to whoever asked for the squads
    pub fn render(&self) -> String {
        self.to_string()
    }

    pub fn active_squads(&self) -> impl Iterator<Item = &FormedSquad> {
        self.squads.iter().filter(|s| s.channel.is_some())
    }
}

impl fmt::Display for FormationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Formed {} squad(s) of up to {}:",
            self.squads.len(),
            self.group_size
        )?;
        for squad in &self.squads {
            let names = squad
                .members
                .iter()
                .map(|m| m.display_name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            match squad.channel {
                Some(channel) => writeln!(f, "  Team {} ({}): {}", squad.label, channel, names)?,
                None => writeln!(f, "  Team {} (no channel): {}", squad.label, names)?,
            }
        }
        if !self.waiting.is_empty() {
            let names = self
                .waiting
                .iter()
                .map(|m| m.display_name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(f, "  Waiting: {names}")?;
        }
        if !self.failures.is_empty() {
            writeln!(
                f,
                "  {} provisioning step(s) failed; see logs.",
                self.failures.len()
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum VoteOutcome {
    /// Vote counted, no reset yet
    Recorded(VoteProgress),
    /// This vote completed the quorum and the reset ran
    Reset {
        progress: VoteProgress,
        report: ResetReport,
    },
}

impl VoteOutcome {
    pub fn progress(&self) -> &VoteProgress {
        match self {
            VoteOutcome::Recorded(progress) => progress,
            VoteOutcome::Reset { progress, .. } => progress,
        }
    }

    pub fn reset_report(&self) -> Option<&ResetReport> {
        match self {
            VoteOutcome::Recorded(_) => None,
            VoteOutcome::Reset { report, .. } => Some(report),
        }
    }
}

/// Entry point for the command-trigger layer.
///
/// Runs partition, provisioning, registration and tracking for a formation,
/// then routes votes and overrides into a reset.
pub struct SquadCoordinator {
    formation: FormationConfig,
    registry: SessionRegistry,
    provisioner: ChannelProvisioner,
    tracker: PresenceTracker,
    votes: VoteCoordinator,
    reset: ResetOrchestrator,
    // serializes resets so a late vote cannot tear down twice
    reset_gate: Mutex<()>,
}

impl SquadCoordinator {
    pub fn new(
        config: &SquadsConfig,
        platform: Arc<dyn VoicePlatform>,
        messaging: Arc<dyn MessagingApi>,
        speech: Arc<dyn SpeechAnnouncer>,
    ) -> Self {
        let registry = SessionRegistry::new();
        let provisioner = ChannelProvisioner::new(
            platform.clone(),
            config.formation.access_policy,
            config.formation.channel_name_limit,
        );
        let tracker = PresenceTracker::new(
            platform.clone(),
            messaging.clone(),
            registry.clone(),
            TrackerSettings {
                timeout: Duration::from_secs(config.presence.timeout_seconds),
                poll_interval: Duration::from_secs(config.presence.poll_interval_seconds),
                home_channel: ChannelId(config.presence.home_channel),
            },
        );
        let reset = ResetOrchestrator::new(
            platform,
            messaging,
            speech,
            registry.clone(),
            ResetSettings {
                lobby_channel: ChannelId(config.reset.lobby_channel),
                announcement: config.reset.announcement.clone(),
            },
        );

        Self {
            formation: config.formation.clone(),
            votes: VoteCoordinator::new(registry.clone()),
            registry,
            provisioner,
            tracker,
            reset,
            reset_gate: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Validate and partition without touching the platform
    pub fn plan<R: Rng + ?Sized>(
        &self,
        request: &FormationRequest,
        rng: &mut R,
    ) -> Result<Partition, SquadError> {
        let group_size = self.group_size(request);
        let eligible = validate(
            &request.participants,
            group_size,
            self.formation.min_group_size,
            self.formation.max_group_size,
        )?;
        Ok(partition(eligible, group_size, rng))
    }

    /// Validate, partition, provision and start watching the new squads
    pub async fn form_squads(
        &self,
        request: FormationRequest,
    ) -> Result<FormationSummary, SquadError> {
        let planned = {
            let mut rng = rand::rng();
            self.plan(&request, &mut rng)
        };
        match planned {
            Ok(partition) => Ok(self.launch(&request, partition).await),
            Err(e) => {
                warn!(invoker = %request.invoker, error = %e, "Squad formation rejected");
                Err(e)
            }
        }
    }

    /// Provision channels for an already computed partition and register the
    /// squads that got one.
    pub async fn launch(&self, request: &FormationRequest, partition: Partition) -> FormationSummary {
        let correlation_id = generate_correlation_id();
        let span = create_squad_span("formation", None, Some(&correlation_id));
        self.launch_inner(correlation_id, request, partition)
            .instrument(span)
            .await
    }

    async fn launch_inner(
        &self,
        correlation_id: String,
        request: &FormationRequest,
        partition: Partition,
    ) -> FormationSummary {
        let timer = OperationTimer::new("squad_formation");
        let parent = request
            .parent
            .or(self.formation.parent_grouping.map(ChannelId));
        let outcome = self.provisioner.provision(&partition.squads, parent).await;

        let squads: Vec<FormedSquad> = partition
            .squads
            .into_iter()
            .zip(outcome.channels.iter().copied())
            .map(|(squad, channel)| FormedSquad {
                label: squad.label,
                members: squad.members,
                channel,
            })
            .collect();

        {
            let mut state = self.registry.lock().await;
            let round = state.begin_round(request.invoker);
            for squad in &squads {
                if let Some(channel) = squad.channel {
                    state.register_squad(
                        ActiveSquad::new(squad.label, channel, squad.members.clone()).in_round(round),
                    );
                }
            }
        }

        for squad in &squads {
            if let Some(channel) = squad.channel {
                self.tracker
                    .watch(squad.label, channel, squad.members.clone())
                    .await;
            }
        }

        let group_size = self.group_size(request);
        squad_metrics().record_formation(squads.len(), partition.waiting.len());
        squad_metrics().record_failures(outcome.failures.len());
        info!(
            invoker = %request.invoker,
            squads = squads.len(),
            waiting = partition.waiting.len(),
            relocated = outcome.relocated,
            failures = outcome.failures.len(),
            "Squads formed"
        );
        timer.finish();

        FormationSummary {
            correlation_id,
            group_size,
            squads,
            waiting: partition.waiting,
            relocated: outcome.relocated,
            failures: outcome.failures,
        }
    }

    /// Vote on behalf of `voter` for `label`; runs the reset when this vote
    /// completes the quorum.
    pub async fn register_vote(
        &self,
        label: SquadLabel,
        voter: ParticipantId,
        origin: ChannelId,
    ) -> Result<VoteOutcome, SquadError> {
        let progress = self.votes.cast(label, voter).await?;
        if !progress.quorum_reached() {
            return Ok(VoteOutcome::Recorded(progress));
        }

        self.reset_if_current(label, progress, origin).await
    }

    /// Run the quorum reset unless the round the vote completed is already gone
    async fn reset_if_current(
        &self,
        label: SquadLabel,
        progress: VoteProgress,
        origin: ChannelId,
    ) -> Result<VoteOutcome, SquadError> {
        let _gate = self.reset_gate.lock().await;
        let current_round = self.registry.lock().await.squad(label).map(|s| s.round);
        if current_round != Some(progress.round) {
            // the round this vote completed was already reset, maybe re-formed
            debug!(squad = %label, round = progress.round, "Quorum reached for a round that no longer exists");
            return Ok(VoteOutcome::Recorded(progress));
        }
        let report = self
            .reset
            .run(ResetTrigger::Quorum { squad: label }, origin)
            .await;
        Ok(VoteOutcome::Reset { progress, report })
    }

    /// Vote by member alone, resolving the squad from the registry
    pub async fn vote(
        &self,
        voter: ParticipantId,
        origin: ChannelId,
    ) -> Result<VoteOutcome, SquadError> {
        let label = self
            .votes
            .squad_of(voter)
            .await
            .ok_or(ConsensusViolation::NotASquadMember { voter, label: None })?;
        self.register_vote(label, voter, origin).await
    }

    /// Reset immediately. Only the participant who formed the squads may.
    pub async fn force_reset(
        &self,
        caller: ParticipantId,
        origin: ChannelId,
    ) -> Result<ResetReport, SquadError> {
        let _gate = self.reset_gate.lock().await;
        if self.registry.invoker().await != Some(caller) {
            warn!(caller = %caller, "Reset override denied");
            return Err(ConsensusViolation::NotInitiator { caller }.into());
        }
        Ok(self
            .reset
            .run(ResetTrigger::Override { invoker: caller }, origin)
            .await)
    }

    pub async fn vote_status(&self) -> Vec<VoteSnapshot> {
        self.votes.vote_status().await
    }

    fn group_size(&self, request: &FormationRequest) -> usize {
        request
            .group_size
            .unwrap_or(self.formation.default_group_size)
    }
}
