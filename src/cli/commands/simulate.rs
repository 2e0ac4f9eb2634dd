use crate::config::SquadsConfig;
use crate::coordinator::{FormationRequest, FormationSummary, SquadCoordinator, VoteOutcome};
use crate::external::InMemoryPlatform;
use crate::reset::ResetReport;
use crate::types::{ChannelId, Participant, ParticipantId};
use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const LOBBY: ChannelId = ChannelId(1);
const HOME: ChannelId = ChannelId(2);
const INVOKER: ParticipantId = ParticipantId(1);

/// One full round (form, optional walk-out, vote, reset) on an in-memory platform.
///
/// Meant to run on a runtime with paused time so the watchdog timers advance
/// instantly.
pub struct SimulateCommand {
    pub participants: u64,
    pub size: Option<usize>,
    pub seed: Option<u64>,
    pub drop_member: bool,
    pub json: bool,
}

impl SimulateCommand {
    pub fn new(participants: u64) -> Self {
        Self {
            participants,
            size: None,
            seed: None,
            drop_member: false,
            json: false,
        }
    }

    pub fn with_size(mut self, size: Option<usize>) -> Self {
        self.size = size;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_drop_member(mut self, drop_member: bool) -> Self {
        self.drop_member = drop_member;
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub async fn execute(&self, config: &SquadsConfig) -> Result<()> {
        let report = self.run(config).await?;
        println!();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("🏁 {}", report.summary());
        }
        Ok(())
    }

    /// Drive the round and return the reset report
    pub async fn run(&self, config: &SquadsConfig) -> Result<ResetReport> {
        let platform = Arc::new(InMemoryPlatform::new());
        platform.add_channel(LOBBY, "lobby");
        platform.add_channel(HOME, "squad-chat");

        let participants: Vec<Participant> = (1..=self.participants)
            .map(|id| Participant::new(id, format!("player{id}")))
            .collect();
        for participant in &participants {
            platform.connect(participant, LOBBY);
        }

        let mut config = config.clone();
        config.reset.lobby_channel = LOBBY.0;
        config.presence.home_channel = HOME.0;
        let coordinator =
            SquadCoordinator::new(&config, platform.clone(), platform.clone(), platform.clone());

        let seed = self.seed.unwrap_or_else(|| rand::rng().random());
        let mut request = FormationRequest::new(participants, INVOKER);
        request.group_size = self.size;
        let partition = coordinator.plan(&request, &mut StdRng::seed_from_u64(seed))?;
        let summary = coordinator.launch(&request, partition).await;
        info!(seed, "Simulated formation complete");

        println!("🎮 Simulating {} participant(s), seed {seed}", self.participants);
        print!("{}", summary.render());

        if self.drop_member {
            self.walk_out(&platform, &summary, &config).await;
        }

        let active: Vec<_> = summary.active_squads().collect();
        let report = match active.as_slice() {
            [] => bail!("no squad channel could be created"),
            [_only] => {
                println!("🗳️  Only one squad, so the organizer resets directly");
                coordinator.force_reset(INVOKER, HOME).await?
            }
            [first, second, ..] => {
                let opener = second.members[0].id;
                Self::print_vote(&coordinator.vote(opener, HOME).await?);

                let mut report = None;
                for member in &first.members {
                    let outcome = coordinator.vote(member.id, HOME).await?;
                    Self::print_vote(&outcome);
                    if let VoteOutcome::Reset { report: r, .. } = outcome {
                        report = Some(r);
                        break;
                    }
                }
                match report {
                    Some(report) => report,
                    None => bail!("votes finished without reaching quorum"),
                }
            }
        };

        for (_, spoken) in platform.announcements() {
            println!("🔊 {spoken}");
        }
        println!(
            "🏠 {} participant(s) back in the lobby",
            platform.members_in(LOBBY).len()
        );
        Ok(report)
    }

    async fn walk_out(
        &self,
        platform: &InMemoryPlatform,
        summary: &FormationSummary,
        config: &SquadsConfig,
    ) {
        let Some(leaver) = summary
            .active_squads()
            .next()
            .and_then(|squad| squad.members.first())
        else {
            return;
        };
        println!("🚪 {} leaves their squad channel", leaver.display_name);
        platform.disconnect(leaver.id);

        tokio::time::sleep(Duration::from_secs(config.presence.poll_interval_seconds + 1)).await;
        for notice in platform.messages_in(HOME) {
            println!("📣 {}", notice.text);
            for action in &notice.actions {
                println!("   [{}]", action.label);
            }
        }
    }

    fn print_vote(outcome: &VoteOutcome) {
        let snapshot = &outcome.progress().snapshot;
        println!(
            "🗳️  Team {}: {}/{} voted for a replay",
            snapshot.label, snapshot.voted_count, snapshot.total_members
        );
    }
}
