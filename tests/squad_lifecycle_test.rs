// End-to-end squad rounds against the in-memory platform
// Timers run on a paused clock so the 180s watchdogs finish instantly

use std::sync::Arc;
use std::time::Duration;
use voice_squads::{
    ChannelId, ConsensusViolation, FailureKind, FormationRequest, InMemoryPlatform, Participant,
    ParticipantId, SquadCoordinator, SquadError, SquadsConfig, ValidationError,
};

const LOBBY: ChannelId = ChannelId(1);
const HOME: ChannelId = ChannelId(2);
const PARENT: ChannelId = ChannelId(3);

struct Round {
    platform: Arc<InMemoryPlatform>,
    coordinator: SquadCoordinator,
    participants: Vec<Participant>,
}

fn round(count: u64, configure: impl FnOnce(&mut SquadsConfig)) -> Round {
    let platform = Arc::new(InMemoryPlatform::new());
    platform.add_channel(LOBBY, "lobby");
    platform.add_channel(HOME, "squad-chat");
    platform.add_channel(PARENT, "Squads");

    let participants: Vec<Participant> = (1..=count)
        .map(|id| Participant::new(id, format!("player{id}")))
        .collect();
    for participant in &participants {
        platform.connect(participant, LOBBY);
    }

    let mut config = SquadsConfig::default();
    config.reset.lobby_channel = LOBBY.0;
    config.presence.home_channel = HOME.0;
    config.formation.parent_grouping = Some(PARENT.0);
    configure(&mut config);

    let coordinator =
        SquadCoordinator::new(&config, platform.clone(), platform.clone(), platform.clone());
    Round {
        platform,
        coordinator,
        participants,
    }
}

#[tokio::test(start_paused = true)]
async fn bots_in_the_lobby_are_never_squadded() {
    let r = round(6, |_| {});
    let jukebox = Participant::bot(500, "jukebox");
    r.platform.connect(&jukebox, LOBBY);

    let mut everyone = r.participants.clone();
    everyone.push(jukebox);
    let summary = r
        .coordinator
        .form_squads(FormationRequest::new(everyone, ParticipantId(1)).with_group_size(3))
        .await
        .unwrap();

    assert_eq!(summary.squads.len(), 2);
    assert!(summary
        .squads
        .iter()
        .all(|s| s.members.iter().all(|m| !m.is_bot)));
    assert_eq!(r.platform.members_in(LOBBY), vec![ParticipantId(500)]);
}

#[tokio::test(start_paused = true)]
async fn squad_channels_are_restricted_and_parented() {
    let r = round(4, |_| {});
    let summary = r
        .coordinator
        .form_squads(FormationRequest::new(r.participants.clone(), ParticipantId(1)).with_group_size(2))
        .await
        .unwrap();

    for squad in &summary.squads {
        let channel = r.platform.channel(squad.channel.unwrap()).unwrap();
        assert_eq!(channel.parent, Some(PARENT));
        assert!(channel.name.starts_with(&format!("Team {}", squad.label)));
        // deny everyone plus one allow per member
        assert_eq!(channel.permissions.len(), squad.members.len() + 1);
    }
}

#[tokio::test(start_paused = true)]
async fn walking_out_posts_one_notice_with_both_controls() {
    let r = round(8, |_| {});
    let summary = r
        .coordinator
        .form_squads(FormationRequest::new(r.participants.clone(), ParticipantId(1)))
        .await
        .unwrap();

    let leaver = &summary.squads[1].members[2];
    r.platform.disconnect(leaver.id);
    tokio::time::sleep(Duration::from_secs(60)).await;

    let notices = r.platform.messages_in(HOME);
    assert_eq!(notices.len(), 1);
    assert!(notices[0].text.contains(&leaver.display_name));
    let labels: Vec<&str> = notices[0].actions.iter().map(|a| a.label.as_str()).collect();
    assert_eq!(labels, vec!["Returned temporarily", "Remove squad"]);

    // the squad stays votable until a reset clears it
    assert_eq!(r.coordinator.registry().squad_count().await, 2);
    assert_eq!(r.coordinator.registry().tracker_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn quiet_rounds_expire_silently() {
    let r = round(6, |_| {});
    r.coordinator
        .form_squads(FormationRequest::new(r.participants.clone(), ParticipantId(1)).with_group_size(3))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(181)).await;

    assert!(r.platform.messages().is_empty());
    assert_eq!(r.coordinator.registry().tracker_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn a_failing_platform_still_ends_with_a_clean_registry() {
    let r = round(4, |_| {});
    let summary = r
        .coordinator
        .form_squads(FormationRequest::new(r.participants.clone(), ParticipantId(1)).with_group_size(2))
        .await
        .unwrap();

    r.platform.fail_all_moves();
    r.platform.set_fail_deletes(true);
    r.platform.set_fail_announcements(true);
    r.platform.set_fail_messages(true);

    let report = r
        .coordinator
        .force_reset(ParticipantId(1), HOME)
        .await
        .unwrap();

    assert!(r.coordinator.registry().is_empty().await);
    // two spoken announcements plus the confirmation
    assert_eq!(report.failures_of(FailureKind::Announcement), 3);
    // four relocations plus two deletions
    assert_eq!(report.failures_of(FailureKind::Provisioning), 6);
    assert!(!report.confirmation_posted);
    for squad in &summary.squads {
        assert!(r.platform.channel_exists(squad.channel.unwrap()));
    }
}

#[tokio::test(start_paused = true)]
async fn channel_creation_failures_leave_squads_unregistered() {
    let r = round(4, |_| {});
    r.platform.set_fail_creates(true);

    let summary = r
        .coordinator
        .form_squads(FormationRequest::new(r.participants.clone(), ParticipantId(1)).with_group_size(2))
        .await
        .unwrap();

    assert!(summary.squads.iter().all(|s| s.channel.is_none()));
    assert_eq!(summary.failures.len(), 2);
    assert_eq!(r.coordinator.registry().squad_count().await, 0);
    assert_eq!(r.platform.members_in(LOBBY).len(), 4);
}

#[tokio::test(start_paused = true)]
async fn denied_requests_surface_as_explicit_errors() {
    let r = round(1, |config| config.formation.max_group_size = 4);

    let too_big = r
        .coordinator
        .form_squads(FormationRequest::new(r.participants.clone(), ParticipantId(1)).with_group_size(6))
        .await;
    assert!(matches!(
        too_big,
        Err(SquadError::Validation(ValidationError::UnsupportedGroupSize { max: 4, .. }))
    ));

    let alone = r
        .coordinator
        .form_squads(FormationRequest::new(r.participants.clone(), ParticipantId(1)))
        .await;
    assert!(matches!(
        alone,
        Err(SquadError::Validation(ValidationError::NotEnoughParticipants { eligible: 1 }))
    ));

    let nobody_formed = r.coordinator.force_reset(ParticipantId(1), HOME).await;
    assert!(matches!(
        nobody_formed,
        Err(SquadError::Consensus(ConsensusViolation::NotInitiator { .. }))
    ));
}

#[tokio::test(start_paused = true)]
async fn a_second_round_can_start_after_a_reset() {
    let r = round(4, |_| {});
    let request = FormationRequest::new(r.participants.clone(), ParticipantId(1)).with_group_size(2);

    r.coordinator.form_squads(request.clone()).await.unwrap();
    r.coordinator.force_reset(ParticipantId(1), HOME).await.unwrap();
    assert_eq!(r.platform.members_in(LOBBY).len(), 4);

    let again = r.coordinator.form_squads(request).await.unwrap();
    assert_eq!(again.relocated, 4);
    assert_eq!(r.coordinator.registry().squad_count().await, 2);
    assert_eq!(r.coordinator.registry().tracker_count().await, 2);
}

#[tokio::test(start_paused = true)]
async fn reforming_without_a_reset_leaves_no_channel_behind() {
    let r = round(4, |_| {});
    let request = FormationRequest::new(r.participants.clone(), ParticipantId(1)).with_group_size(2);
    let first = r.coordinator.form_squads(request.clone()).await.unwrap();
    let second = r.coordinator.form_squads(request).await.unwrap();
    assert_eq!(r.coordinator.registry().squad_count().await, 2);

    let report = r
        .coordinator
        .force_reset(ParticipantId(1), HOME)
        .await
        .unwrap();

    let channels: Vec<ChannelId> = first
        .squads
        .iter()
        .chain(&second.squads)
        .filter_map(|s| s.channel)
        .collect();
    assert_eq!(channels.len(), 4);
    for channel in channels {
        assert!(!r.platform.channel_exists(channel), "{channel} survived the reset");
    }
    assert_eq!(report.channels_deleted, 4);
    assert_eq!(r.platform.members_in(LOBBY).len(), 4);
    assert!(r.coordinator.registry().is_empty().await);
}
