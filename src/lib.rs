// Voice Squads Library - ephemeral voice-channel squads for a shared lobby
// This exposes the core components for the CLI, integration tests and bot front-ends

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod external;
pub mod observability;
pub mod partition;
pub mod presence;
pub mod provisioning;
pub mod registry;
pub mod reset;
pub mod telemetry;
pub mod types;
pub mod voting;

// Re-export key types for easy access
pub use config::{config, init_config, SquadsConfig};
pub use coordinator::{FormationRequest, FormationSummary, FormedSquad, SquadCoordinator, VoteOutcome};
pub use errors::{ConsensusViolation, FailureKind, OperationFailure, SquadError, ValidationError};
pub use external::{InMemoryPlatform, MessagingApi, PlatformError, SpeechAnnouncer, VoicePlatform};
pub use observability::{squad_metrics, OperationTimer, SquadMetrics};
pub use partition::{partition, Partition, Squad};
pub use presence::{PresenceTracker, TrackerOutcome};
pub use provisioning::{AccessPolicy, ChannelProvisioner};
pub use registry::SessionRegistry;
pub use reset::{ResetOrchestrator, ResetReport, ResetTrigger};
pub use telemetry::{create_squad_span, generate_correlation_id, init_telemetry, shutdown_telemetry};
pub use types::{ChannelId, Participant, ParticipantId, SquadLabel};
pub use voting::{VoteCoordinator, VoteProgress, VoteSnapshot};
