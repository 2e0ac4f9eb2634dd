// Vote Coordinator - per-squad replay votes and the cross-squad quorum signal

pub mod coordinator;
pub mod record;

pub use coordinator::{VoteCoordinator, VoteProgress};
pub use record::{both_teams_have_votes, VoteRecord, VoteSnapshot};
