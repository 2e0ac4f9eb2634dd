// Presence Tracker - one time-boxed watchdog per squad channel

pub mod state_machine;
pub mod tracker;

pub use state_machine::{SquadWatch, TrackerEvent, TrackerOutcome};
pub use tracker::{PresenceTracker, TrackerSettings};
