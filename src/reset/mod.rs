// Reset Orchestrator - announce, send everyone home, tear down, flush

pub mod orchestrator;
pub mod report;

pub use orchestrator::{ResetOrchestrator, ResetSettings};
pub use report::{ResetReport, ResetTrigger};
