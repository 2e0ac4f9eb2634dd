// Channel Provisioner - one ephemeral voice channel per squad

pub mod naming;
pub mod provisioner;

pub use naming::{channel_name, DEFAULT_NAME_LIMIT};
pub use provisioner::{AccessPolicy, ChannelProvisioner, ProvisionOutcome};
