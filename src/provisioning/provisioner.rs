use super::naming::channel_name;
use crate::errors::OperationFailure;
use crate::external::{PermissionTarget, VoicePlatform};
use crate::partition::Squad;
use crate::types::ChannelId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Who may connect to a squad channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPolicy {
    /// Deny everyone, then allow the squad's own members
    #[default]
    Restricted,
    /// No permission overwrites at all
    Open,
}

#[derive(Debug, Default)]
pub struct ProvisionOutcome {
    /// Aligned with the input squads; `None` where creation failed
    pub channels: Vec<Option<ChannelId>>,
    pub relocated: usize,
    pub failures: Vec<OperationFailure>,
}

pub struct ChannelProvisioner {
    platform: Arc<dyn VoicePlatform>,
    policy: AccessPolicy,
    name_limit: usize,
}

impl ChannelProvisioner {
    pub fn new(platform: Arc<dyn VoicePlatform>, policy: AccessPolicy, name_limit: usize) -> Self {
        Self {
            platform,
            policy,
            name_limit,
        }
    }

    /// Create, lock down and fill one channel per squad.
    ///
    /// A failure for one squad or member never stops the others.
    pub async fn provision(&self, squads: &[Squad], parent: Option<ChannelId>) -> ProvisionOutcome {
        let mut outcome = ProvisionOutcome::default();

        for squad in squads {
            let names = squad.display_names();
            let name = channel_name(squad.label, &names, self.name_limit);

            let channel = match self.platform.create_channel(&name, parent).await {
                Ok(channel) => channel,
                Err(e) => {
                    warn!(squad = %squad.label, error = %e, "Squad channel creation failed");
                    outcome.failures.push(OperationFailure::ChannelCreate {
                        label: squad.label,
                        reason: OperationFailure::reason(&e),
                    });
                    outcome.channels.push(None);
                    continue;
                }
            };
            info!(squad = %squad.label, channel = %channel, name = %name, "Squad channel created");

            if self.policy == AccessPolicy::Restricted {
                self.restrict(channel, squad, &mut outcome.failures).await;
            }

            outcome.relocated += self.relocate(channel, squad, &mut outcome.failures).await;
            outcome.channels.push(Some(channel));
        }

        outcome
    }

    async fn restrict(&self, channel: ChannelId, squad: &Squad, failures: &mut Vec<OperationFailure>) {
        let grants = std::iter::once((PermissionTarget::Everyone, false)).chain(
            squad
                .members
                .iter()
                .map(|m| (PermissionTarget::Participant(m.id), true)),
        );

        for (target, allow) in grants {
            if let Err(e) = self
                .platform
                .set_connect_permission(channel, target, allow)
                .await
            {
                warn!(channel = %channel, target = ?target, error = %e, "Connect permission not applied");
                failures.push(OperationFailure::Permission {
                    channel,
                    reason: OperationFailure::reason(&e),
                });
            }
        }
    }

    async fn relocate(
        &self,
        channel: ChannelId,
        squad: &Squad,
        failures: &mut Vec<OperationFailure>,
    ) -> usize {
        let mut moved = 0;
        for member in &squad.members {
            match self.platform.move_member(member.id, channel).await {
                Ok(()) => moved += 1,
                Err(e) => {
                    warn!(
                        squad = %squad.label,
                        participant = %member.id,
                        error = %e,
                        "Could not move member into squad channel"
                    );
                    failures.push(OperationFailure::Relocation {
                        participant: member.id,
                        channel,
                        reason: OperationFailure::reason(&e),
                    });
                }
            }
        }
        moved
    }
}
