// src/services/roles.rs

//! Alert role toggling.
//!
//! Members opt in and out of alert pings by toggling a guild role. This only
//! touches guild membership and never reads or writes poll state.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;
use crate::models::{DiscordConfig, TickAlert};
use crate::services::discord::DiscordClient;

const TOGGLE_REASON: &str = "alert toggle";

/// Guild role membership capability.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Display name of a guild role, `None` when the role does not exist.
    async fn role_name(&self, guild_id: u64, role_id: u64) -> Result<Option<String>>;

    async fn member_has_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> Result<bool>;

    async fn add_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> Result<()>;

    async fn remove_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> Result<()>;
}

/// Result of a toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    RoleMissing,
}

/// The role a given alert kind pings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRole {
    pub role_id: Option<u64>,
    /// Environment key, shown when the role cannot be found
    pub config_key: &'static str,
}

impl AlertRole {
    pub fn for_alert(alert: TickAlert, config: &DiscordConfig) -> Self {
        match alert {
            TickAlert::Hourly => Self {
                role_id: config.hour_tick_role_id,
                config_key: "HOUR_TICK_ROLE_ID",
            },
            TickAlert::FieldBoss => Self {
                role_id: config.field_boss_role_id,
                config_key: "FIELD_BOSS_ROLE_ID",
            },
        }
    }
}

/// Toggle `role` for a member and return the ephemeral acknowledgement text.
pub async fn toggle_alert_role(
    directory: &dyn RoleDirectory,
    guild_id: u64,
    user_id: u64,
    role: &AlertRole,
) -> Result<(ToggleOutcome, String)> {
    let missing = || {
        (
            ToggleOutcome::RoleMissing,
            format!("❌ `{}` 역할을 못 찾았어요", role.config_key),
        )
    };

    let Some(role_id) = role.role_id else {
        return Ok(missing());
    };
    let Some(name) = directory.role_name(guild_id, role_id).await? else {
        return Ok(missing());
    };

    if directory.member_has_role(guild_id, user_id, role_id).await? {
        directory.remove_role(guild_id, user_id, role_id).await?;
        Ok((ToggleOutcome::Removed, format!("❎ `{name}` 해제했어요")))
    } else {
        directory.add_role(guild_id, user_id, role_id).await?;
        Ok((ToggleOutcome::Added, format!("✅ `{name}` 설정했어요")))
    }
}

#[derive(Debug, Deserialize)]
struct RolePayload {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct MemberPayload {
    #[serde(default)]
    roles: Vec<String>,
}

#[async_trait]
impl RoleDirectory for DiscordClient {
    async fn role_name(&self, guild_id: u64, role_id: u64) -> Result<Option<String>> {
        let url = self.endpoint(&format!("/guilds/{guild_id}/roles"));
        let response = self.execute(|| self.http().get(&url)).await?;
        let roles: Vec<RolePayload> = Self::check(response).await?.json().await?;
        let wanted = role_id.to_string();
        Ok(roles.into_iter().find(|r| r.id == wanted).map(|r| r.name))
    }

    async fn member_has_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> Result<bool> {
        let url = self.endpoint(&format!("/guilds/{guild_id}/members/{user_id}"));
        let response = self.execute(|| self.http().get(&url)).await?;
        let member: MemberPayload = Self::check(response).await?.json().await?;
        let wanted = role_id.to_string();
        Ok(member.roles.iter().any(|r| *r == wanted))
    }

    async fn add_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> Result<()> {
        let url = self.endpoint(&format!(
            "/guilds/{guild_id}/members/{user_id}/roles/{role_id}"
        ));
        let response = self
            .execute(|| {
                self.http()
                    .put(&url)
                    .header("X-Audit-Log-Reason", TOGGLE_REASON)
            })
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn remove_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> Result<()> {
        let url = self.endpoint(&format!(
            "/guilds/{guild_id}/members/{user_id}/roles/{role_id}"
        ));
        let response = self
            .execute(|| {
                self.http()
                    .delete(&url)
                    .header("X-Audit-Log-Reason", TOGGLE_REASON)
            })
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
