use std::sync::Arc;

use crate::dto::discord_dto::{
    CreateChannel, GuildChannel, GuildRole, PermissionOverwrite, CHANNEL_GUILD_TEXT,
    PERMISSION_READ_MESSAGE_HISTORY, PERMISSION_SEND_MESSAGES, PERMISSION_VIEW_CHANNEL,
};
use crate::error::{Error, Result};
use crate::services::discord_service::ChatPlatform;
use crate::services::message_service;

const APPLICANT_PERMISSIONS: u64 =
    PERMISSION_VIEW_CHANNEL | PERMISSION_SEND_MESSAGES | PERMISSION_READ_MESSAGE_HISTORY;

/// Users granted access to an applicant channel besides the recruiter roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grantees {
    pub applicant_id: String,
    pub recruiter_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub channel: GuildChannel,
    pub created: bool,
    /// Recruiter roles granted on creation; empty when the channel already existed.
    pub recruiter_roles: Vec<GuildRole>,
}

#[derive(Clone)]
pub struct ChannelService {
    platform: Arc<dyn ChatPlatform>,
    guild_id: String,
    recruiter_marker: String,
    ticket_category: String,
    info_channel_name: String,
}

/// `recruit-<slug>-<id>`; the slug keeps only `[a-z0-9-]` of the lowercased handle.
pub fn applicant_channel_name(handle: &str, application_id: &str) -> String {
    let slug: String = handle
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect();
    format!("recruit-{}-{}", slug, application_id)
}

impl ChannelService {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        guild_id: String,
        recruiter_marker: String,
        ticket_category: String,
        info_channel_name: String,
    ) -> Self {
        Self {
            platform,
            guild_id,
            recruiter_marker: recruiter_marker.to_lowercase(),
            ticket_category,
            info_channel_name,
        }
    }

    pub async fn find_applicant_channel(
        &self,
        handle: &str,
        application_id: &str,
    ) -> Result<Option<GuildChannel>> {
        let name = applicant_channel_name(handle, application_id);
        let channels = self.platform.list_channels().await?;
        Ok(channels
            .into_iter()
            .find(|ch| ch.is_text() && ch.name.contains(&name)))
    }

    /// Roles whose name contains the recruiter marker, case-insensitively.
    pub async fn recruiter_roles(&self) -> Result<Vec<GuildRole>> {
        let roles = self.platform.list_roles().await?;
        Ok(roles
            .into_iter()
            .filter(|role| role.name.to_lowercase().contains(&self.recruiter_marker))
            .collect())
    }

    /// First text channel whose name contains the recruiter marker.
    pub async fn recruiter_channel(&self) -> Result<Option<GuildChannel>> {
        let channels = self.platform.list_channels().await?;
        Ok(channels
            .into_iter()
            .find(|ch| ch.is_text() && ch.name.to_lowercase().contains(&self.recruiter_marker)))
    }

    /// Returns the applicant's channel, creating it only if no channel with
    /// the derived name exists yet.
    pub async fn ensure_applicant_channel(
        &self,
        handle: &str,
        application_id: &str,
        grantees: &Grantees,
    ) -> Result<Provisioned> {
        let name = applicant_channel_name(handle, application_id);
        let channels = self
            .platform
            .list_channels()
            .await
            .map_err(|e| Error::Provision(e.to_string()))?;

        if let Some(existing) = channels
            .iter()
            .find(|ch| ch.is_text() && ch.name.contains(&name))
        {
            tracing::info!(channel_id = %existing.id, %name, "Applicant channel already exists");
            return Ok(Provisioned {
                channel: existing.clone(),
                created: false,
                recruiter_roles: Vec::new(),
            });
        }

        let parent_id = channels
            .iter()
            .find(|ch| ch.is_category() && ch.name == self.ticket_category)
            .map(|ch| ch.id.clone());

        let recruiter_roles = self
            .recruiter_roles()
            .await
            .map_err(|e| Error::Provision(e.to_string()))?;

        let request = CreateChannel {
            name: name.clone(),
            kind: CHANNEL_GUILD_TEXT,
            parent_id,
            permission_overwrites: self.overwrites(grantees, &recruiter_roles),
        };

        let channel = self.platform.create_channel(request).await.map_err(|e| match e {
            Error::Provision(_) => e,
            other => Error::Provision(other.to_string()),
        })?;
        tracing::info!(channel_id = %channel.id, %name, "Created applicant channel");

        Ok(Provisioned {
            channel,
            created: true,
            recruiter_roles,
        })
    }

    fn overwrites(&self, grantees: &Grantees, roles: &[GuildRole]) -> Vec<PermissionOverwrite> {
        // @everyone shares the guild's id
        let mut overwrites = vec![
            PermissionOverwrite::deny_role(&self.guild_id, PERMISSION_VIEW_CHANNEL),
            PermissionOverwrite::allow_member(&grantees.applicant_id, APPLICANT_PERMISSIONS),
        ];
        if let Some(recruiter_id) = &grantees.recruiter_id {
            overwrites.push(PermissionOverwrite::allow_member(recruiter_id, APPLICANT_PERMISSIONS));
        }
        overwrites.extend(
            roles
                .iter()
                .map(|role| PermissionOverwrite::allow_role(&role.id, APPLICANT_PERMISSIONS)),
        );
        overwrites
    }

    /// Makes sure the public info channel exists and holds exactly one fresh
    /// welcome message with the handle button.
    pub async fn setup_info_channel(&self) -> Result<GuildChannel> {
        let channels = self.platform.list_channels().await?;
        let existing = channels
            .into_iter()
            .find(|ch| ch.is_text() && ch.name == self.info_channel_name);

        let channel = match existing {
            Some(channel) => {
                let ids = self.platform.recent_message_ids(&channel.id, 100).await?;
                if let Err(e) = self.platform.delete_messages(&channel.id, &ids).await {
                    tracing::warn!(error = ?e, "Failed to clear recruitment info channel");
                }
                channel
            }
            None => {
                let request = CreateChannel {
                    name: self.info_channel_name.clone(),
                    kind: CHANNEL_GUILD_TEXT,
                    parent_id: None,
                    permission_overwrites: vec![PermissionOverwrite {
                        id: self.guild_id.clone(),
                        kind: crate::dto::discord_dto::OVERWRITE_ROLE,
                        allow: (PERMISSION_VIEW_CHANNEL | PERMISSION_SEND_MESSAGES).to_string(),
                        deny: "0".to_string(),
                    }],
                };
                self.platform.create_channel(request).await?
            }
        };

        self.platform
            .send_message(&channel.id, &message_service::info_channel_welcome())
            .await?;
        Ok(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::discord_dto::{OVERWRITE_MEMBER, OVERWRITE_ROLE};
    use crate::services::test_support::FakePlatform;

    fn service(platform: Arc<FakePlatform>) -> ChannelService {
        ChannelService::new(
            platform,
            "guild".to_string(),
            "recruiter".to_string(),
            "Recruitment Tickets".to_string(),
            "recruitment-info".to_string(),
        )
    }

    fn grantees() -> Grantees {
        Grantees {
            applicant_id: "u1".to_string(),
            recruiter_id: None,
        }
    }

    #[test]
    fn channel_name_strips_disallowed_characters() {
        assert_eq!(applicant_channel_name("Foo_Bar", "7"), "recruit-foobar-7");
        assert_eq!(applicant_channel_name("x-Wing 99!", "ab"), "recruit-x-wing99-ab");
    }

    #[tokio::test]
    async fn ensure_is_idempotent() {
        let platform = Arc::new(FakePlatform::new());
        let svc = service(platform.clone());

        let first = svc.ensure_applicant_channel("Foo_Bar", "42", &grantees()).await.unwrap();
        let second = svc.ensure_applicant_channel("Foo_Bar", "42", &grantees()).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.channel.id, second.channel.id);
        assert_eq!(platform.created_channels().len(), 1);
    }

    #[tokio::test]
    async fn grants_applicant_recruiter_and_recruiter_roles() {
        let platform = Arc::new(FakePlatform::new());
        platform.add_role("r1", "Recruiter");
        platform.add_role("r2", "Senior RECRUITERS");
        platform.add_role("r3", "Member");
        platform.add_channel("cat", "Recruitment Tickets", 4);
        let svc = service(platform.clone());

        let grantees = Grantees {
            applicant_id: "u1".to_string(),
            recruiter_id: Some("boss".to_string()),
        };
        let provisioned = svc.ensure_applicant_channel("Foo", "1", &grantees).await.unwrap();

        let created = platform.created_channels();
        let request = &created[0];
        assert_eq!(request.parent_id.as_deref(), Some("cat"));

        let ow = &request.permission_overwrites;
        assert_eq!(ow[0].id, "guild");
        assert_eq!(ow[0].kind, OVERWRITE_ROLE);
        assert_eq!(ow[0].deny, PERMISSION_VIEW_CHANNEL.to_string());

        let members: Vec<&str> = ow
            .iter()
            .filter(|o| o.kind == OVERWRITE_MEMBER)
            .map(|o| o.id.as_str())
            .collect();
        assert_eq!(members, vec!["u1", "boss"]);

        let roles: Vec<&str> = ow
            .iter()
            .skip(1)
            .filter(|o| o.kind == OVERWRITE_ROLE)
            .map(|o| o.id.as_str())
            .collect();
        assert_eq!(roles, vec!["r1", "r2"]);
        assert_eq!(provisioned.recruiter_roles.len(), 2);
    }

    #[tokio::test]
    async fn creation_failure_is_provision_error() {
        let platform = Arc::new(FakePlatform::new());
        platform.fail_channel_creation();
        let svc = service(platform);

        let err = svc.ensure_applicant_channel("Foo", "1", &grantees()).await.unwrap_err();
        assert!(matches!(err, Error::Provision(_)));
    }

    #[tokio::test]
    async fn setup_info_channel_clears_and_reposts() {
        let platform = Arc::new(FakePlatform::new());
        platform.add_channel("info", "recruitment-info", 0);
        platform.seed_messages("info", &["m1", "m2"]);
        let svc = service(platform.clone());

        let channel = svc.setup_info_channel().await.unwrap();

        assert_eq!(channel.id, "info");
        assert!(platform.created_channels().is_empty());
        assert_eq!(platform.deleted_messages("info"), vec!["m1", "m2"]);
        let sent = platform.sent_messages("info");
        assert_eq!(sent.len(), 1);
        assert!(sent[0].content.as_deref().unwrap().starts_with("Welcome to the recruitment process"));
    }

    #[tokio::test]
    async fn setup_info_channel_creates_when_missing() {
        let platform = Arc::new(FakePlatform::new());
        let svc = service(platform.clone());

        svc.setup_info_channel().await.unwrap();

        let created = platform.created_channels();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name, "recruitment-info");
    }
}
