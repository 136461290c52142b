use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, Response};
use serde_json::json;

use crate::dto::discord_dto::{
    ChannelMessage, CreateChannel, GuildChannel, GuildRole, OutgoingMessage,
};
use crate::error::{Error, Result};

/// The chat platform operations the recruitment workflow depends on. All
/// guild-scoped calls act on the single configured guild.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn list_channels(&self) -> Result<Vec<GuildChannel>>;

    async fn list_roles(&self) -> Result<Vec<GuildRole>>;

    async fn create_channel(&self, request: CreateChannel) -> Result<GuildChannel>;

    async fn send_message(&self, channel_id: &str, message: &OutgoingMessage) -> Result<()>;

    /// Ids of the most recent messages in a channel, newest first.
    async fn recent_message_ids(&self, channel_id: &str, limit: u8) -> Result<Vec<String>>;

    async fn delete_messages(&self, channel_id: &str, message_ids: &[String]) -> Result<()>;

    async fn create_role(&self, name: &str) -> Result<GuildRole>;

    async fn add_member_role(&self, user_id: &str, role_id: &str) -> Result<()>;

    /// Replaces the deferred placeholder of an interaction.
    async fn edit_original_response(
        &self,
        interaction_token: &str,
        message: &OutgoingMessage,
    ) -> Result<()>;
}

#[derive(Clone)]
pub struct DiscordService {
    client: Client,
    api_base: String,
    bot_token: String,
    application_id: String,
    guild_id: String,
}

impl DiscordService {
    pub fn new(
        client: Client,
        api_base: String,
        bot_token: String,
        application_id: String,
        guild_id: String,
    ) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token,
            application_id,
            guild_id,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    /// Replaces the guild's slash commands with `/recruit`.
    pub async fn register_commands(&self) -> Result<usize> {
        let commands = json!([{
            "name": "recruit",
            "description": "Initiates a recruitment ticket.",
            "type": 1,
            "options": [{
                "type": 6,
                "name": "recruit",
                "description": "The user applying for recruitment",
                "required": true
            }]
        }]);

        let url = self.url(&format!(
            "/applications/{}/guilds/{}/commands",
            self.application_id, self.guild_id
        ));
        let response = self
            .client
            .put(&url)
            .header(AUTHORIZATION, self.auth())
            .json(&commands)
            .send()
            .await?;
        let registered: Vec<serde_json::Value> = check(response).await?.json().await?;
        Ok(registered.len())
    }
}

/// Turns a non-2xx reply into an error carrying Discord's body.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Internal(format!("Discord API returned {}: {}", status, body)))
}

#[async_trait]
impl ChatPlatform for DiscordService {
    async fn list_channels(&self) -> Result<Vec<GuildChannel>> {
        let url = self.url(&format!("/guilds/{}/channels", self.guild_id));
        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.auth())
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn list_roles(&self) -> Result<Vec<GuildRole>> {
        let url = self.url(&format!("/guilds/{}/roles", self.guild_id));
        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.auth())
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn create_channel(&self, request: CreateChannel) -> Result<GuildChannel> {
        let url = self.url(&format!("/guilds/{}/channels", self.guild_id));
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.auth())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provision(e.to_string()))?;
        let response = check(response)
            .await
            .map_err(|e| Error::Provision(e.to_string()))?;
        response
            .json()
            .await
            .map_err(|e| Error::Provision(e.to_string()))
    }

    async fn send_message(&self, channel_id: &str, message: &OutgoingMessage) -> Result<()> {
        let url = self.url(&format!("/channels/{}/messages", channel_id));
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.auth())
            .json(message)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn recent_message_ids(&self, channel_id: &str, limit: u8) -> Result<Vec<String>> {
        let url = self.url(&format!("/channels/{}/messages", channel_id));
        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.auth())
            .query(&[("limit", limit.min(100).to_string())])
            .send()
            .await?;
        let messages: Vec<ChannelMessage> = check(response).await?.json().await?;
        Ok(messages.into_iter().map(|m| m.id).collect())
    }

    async fn delete_messages(&self, channel_id: &str, message_ids: &[String]) -> Result<()> {
        match message_ids {
            [] => Ok(()),
            // bulk-delete rejects fewer than two ids
            [single] => {
                let url = self.url(&format!("/channels/{}/messages/{}", channel_id, single));
                let response = self
                    .client
                    .delete(&url)
                    .header(AUTHORIZATION, self.auth())
                    .send()
                    .await?;
                check(response).await?;
                Ok(())
            }
            many => {
                let url = self.url(&format!("/channels/{}/messages/bulk-delete", channel_id));
                let response = self
                    .client
                    .post(&url)
                    .header(AUTHORIZATION, self.auth())
                    .json(&json!({ "messages": many }))
                    .send()
                    .await?;
                check(response).await?;
                Ok(())
            }
        }
    }

    async fn create_role(&self, name: &str) -> Result<GuildRole> {
        let url = self.url(&format!("/guilds/{}/roles", self.guild_id));
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.auth())
            .json(&json!({ "name": name }))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn add_member_role(&self, user_id: &str, role_id: &str) -> Result<()> {
        let url = self.url(&format!(
            "/guilds/{}/members/{}/roles/{}",
            self.guild_id, user_id, role_id
        ));
        let response = self
            .client
            .put(&url)
            .header(AUTHORIZATION, self.auth())
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn edit_original_response(
        &self,
        interaction_token: &str,
        message: &OutgoingMessage,
    ) -> Result<()> {
        let url = self.url(&format!(
            "/webhooks/{}/{}/messages/@original",
            self.application_id, interaction_token
        ));
        let response = self.client.patch(&url).json(message).send().await?;
        check(response).await?;
        Ok(())
    }
}
