use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::dto::discord_dto::{CreateChannel, GuildChannel, GuildRole, OutgoingMessage};
use crate::error::{Error, Result};
use crate::services::discord_service::ChatPlatform;

#[derive(Default)]
struct FakeState {
    channels: Vec<GuildChannel>,
    roles: Vec<GuildRole>,
    created: Vec<CreateChannel>,
    messages: HashMap<String, Vec<String>>,
    sent: Vec<(String, OutgoingMessage)>,
    deleted: HashMap<String, Vec<String>>,
    member_roles: Vec<(String, String)>,
    fail_create: bool,
    next_id: u64,
}

/// In-memory guild that records every call.
#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<FakeState>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_role(&self, id: &str, name: &str) {
        self.state.lock().unwrap().roles.push(GuildRole {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    pub fn add_channel(&self, id: &str, name: &str, kind: u8) {
        self.state.lock().unwrap().channels.push(GuildChannel {
            id: id.to_string(),
            kind,
            name: name.to_string(),
            parent_id: None,
        });
    }

    pub fn seed_messages(&self, channel_id: &str, ids: &[&str]) {
        self.state
            .lock()
            .unwrap()
            .messages
            .insert(channel_id.to_string(), ids.iter().map(|s| s.to_string()).collect());
    }

    pub fn fail_channel_creation(&self) {
        self.state.lock().unwrap().fail_create = true;
    }

    pub fn created_channels(&self) -> Vec<CreateChannel> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn sent_messages(&self, channel_id: &str) -> Vec<OutgoingMessage> {
        self.state
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|(id, _)| id == channel_id)
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    pub fn deleted_messages(&self, channel_id: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .deleted
            .get(channel_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn member_roles(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().member_roles.clone()
    }

    pub fn roles(&self) -> Vec<GuildRole> {
        self.state.lock().unwrap().roles.clone()
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn list_channels(&self) -> Result<Vec<GuildChannel>> {
        Ok(self.state.lock().unwrap().channels.clone())
    }

    async fn list_roles(&self) -> Result<Vec<GuildRole>> {
        Ok(self.state.lock().unwrap().roles.clone())
    }

    async fn create_channel(&self, request: CreateChannel) -> Result<GuildChannel> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create {
            return Err(Error::Provision("Missing Permissions".to_string()));
        }
        state.next_id += 1;
        let channel = GuildChannel {
            id: format!("ch{}", state.next_id),
            kind: request.kind,
            name: request.name.clone(),
            parent_id: request.parent_id.clone(),
        };
        state.channels.push(channel.clone());
        state.created.push(request);
        Ok(channel)
    }

    async fn send_message(&self, channel_id: &str, message: &OutgoingMessage) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .sent
            .push((channel_id.to_string(), message.clone()));
        Ok(())
    }

    async fn recent_message_ids(&self, channel_id: &str, _limit: u8) -> Result<Vec<String>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .messages
            .get(channel_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_messages(&self, channel_id: &str, message_ids: &[String]) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .deleted
            .entry(channel_id.to_string())
            .or_default()
            .extend(message_ids.iter().cloned());
        Ok(())
    }

    async fn create_role(&self, name: &str) -> Result<GuildRole> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let role = GuildRole {
            id: format!("role{}", state.next_id),
            name: name.to_string(),
        };
        state.roles.push(role.clone());
        Ok(role)
    }

    async fn add_member_role(&self, user_id: &str, role_id: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .member_roles
            .push((user_id.to_string(), role_id.to_string()));
        Ok(())
    }

    async fn edit_original_response(
        &self,
        _interaction_token: &str,
        _message: &OutgoingMessage,
    ) -> Result<()> {
        Ok(())
    }
}
