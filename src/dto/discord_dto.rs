use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

pub const INTERACTION_PING: u8 = 1;
pub const INTERACTION_APPLICATION_COMMAND: u8 = 2;
pub const INTERACTION_MESSAGE_COMPONENT: u8 = 3;
pub const INTERACTION_MODAL_SUBMIT: u8 = 5;

pub const RESPONSE_PONG: u8 = 1;
pub const RESPONSE_CHANNEL_MESSAGE: u8 = 4;
pub const RESPONSE_DEFERRED_CHANNEL_MESSAGE: u8 = 5;
pub const RESPONSE_MODAL: u8 = 9;

pub const FLAG_EPHEMERAL: u64 = 1 << 6;

pub const CHANNEL_GUILD_TEXT: u8 = 0;
pub const CHANNEL_GUILD_CATEGORY: u8 = 4;

pub const OVERWRITE_ROLE: u8 = 0;
pub const OVERWRITE_MEMBER: u8 = 1;

pub const PERMISSION_VIEW_CHANNEL: u64 = 1 << 10;
pub const PERMISSION_SEND_MESSAGES: u64 = 1 << 11;
pub const PERMISSION_READ_MESSAGE_HISTORY: u64 = 1 << 16;

pub const BUTTON_PRIMARY: u8 = 1;
pub const BUTTON_SUCCESS: u8 = 3;

// ---------------------------------------------------------------------------
// Inbound interaction payloads

#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub application_id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub token: String,
    pub guild_id: Option<String>,
    pub member: Option<Member>,
    pub user: Option<DiscordUser>,
    pub data: Option<JsonValue>,
}

impl Interaction {
    /// Guild interactions carry the invoker under `member`, DMs under `user`.
    pub fn invoker(&self) -> Option<&DiscordUser> {
        self.member
            .as_ref()
            .map(|m| &m.user)
            .or(self.user.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    pub global_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    pub user: DiscordUser,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
    pub resolved: Option<ResolvedData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub value: Option<JsonValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolvedData {
    #[serde(default)]
    pub users: HashMap<String, DiscordUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComponentData {
    pub custom_id: String,
    pub component_type: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModalData {
    pub custom_id: String,
    #[serde(default)]
    pub components: Vec<ModalRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModalRow {
    #[serde(default)]
    pub components: Vec<ModalInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModalInput {
    pub custom_id: String,
    #[serde(default)]
    pub value: String,
}

// ---------------------------------------------------------------------------
// Interaction responses and message bodies

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ResponseData {
    Message(OutgoingMessage),
    Modal(Modal),
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: RESPONSE_PONG,
            data: None,
        }
    }

    pub fn message(message: OutgoingMessage) -> Self {
        Self {
            kind: RESPONSE_CHANNEL_MESSAGE,
            data: Some(ResponseData::Message(message)),
        }
    }

    /// "Bot is thinking…" placeholder, visible only to the invoker.
    pub fn deferred_ephemeral() -> Self {
        Self {
            kind: RESPONSE_DEFERRED_CHANNEL_MESSAGE,
            data: Some(ResponseData::Message(OutgoingMessage {
                flags: Some(FLAG_EPHEMERAL),
                ..Default::default()
            })),
        }
    }

    pub fn modal(modal: Modal) -> Self {
        Self {
            kind: RESPONSE_MODAL,
            data: Some(ResponseData::Modal(modal)),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct OutgoingMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<ActionRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            flags: Some(FLAG_EPHEMERAL),
            ..Default::default()
        }
    }

    pub fn with_button(mut self, button: Button) -> Self {
        self.components
            .get_or_insert_with(Vec::new)
            .push(ActionRow::new(vec![Component::Button(button)]));
        self
    }

    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActionRow {
    #[serde(rename = "type")]
    pub kind: u8,
    pub components: Vec<Component>,
}

impl ActionRow {
    pub fn new(components: Vec<Component>) -> Self {
        Self { kind: 1, components }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Component {
    Button(Button),
    TextInput(TextInput),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Button {
    #[serde(rename = "type")]
    pub kind: u8,
    pub style: u8,
    pub label: String,
    pub custom_id: String,
}

impl Button {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>, style: u8) -> Self {
        Self {
            kind: 2,
            style,
            label: label.into(),
            custom_id: custom_id.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TextInput {
    #[serde(rename = "type")]
    pub kind: u8,
    pub custom_id: String,
    pub label: String,
    pub style: u8,
    pub placeholder: Option<String>,
    pub required: bool,
    pub min_length: u16,
    pub max_length: u16,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Modal {
    pub custom_id: String,
    pub title: String,
    pub components: Vec<ActionRow>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbedFooter {
    pub text: String,
}

// ---------------------------------------------------------------------------
// REST objects

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildChannel {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub name: String,
    pub parent_id: Option<String>,
}

impl GuildChannel {
    pub fn is_text(&self) -> bool {
        self.kind == CHANNEL_GUILD_TEXT
    }

    pub fn is_category(&self) -> bool {
        self.kind == CHANNEL_GUILD_CATEGORY
    }

    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRole {
    pub id: String,
    pub name: String,
}

impl GuildRole {
    pub fn mention(&self) -> String {
        format!("<@&{}>", self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionOverwrite {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub allow: String,
    pub deny: String,
}

impl PermissionOverwrite {
    pub fn allow_member(user_id: &str, permissions: u64) -> Self {
        Self {
            id: user_id.to_string(),
            kind: OVERWRITE_MEMBER,
            allow: permissions.to_string(),
            deny: "0".to_string(),
        }
    }

    pub fn allow_role(role_id: &str, permissions: u64) -> Self {
        Self {
            id: role_id.to_string(),
            kind: OVERWRITE_ROLE,
            allow: permissions.to_string(),
            deny: "0".to_string(),
        }
    }

    pub fn deny_role(role_id: &str, permissions: u64) -> Self {
        Self {
            id: role_id.to_string(),
            kind: OVERWRITE_ROLE,
            allow: "0".to_string(),
            deny: permissions.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateChannel {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub permission_overwrites: Vec<PermissionOverwrite>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelMessage {
    pub id: String,
}

pub fn user_mention(user_id: &str) -> String {
    format!("<@{}>", user_id)
}
