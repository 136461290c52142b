use crate::dto::discord_dto::{
    CommandData, ComponentData, DiscordUser, Interaction, ModalData,
    INTERACTION_APPLICATION_COMMAND, INTERACTION_MESSAGE_COMPONENT, INTERACTION_MODAL_SUBMIT,
    INTERACTION_PING,
};
use crate::error::{Error, Result};

/// Option type code for a user parameter on a slash command.
const OPTION_USER: u8 = 6;

/// A verified inbound interaction, narrowed to the kinds the bot handles.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Ping,
    ButtonPress(ButtonPress),
    ModalSubmit(ModalSubmit),
    SlashCommand(SlashCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ButtonPress {
    pub custom_id: String,
    pub user: DiscordUser,
    pub guild_id: Option<String>,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModalSubmit {
    pub custom_id: String,
    pub fields: Vec<(String, String)>,
    pub user: DiscordUser,
    pub guild_id: Option<String>,
    pub token: String,
}

impl ModalSubmit {
    pub fn field(&self, custom_id: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(id, _)| id == custom_id)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlashCommand {
    pub name: String,
    /// First user-typed option, resolved to the full user object.
    pub target_user: Option<DiscordUser>,
    pub user: DiscordUser,
    pub guild_id: Option<String>,
    pub token: String,
}

impl TryFrom<Interaction> for InboundEvent {
    type Error = Error;

    fn try_from(interaction: Interaction) -> Result<Self> {
        if interaction.kind == INTERACTION_PING {
            return Ok(InboundEvent::Ping);
        }

        let user = interaction
            .invoker()
            .cloned()
            .ok_or_else(|| Error::BadRequest("interaction has no invoking user".into()))?;
        let data = interaction
            .data
            .clone()
            .ok_or_else(|| Error::BadRequest("interaction has no data".into()))?;
        let guild_id = interaction.guild_id.clone();
        let token = interaction.token.clone();

        match interaction.kind {
            INTERACTION_MESSAGE_COMPONENT => {
                let data: ComponentData = serde_json::from_value(data)?;
                Ok(InboundEvent::ButtonPress(ButtonPress {
                    custom_id: data.custom_id,
                    user,
                    guild_id,
                    token,
                }))
            }
            INTERACTION_MODAL_SUBMIT => {
                let data: ModalData = serde_json::from_value(data)?;
                let fields = data
                    .components
                    .into_iter()
                    .flat_map(|row| row.components)
                    .map(|input| (input.custom_id, input.value))
                    .collect();
                Ok(InboundEvent::ModalSubmit(ModalSubmit {
                    custom_id: data.custom_id,
                    fields,
                    user,
                    guild_id,
                    token,
                }))
            }
            INTERACTION_APPLICATION_COMMAND => {
                let data: CommandData = serde_json::from_value(data)?;
                let target_user = data
                    .options
                    .iter()
                    .find(|opt| opt.kind == OPTION_USER)
                    .and_then(|opt| opt.value.as_ref())
                    .and_then(|value| value.as_str())
                    .and_then(|id| {
                        data.resolved
                            .as_ref()
                            .and_then(|resolved| resolved.users.get(id))
                            .cloned()
                    });
                Ok(InboundEvent::SlashCommand(SlashCommand {
                    name: data.name,
                    target_user,
                    user,
                    guild_id,
                    token,
                }))
            }
            other => Err(Error::BadRequest(format!(
                "unsupported interaction type {}",
                other
            ))),
        }
    }
}
