//! User-facing text, embeds, buttons and modals.

use crate::dto::discord_dto::{
    user_mention, ActionRow, Button, Component, Embed, EmbedField, EmbedFooter, EmbedImage,
    GuildChannel, GuildRole, Modal, OutgoingMessage, TextInput, BUTTON_PRIMARY, BUTTON_SUCCESS,
};
use crate::models::application::Application;
use crate::routes::event_router::{
    Action, HANDLE_INPUT_FIELD, HANDLE_INPUT_MODAL, OPEN_HANDLE_MODAL,
};
use crate::services::profile_service::ProfilePage;

const NOT_AVAILABLE: &str = "Not available";
const EMBED_COLOR: u32 = 0x0099ff;
/// Discord rejects message content longer than this.
const MAX_MESSAGE_CHARS: usize = 2000;

pub const MSG_VALIDATION_NOT_FOUND: &str =
    "Could not find a pending validation for your account or this validation has expired.";
pub const MSG_VALIDATION_CODE_MISSING: &str =
    "Validation failed. The code was not found in your Star Citizen bio. Please try again.";
pub const MSG_VALIDATION_FETCH_FAILED: &str = "There was an error validating your handle. Please ensure your handle is correct and your profile is public.";
pub const MSG_VALIDATION_INTERNAL: &str = "An internal error occurred during validation.";
pub const MSG_RECRUITMENT_NOT_FOUND: &str =
    "Could not find your validated application. Please contact an administrator.";
pub const MSG_RECRUITMENT_PROVISION_FAILED: &str =
    "Failed to create your recruitment channel. Please contact an administrator.";
pub const MSG_RECRUITMENT_INTERNAL: &str =
    "An error occurred while starting the recruitment process. Please try again later.";
pub const MSG_HANDLE_INVALID: &str = "Your handle must be between 3 and 50 characters long.";
pub const MSG_HANDLE_INTERNAL: &str = "There was an error processing your request.";
pub const MSG_TICKET_GUILD_ONLY: &str = "This command can only be used in a server.";
pub const MSG_TICKET_MISSING_RECRUIT: &str = "Please choose the user applying for recruitment.";
pub const MSG_TICKET_INTERNAL: &str = "There was an error creating the recruitment ticket.";
pub const MSG_UNKNOWN_ACTION: &str = "This action is no longer available.";

fn or_na(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

pub fn info_channel_welcome() -> OutgoingMessage {
    OutgoingMessage::text(
        "Welcome to the recruitment process! Click the button below to begin your application.",
    )
    .with_button(Button::new(
        OPEN_HANDLE_MODAL,
        "Enter Star Citizen Handle",
        BUTTON_PRIMARY,
    ))
}

pub fn handle_modal() -> Modal {
    Modal {
        custom_id: HANDLE_INPUT_MODAL.to_string(),
        title: "Enter Your Star Citizen Handle".to_string(),
        components: vec![ActionRow::new(vec![Component::TextInput(TextInput {
            kind: 4,
            custom_id: HANDLE_INPUT_FIELD.to_string(),
            label: "Your Star Citizen Handle".to_string(),
            style: 1,
            placeholder: Some("Enter your handle here".to_string()),
            required: true,
            min_length: 3,
            max_length: 50,
        })])],
    }
}

pub fn validation_code_issued(username: &str, application: &Application) -> OutgoingMessage {
    let code = application.validation_code.as_deref().unwrap_or_default();
    OutgoingMessage::ephemeral(format!(
        "Thank you, {}! Please add the following code to your Star Citizen bio for validation: `{}`. Once added, click the button below to validate.",
        username, code
    ))
    .with_button(Button::new(
        Action::ValidateRecruit(application.id.to_string()).custom_id(),
        "Validate Bio",
        BUTTON_PRIMARY,
    ))
}

pub fn validation_succeeded(application: &Application) -> OutgoingMessage {
    OutgoingMessage::text(
        "Validation successful! Your Star Citizen profile information has been saved.\n\n\
         **What happens next?**\n\
         1. Click the button below to start the recruitment process\n\
         2. A private channel will be created for you\n\
         3. A recruiter will review your information and contact you\n\
         4. You will be guided through the onboarding process\n\n\
         When you are ready, click the button below:",
    )
    .with_button(Button::new(
        Action::StartRecruitment(application.id.to_string()).custom_id(),
        "Start Recruitment Process",
        BUTTON_SUCCESS,
    ))
}

pub fn channel_created(channel: &GuildChannel) -> OutgoingMessage {
    OutgoingMessage::text(format!(
        "Your recruitment channel has been created! Please check {}.",
        channel.mention()
    ))
}

pub fn channel_already_exists(channel: &GuildChannel) -> OutgoingMessage {
    OutgoingMessage::text(format!(
        "Your recruitment channel has already been created. Please check {}.",
        channel.mention()
    ))
}

pub fn ticket_created(recruit_username: &str, channel: &GuildChannel) -> OutgoingMessage {
    OutgoingMessage::text(format!(
        "Recruitment ticket created for {} in {}",
        recruit_username,
        channel.mention()
    ))
}

pub fn role_mentions(roles: &[GuildRole]) -> String {
    roles
        .iter()
        .map(|r| r.mention())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn recruit_embed(application: &Application) -> Embed {
    let handle = application.handle.as_deref();
    let p = &application.profile;
    let field = |name: &str, value: Option<&str>| EmbedField {
        name: name.to_string(),
        value: or_na(value),
        inline: true,
    };

    Embed {
        title: Some(format!("Recruit Information: {}", or_na(handle))),
        description: Some("Star Citizen profile information".to_string()),
        color: Some(EMBED_COLOR),
        fields: vec![
            field("Handle", handle),
            field("Real Name", p.real_name.as_deref()),
            field("Title", p.title.as_deref()),
            field("Enlisted Date", p.enlisted_date.as_deref()),
            field("Location", p.location.as_deref()),
            field("Fluency", p.fluency.as_deref()),
            field("Organization", p.org_name.as_deref()),
            field("SID", p.org_sid.as_deref()),
            field("Rank", p.org_rank.as_deref()),
        ],
        thumbnail: p.profile_image_url.clone().map(|url| EmbedImage { url }),
        image: p.org_logo_url.clone().map(|url| EmbedImage { url }),
        footer: Some(EmbedFooter {
            text: format!("Application ID: {}", application.id),
        }),
        timestamp: Some(chrono::Utc::now().to_rfc3339()),
    }
}

pub fn applicant_channel_welcome(application: &Application, user_id: &str) -> OutgoingMessage {
    OutgoingMessage::text(format!(
        "Welcome {}! This is your private recruitment channel.\n\n\
         A recruiter will review your information and guide you through the next steps.\n\n\
         Please be patient and feel free to ask any questions here.",
        user_mention(user_id)
    ))
    .with_embed(recruit_embed(application))
}

pub fn ticket_channel_welcome(
    application: &Application,
    recruit_id: &str,
    recruiter_id: &str,
) -> OutgoingMessage {
    OutgoingMessage::text(format!(
        "Welcome {}! {} has initiated a recruitment ticket for you. Recruiters will be with you shortly. \
         Please provide any information requested by the recruiters here. Application ID: {}",
        user_mention(recruit_id),
        user_mention(recruiter_id),
        application.id
    ))
}

pub fn recruiter_notification(roles: &[GuildRole], channel: &GuildChannel) -> OutgoingMessage {
    OutgoingMessage::text(format!(
        "{}\nNew recruit application started: {}",
        role_mentions(roles),
        channel.mention()
    ))
}

pub fn profile_summary(roles: &[GuildRole], page: &ProfilePage) -> OutgoingMessage {
    let f = &page.fields;
    let na = |v: &Option<String>| or_na(v.as_deref());
    let head = format!(
        "{}\n**Recruit Information:**\n\
         Handle: {}\nReal Name: {}\nTitle: {}\nEnlisted: {}\nLocation: {}\nFluency: {}\n\n\
         **Main Organization:**\nName: {}\nSID: {}\nRank: {}\n\nBio:\n",
        role_mentions(roles),
        na(&page.handle_name),
        na(&f.real_name),
        na(&f.title),
        na(&f.enlisted_date),
        na(&f.location),
        na(&f.fluency),
        na(&f.org_name),
        na(&f.org_sid),
        na(&f.org_rank),
    );
    let tail = format!(
        "\n\nProfile Image: {}\nOrg Logo: {}",
        na(&f.profile_image_url),
        na(&f.org_logo_url),
    );
    let room = MAX_MESSAGE_CHARS.saturating_sub(head.chars().count() + tail.chars().count());
    OutgoingMessage::text(format!("{}{}{}", head, truncate_chars(page.bio.trim(), room), tail))
}

/// Cuts `text` to at most `max` characters, marking the cut with an ellipsis.
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut cut: String = text.chars().take(max - 1).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::application::{ApplicationStatus, ProfileFields};
    use uuid::Uuid;

    fn application() -> Application {
        Application {
            id: Uuid::nil(),
            recruit_id: Some("10".into()),
            recruiter_id: None,
            handle: Some("Foo_Bar".into()),
            validation_code: Some("HMB-ABCD1234".into()),
            status: ApplicationStatus::Validated,
            profile: ProfileFields {
                real_name: Some("Jane".into()),
                profile_image_url: Some("https://x/avatar.png".into()),
                ..Default::default()
            },
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn code_message_carries_validate_button() {
        let msg = validation_code_issued("alice", &application());
        assert!(msg.content.as_deref().unwrap().contains("`HMB-ABCD1234`"));
        let body = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            body["components"][0]["components"][0]["custom_id"],
            format!("validate_recruit_{}", Uuid::nil())
        );
        assert_eq!(body["flags"], 64);
    }

    #[test]
    fn embed_marks_missing_fields_not_available() {
        let embed = recruit_embed(&application());
        let fluency = embed.fields.iter().find(|f| f.name == "Fluency").unwrap();
        assert_eq!(fluency.value, NOT_AVAILABLE);
        let real = embed.fields.iter().find(|f| f.name == "Real Name").unwrap();
        assert_eq!(real.value, "Jane");
        assert_eq!(embed.thumbnail.map(|t| t.url).as_deref(), Some("https://x/avatar.png"));
        assert!(embed.image.is_none());
    }

    #[test]
    fn long_bio_is_cut_to_fit_one_message() {
        let page = ProfilePage {
            bio: "o7 ".repeat(2000),
            handle_name: Some("Foo_Bar".into()),
            fields: ProfileFields {
                org_logo_url: Some("https://x/org.png".into()),
                ..Default::default()
            },
        };
        let content = profile_summary(&[], &page).content.unwrap();

        assert!(content.chars().count() <= MAX_MESSAGE_CHARS);
        assert!(content.contains("o7 o7"));
        assert!(content.contains('…'));
        assert!(content.ends_with("Org Logo: https://x/org.png"));
    }

    #[test]
    fn short_bio_is_kept_whole() {
        let page = ProfilePage {
            bio: "  Hello there. HMB-ABCD1234 o7 ".into(),
            ..Default::default()
        };
        let content = profile_summary(&[], &page).content.unwrap();

        assert!(content.contains("Bio:\nHello there. HMB-ABCD1234 o7\n\nProfile Image"));
        assert!(!content.contains('…'));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("héllo", 5), "héllo");
        assert_eq!(truncate_chars("héllo", 3), "hé…");
        assert_eq!(truncate_chars("héllo", 0), "");
    }

    #[test]
    fn role_mentions_are_space_separated() {
        let roles = vec![
            GuildRole { id: "1".into(), name: "Recruiter".into() },
            GuildRole { id: "2".into(), name: "Head Recruiter".into() },
        ];
        assert_eq!(role_mentions(&roles), "<@&1> <@&2>");
    }
}
