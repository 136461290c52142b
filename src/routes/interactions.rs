use axum::{body::Bytes, extract::State, http::HeaderMap, Json};

use crate::{
    dto::discord_dto::{DiscordUser, Interaction, InteractionResponse, OutgoingMessage},
    error::{Error, Result},
    models::event::{ButtonPress, InboundEvent, ModalSubmit, SlashCommand},
    routes::event_router::{Action, HANDLE_INPUT_FIELD, HANDLE_INPUT_MODAL, RECRUIT_COMMAND},
    services::{
        message_service::{self, *},
        recruitment_service::{RecruitmentOutcome, TicketOutcome, ValidationOutcome},
    },
    utils::discord_auth::verify_discord_signature,
    AppState,
};

const SIGNATURE_HEADER: &str = "x-signature-ed25519";
const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

pub async fn handle_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<InteractionResponse>> {
    verify_signature(&state.config.discord_public_key, &headers, &body)?;

    let interaction: Interaction = serde_json::from_slice(&body)
        .map_err(|e| Error::BadRequest(format!("malformed interaction: {}", e)))?;
    tracing::debug!(interaction_id = %interaction.id, kind = interaction.kind, "Received interaction");

    let event = InboundEvent::try_from(interaction)?;
    Ok(Json(dispatch(&state, event).await))
}

fn verify_signature(public_key: &str, headers: &HeaderMap, body: &[u8]) -> Result<()> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::Unauthorized(format!("missing {}", name)))
    };
    let signature = header(SIGNATURE_HEADER)?;
    let timestamp = header(TIMESTAMP_HEADER)?;

    if verify_discord_signature(public_key, signature, timestamp, body) {
        Ok(())
    } else {
        Err(Error::Unauthorized("invalid request signature".into()))
    }
}

async fn dispatch(state: &AppState, event: InboundEvent) -> InteractionResponse {
    match event {
        InboundEvent::Ping => InteractionResponse::pong(),
        InboundEvent::ButtonPress(press) => on_button(state, press),
        InboundEvent::ModalSubmit(submit) => on_modal(state, submit).await,
        InboundEvent::SlashCommand(command) => on_command(state, command),
    }
}

fn unknown_action() -> InteractionResponse {
    InteractionResponse::message(OutgoingMessage::ephemeral(MSG_UNKNOWN_ACTION))
}

fn on_button(state: &AppState, press: ButtonPress) -> InteractionResponse {
    let Some(action) = Action::parse(&press.custom_id) else {
        tracing::warn!(custom_id = %press.custom_id, "Unknown button");
        return unknown_action();
    };

    match action {
        Action::OpenHandleModal => InteractionResponse::modal(message_service::handle_modal()),
        Action::ValidateRecruit(application_id) => {
            let recruitment = state.recruitment.clone();
            let user_id = press.user.id.clone();
            follow_up(state, press.token, async move {
                validation_reply(recruitment.validate(&application_id, &user_id).await)
            })
        }
        Action::StartRecruitment(application_id) => {
            let recruitment = state.recruitment.clone();
            let user_id = press.user.id.clone();
            follow_up(state, press.token, async move {
                recruitment_reply(recruitment.start_recruitment(&application_id, &user_id).await)
            })
        }
        Action::HandleInputModal => unknown_action(),
    }
}

/// Acknowledges within Discord's deadline and finishes the work in the
/// background, replacing the placeholder once done.
fn follow_up<F>(state: &AppState, token: String, work: F) -> InteractionResponse
where
    F: std::future::Future<Output = OutgoingMessage> + Send + 'static,
{
    let platform = state.platform.clone();
    tokio::spawn(async move {
        let reply = work.await;
        if let Err(e) = platform.edit_original_response(&token, &reply).await {
            tracing::error!(error = ?e, "Failed to edit deferred response");
        }
    });
    InteractionResponse::deferred_ephemeral()
}

async fn on_modal(state: &AppState, submit: ModalSubmit) -> InteractionResponse {
    if submit.custom_id != HANDLE_INPUT_MODAL {
        tracing::warn!(custom_id = %submit.custom_id, "Unknown modal");
        return unknown_action();
    }

    let handle = submit.field(HANDLE_INPUT_FIELD).unwrap_or_default();
    let reply = match state.recruitment.submit_handle(&submit.user.id, handle).await {
        Ok(application) => message_service::validation_code_issued(&submit.user.username, &application),
        Err(Error::Validation(e)) => {
            tracing::info!(user_id = %submit.user.id, error = %e, "Rejected handle");
            OutgoingMessage::ephemeral(MSG_HANDLE_INVALID)
        }
        Err(e) => {
            tracing::error!(error = ?e, user_id = %submit.user.id, "Failed to open application");
            OutgoingMessage::ephemeral(MSG_HANDLE_INTERNAL)
        }
    };
    InteractionResponse::message(reply)
}

fn on_command(state: &AppState, command: SlashCommand) -> InteractionResponse {
    if command.name != RECRUIT_COMMAND {
        tracing::warn!(command = %command.name, "Unknown command");
        return unknown_action();
    }
    if command.guild_id.is_none() {
        return InteractionResponse::message(OutgoingMessage::ephemeral(MSG_TICKET_GUILD_ONLY));
    }
    let Some(recruit) = command.target_user else {
        return InteractionResponse::message(OutgoingMessage::ephemeral(MSG_TICKET_MISSING_RECRUIT));
    };

    let recruitment = state.recruitment.clone();
    let recruiter = command.user;
    follow_up(state, command.token, async move {
        ticket_reply(&recruit, recruitment.open_ticket(&recruiter, &recruit).await)
    })
}

pub fn validation_reply(result: Result<ValidationOutcome>) -> OutgoingMessage {
    match result {
        Ok(ValidationOutcome::Validated { application, .. }) => {
            message_service::validation_succeeded(&application)
        }
        Ok(ValidationOutcome::CodeMissing) => OutgoingMessage::text(MSG_VALIDATION_CODE_MISSING),
        Ok(ValidationOutcome::FetchFailed(_)) => OutgoingMessage::text(MSG_VALIDATION_FETCH_FAILED),
        Err(e) if e.is_not_found() => OutgoingMessage::text(MSG_VALIDATION_NOT_FOUND),
        Err(e) => {
            tracing::error!(error = ?e, "Validation failed");
            OutgoingMessage::text(MSG_VALIDATION_INTERNAL)
        }
    }
}

pub fn recruitment_reply(result: Result<RecruitmentOutcome>) -> OutgoingMessage {
    match result {
        Ok(RecruitmentOutcome::Created(channel)) => message_service::channel_created(&channel),
        Ok(RecruitmentOutcome::AlreadyExists(channel)) => {
            message_service::channel_already_exists(&channel)
        }
        Err(e) if e.is_not_found() => OutgoingMessage::text(MSG_RECRUITMENT_NOT_FOUND),
        Err(Error::Provision(reason)) => {
            tracing::error!(%reason, "Failed to provision recruitment channel");
            OutgoingMessage::text(MSG_RECRUITMENT_PROVISION_FAILED)
        }
        Err(e) => {
            tracing::error!(error = ?e, "Failed to start recruitment");
            OutgoingMessage::text(MSG_RECRUITMENT_INTERNAL)
        }
    }
}

pub fn ticket_reply(recruit: &DiscordUser, result: Result<TicketOutcome>) -> OutgoingMessage {
    match result {
        Ok(ticket) => message_service::ticket_created(&recruit.username, &ticket.channel),
        Err(e) => {
            tracing::error!(error = ?e, recruit_id = %recruit.id, "Failed to open ticket");
            OutgoingMessage::text(MSG_TICKET_INTERNAL)
        }
    }
}
