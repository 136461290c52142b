use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::dto::discord_dto::{DiscordUser, GuildChannel};
use crate::dto::handle_dto::HandleSubmission;
use crate::error::{Error, Result};
use crate::models::application::{
    Application, ApplicationFilter, ApplicationStatus, ApplicationUpdate, NewApplication,
};
use crate::services::application_store::ApplicationStore;
use crate::services::channel_service::{ChannelService, Grantees};
use crate::services::discord_service::ChatPlatform;
use crate::services::message_service;
use crate::services::profile_service::{ProfileFetcher, ProfilePage};
use crate::utils::token::generate_validation_code;

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Validated {
        application: Application,
        page: ProfilePage,
    },
    /// The bio was fetched but does not contain the code.
    CodeMissing,
    FetchFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecruitmentOutcome {
    Created(GuildChannel),
    AlreadyExists(GuildChannel),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TicketOutcome {
    pub application: Application,
    pub channel: GuildChannel,
}

/// Drives an application through the recruitment workflow.
#[derive(Clone)]
pub struct RecruitmentService {
    store: Arc<dyn ApplicationStore>,
    fetcher: Arc<dyn ProfileFetcher>,
    platform: Arc<dyn ChatPlatform>,
    channels: ChannelService,
    validated_role_name: String,
}

fn not_found(what: &str) -> Error {
    Error::NotFound(what.to_string())
}

/// Ids arrive as opaque strings; anything that is not a UUID cannot match a row.
fn parse_application_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| not_found("application"))
}

impl RecruitmentService {
    pub fn new(
        store: Arc<dyn ApplicationStore>,
        fetcher: Arc<dyn ProfileFetcher>,
        platform: Arc<dyn ChatPlatform>,
        channels: ChannelService,
        validated_role_name: String,
    ) -> Self {
        Self {
            store,
            fetcher,
            platform,
            channels,
            validated_role_name,
        }
    }

    async fn transition(
        &self,
        application: &Application,
        update: ApplicationUpdate,
    ) -> Result<()> {
        if let Some(next) = update.status {
            if !application.status.can_transition_to(next) {
                return Err(Error::Internal(format!(
                    "illegal transition {} -> {} for application {}",
                    application.status, next, application.id
                )));
            }
        }
        self.store.update(application.id, update).await
    }

    /// Opens a self-service application and issues its validation code.
    pub async fn submit_handle(&self, user_id: &str, raw_handle: &str) -> Result<Application> {
        let submission = HandleSubmission::new(raw_handle);
        submission.validate()?;

        let application = self
            .store
            .create(NewApplication {
                recruit_id: user_id.to_string(),
                recruiter_id: None,
                handle: Some(submission.handle),
                validation_code: Some(generate_validation_code()),
                status: ApplicationStatus::ValidationPending,
            })
            .await?;

        tracing::info!(
            application_id = %application.id,
            user_id,
            "Issued validation code"
        );
        Ok(application)
    }

    pub async fn validate(&self, application_id: &str, user_id: &str) -> Result<ValidationOutcome> {
        let id = parse_application_id(application_id)?;
        let application = self
            .store
            .find(&ApplicationFilter::owned(id, user_id, ApplicationStatus::ValidationPending))
            .await?
            .ok_or_else(|| not_found("pending validation"))?;

        let (Some(handle), Some(code)) = (
            application.handle.as_deref(),
            application.validation_code.as_deref(),
        ) else {
            return Err(Error::Internal(format!(
                "application {} has no handle or validation code",
                application.id
            )));
        };

        let page = match self.fetcher.fetch_profile(handle).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(application_id = %id, error = ?e, "Profile fetch failed");
                self.transition(
                    &application,
                    ApplicationUpdate::status(ApplicationStatus::ValidationFailed),
                )
                .await?;
                return Ok(ValidationOutcome::FetchFailed(e.to_string()));
            }
        };

        if !page.bio.contains(code) {
            tracing::info!(application_id = %id, "Validation code not found in bio");
            self.transition(
                &application,
                ApplicationUpdate::status(ApplicationStatus::ValidationFailed),
            )
            .await?;
            return Ok(ValidationOutcome::CodeMissing);
        }

        let update = ApplicationUpdate::status(ApplicationStatus::Validated)
            .with_profile(page.fields.clone());
        self.transition(&application, update.clone()).await?;

        let mut validated = application;
        update.apply_to(&mut validated);
        tracing::info!(application_id = %id, profile = ?page.fields, "Application validated");

        self.after_validation(&validated, &page).await;

        Ok(ValidationOutcome::Validated {
            application: validated,
            page,
        })
    }

    async fn after_validation(&self, application: &Application, page: &ProfilePage) {
        if let Some(user_id) = application.recruit_id.as_deref() {
            if let Err(e) = self.grant_validated_role(user_id).await {
                tracing::warn!(error = ?e, user_id, "Failed to grant validated role");
            }
        }

        let handle = application.handle.as_deref().unwrap_or_default();
        let channel = match self
            .channels
            .find_applicant_channel(handle, &application.id.to_string())
            .await
        {
            Ok(Some(channel)) => channel,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = ?e, "Failed to look up applicant channel");
                return;
            }
        };
        let roles = self.channels.recruiter_roles().await.unwrap_or_default();
        let summary = message_service::profile_summary(&roles, page);
        if let Err(e) = self.platform.send_message(&channel.id, &summary).await {
            tracing::warn!(error = ?e, channel_id = %channel.id, "Failed to post profile summary");
        }
    }

    async fn grant_validated_role(&self, user_id: &str) -> Result<()> {
        let roles = self.platform.list_roles().await?;
        let role = match roles
            .into_iter()
            .find(|role| role.name == self.validated_role_name)
        {
            Some(role) => role,
            None => self.platform.create_role(&self.validated_role_name).await?,
        };
        self.platform.add_member_role(user_id, &role.id).await
    }

    /// Provisions the applicant's private channel and puts the application
    /// back in the recruiter queue.
    pub async fn start_recruitment(
        &self,
        application_id: &str,
        user_id: &str,
    ) -> Result<RecruitmentOutcome> {
        let id = parse_application_id(application_id)?;
        let application = self
            .store
            .find(&ApplicationFilter::owned(id, user_id, ApplicationStatus::Validated))
            .await?
            .ok_or_else(|| not_found("validated application"))?;

        let handle = application.handle.as_deref().unwrap_or_default();
        let grantees = Grantees {
            applicant_id: user_id.to_string(),
            recruiter_id: None,
        };
        let provisioned = self
            .channels
            .ensure_applicant_channel(handle, &id.to_string(), &grantees)
            .await?;

        if !provisioned.created {
            return Ok(RecruitmentOutcome::AlreadyExists(provisioned.channel));
        }

        let update = ApplicationUpdate::status(ApplicationStatus::Pending).clear_recruiter();
        self.transition(&application, update.clone()).await?;

        let refreshed = match self.store.find(&ApplicationFilter::by_id(id)).await {
            Ok(Some(app)) => app,
            _ => {
                let mut app = application.clone();
                update.apply_to(&mut app);
                app
            }
        };

        let channel = provisioned.channel;
        let welcome = message_service::applicant_channel_welcome(&refreshed, user_id);
        if let Err(e) = self.platform.send_message(&channel.id, &welcome).await {
            tracing::warn!(error = ?e, channel_id = %channel.id, "Failed to post welcome message");
        }

        match self.channels.recruiter_channel().await {
            Ok(Some(recruiters)) => {
                let note =
                    message_service::recruiter_notification(&provisioned.recruiter_roles, &channel);
                if let Err(e) = self.platform.send_message(&recruiters.id, &note).await {
                    tracing::warn!(error = ?e, "Failed to notify recruiters");
                }
            }
            Ok(None) => tracing::debug!("No recruiter channel found"),
            Err(e) => tracing::warn!(error = ?e, "Failed to look up recruiter channel"),
        }

        tracing::info!(application_id = %id, channel_id = %channel.id, "Recruitment started");
        Ok(RecruitmentOutcome::Created(channel))
    }

    /// Recruiter-opened ticket; skips handle validation entirely.
    pub async fn open_ticket(
        &self,
        recruiter: &DiscordUser,
        recruit: &DiscordUser,
    ) -> Result<TicketOutcome> {
        let application = self
            .store
            .create(NewApplication {
                recruit_id: recruit.id.clone(),
                recruiter_id: Some(recruiter.id.clone()),
                handle: None,
                validation_code: None,
                status: ApplicationStatus::Pending,
            })
            .await?;

        let grantees = Grantees {
            applicant_id: recruit.id.clone(),
            recruiter_id: Some(recruiter.id.clone()),
        };
        let provisioned = self
            .channels
            .ensure_applicant_channel(&recruit.username, &application.id.to_string(), &grantees)
            .await?;

        let welcome =
            message_service::ticket_channel_welcome(&application, &recruit.id, &recruiter.id);
        if let Err(e) = self
            .platform
            .send_message(&provisioned.channel.id, &welcome)
            .await
        {
            tracing::warn!(error = ?e, "Failed to post ticket welcome message");
        }

        tracing::info!(
            application_id = %application.id,
            recruiter_id = %recruiter.id,
            recruit_id = %recruit.id,
            "Recruitment ticket opened"
        );
        Ok(TicketOutcome {
            application,
            channel: provisioned.channel,
        })
    }
}
