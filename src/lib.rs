pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use sqlx::PgPool;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::services::{
    application_store::{ApplicationStore, PgApplicationStore},
    channel_service::ChannelService,
    discord_service::{ChatPlatform, DiscordService},
    profile_service::{ProfileFetcher, RsiProfileService},
    recruitment_service::RecruitmentService,
};

/// Upper bound on interactions processed at once.
const MAX_CONCURRENT_REQUESTS: usize = 64;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub platform: Arc<dyn ChatPlatform>,
    pub channels: ChannelService,
    pub recruitment: RecruitmentService,
    /// Concrete Discord client for startup-only calls; `None` when the
    /// platform was injected.
    discord: Option<DiscordService>,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        let discord = DiscordService::new(
            http_client.clone(),
            config.discord_api_base.clone(),
            config.discord_bot_token.clone(),
            config.discord_client_id.clone(),
            config.discord_guild_id.clone(),
        );
        let fetcher = RsiProfileService::new(
            http_client,
            config.profile_base_url.clone(),
            config.profile_asset_origin.clone(),
        );

        let mut state = Self::from_parts(
            config,
            Arc::new(PgApplicationStore::new(pool)),
            Arc::new(fetcher),
            Arc::new(discord.clone()),
        );
        state.discord = Some(discord);
        Ok(state)
    }

    /// Wires the workflow around arbitrary store, profile and chat backends.
    pub fn from_parts(
        config: Config,
        store: Arc<dyn ApplicationStore>,
        fetcher: Arc<dyn ProfileFetcher>,
        platform: Arc<dyn ChatPlatform>,
    ) -> Self {
        let channels = ChannelService::new(
            platform.clone(),
            config.discord_guild_id.clone(),
            config.recruiter_marker.clone(),
            config.ticket_category.clone(),
            config.info_channel_name.clone(),
        );
        let recruitment = RecruitmentService::new(
            store,
            fetcher,
            platform.clone(),
            channels.clone(),
            config.validated_role_name.clone(),
        );

        Self {
            config: Arc::new(config),
            platform,
            channels,
            recruitment,
            discord: None,
        }
    }

    /// Registers the slash command and refreshes the info channel. Failures
    /// are logged; the server keeps running without them.
    pub async fn bootstrap_guild(&self) {
        if let Some(discord) = &self.discord {
            match discord.register_commands().await {
                Ok(count) => tracing::info!("Registered {} guild command(s)", count),
                Err(e) => tracing::warn!(error = ?e, "Failed to register slash commands"),
            }
        }
        match self.channels.setup_info_channel().await {
            Ok(channel) => tracing::info!(channel_id = %channel.id, "Recruitment info channel ready"),
            Err(e) => tracing::warn!(error = ?e, "Failed to set up recruitment info channel"),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route(
            "/api/interactions",
            post(routes::interactions::handle_interaction),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
}
