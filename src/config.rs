use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;

const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";
const DEFAULT_PROFILE_BASE_URL: &str = "https://robertsspaceindustries.com/en/citizens";
const DEFAULT_PROFILE_ASSET_ORIGIN: &str = "https://robertsspaceindustries.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub discord_bot_token: String,
    pub discord_client_id: String,
    pub discord_guild_id: String,
    /// Hex-encoded Ed25519 key from the developer portal, used to verify interactions.
    pub discord_public_key: String,
    pub discord_api_base: String,
    pub profile_base_url: String,
    pub profile_asset_origin: String,
    pub http_timeout_secs: u64,
    pub validated_role_name: String,
    pub recruiter_marker: String,
    pub ticket_category: String,
    pub info_channel_name: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            discord_bot_token: get_env("DISCORD_BOT_TOKEN")?,
            discord_client_id: get_env("DISCORD_CLIENT_ID")?,
            discord_guild_id: get_env("DISCORD_GUILD_ID")?,
            discord_public_key: get_env("DISCORD_PUBLIC_KEY")?,
            discord_api_base: get_env_or("DISCORD_API_BASE", DEFAULT_DISCORD_API_BASE),
            profile_base_url: get_env_or("PROFILE_BASE_URL", DEFAULT_PROFILE_BASE_URL),
            profile_asset_origin: get_env_or("PROFILE_ASSET_ORIGIN", DEFAULT_PROFILE_ASSET_ORIGIN),
            http_timeout_secs: get_env_parse_or("HTTP_TIMEOUT_SECS", 15)?,
            validated_role_name: get_env_or("VALIDATED_ROLE_NAME", "UEE-Validated"),
            recruiter_marker: get_env_or("RECRUITER_MARKER", "recruiter"),
            ticket_category: get_env_or("TICKET_CATEGORY", "Recruitment Tickets"),
            info_channel_name: get_env_or("INFO_CHANNEL_NAME", "recruitment-info"),
        })
    }

    /// Settings for local runs and tests; credentials are placeholders.
    pub fn for_guild(guild_id: &str, public_key: &str) -> Self {
        Self {
            server_address: "127.0.0.1:0".to_string(),
            database_url: String::new(),
            discord_bot_token: String::new(),
            discord_client_id: "0".to_string(),
            discord_guild_id: guild_id.to_string(),
            discord_public_key: public_key.to_string(),
            discord_api_base: DEFAULT_DISCORD_API_BASE.to_string(),
            profile_base_url: DEFAULT_PROFILE_BASE_URL.to_string(),
            profile_asset_origin: DEFAULT_PROFILE_ASSET_ORIGIN.to_string(),
            http_timeout_secs: 15,
            validated_role_name: "UEE-Validated".to_string(),
            recruiter_marker: "recruiter".to_string(),
            ticket_category: "Recruitment Tickets".to_string(),
            info_channel_name: "recruitment-info".to_string(),
        }
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}
