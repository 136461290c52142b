pub mod discord_auth;
pub mod token;
