pub mod application_store;
pub mod channel_service;
pub mod discord_service;
pub mod message_service;
pub mod profile_service;
pub mod recruitment_service;

#[cfg(test)]
pub mod test_support;
