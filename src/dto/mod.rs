pub mod discord_dto;
pub mod handle_dto;
