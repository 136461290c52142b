pub mod event_router;
pub mod health;
pub mod interactions;
