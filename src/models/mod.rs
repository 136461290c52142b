pub mod application;
pub mod event;
