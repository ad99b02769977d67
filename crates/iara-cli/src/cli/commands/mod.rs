pub mod auth;
pub mod chat;
