//! Core IARA library (wire types, config, session, API gateway).

pub mod config;
pub mod gateway;
pub mod session;
pub mod types;
