//! HTTP handlers

pub mod admin;
pub mod calls;
pub mod health;
pub mod messages;
pub mod voicemails;
pub mod webhooks;
