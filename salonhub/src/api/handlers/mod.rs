//! HTTP handlers, grouped by resource.

pub mod articles;
pub mod auth;
pub mod feed;
pub mod notifications;
pub mod queue;
pub mod redirect;
pub mod settings;
pub mod users;
