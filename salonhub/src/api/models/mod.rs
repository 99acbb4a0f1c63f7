//! Request/response models for the HTTP API.

pub mod articles;
pub mod auth;
pub mod feed;
pub mod notifications;
pub mod pagination;
pub mod queue;
pub mod users;
