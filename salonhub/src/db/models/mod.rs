//! Request/response models for the database layer.

pub mod articles;
pub mod comments;
pub mod contributions;
pub mod notifications;
pub mod posts;
pub mod queue;
pub mod settings;
pub mod users;
