//! Common type definitions.
//!
//! All entity IDs are UUIDs wrapped in type aliases for better type safety:
//!
//! - [`UserId`]: Member account identifier
//! - [`PostId`] / [`CommentId`]: Q&A feed identifiers
//! - [`ArticleId`]: Learning-hub article identifier
//! - [`QueueItemId`]: Organic visitor queue entry identifier
//! - [`NotificationId`]: Notification identifier

use uuid::Uuid;

// Type aliases for IDs
pub type UserId = Uuid;
pub type PostId = Uuid;
pub type CommentId = Uuid;
pub type ArticleId = Uuid;
pub type QueueItemId = Uuid;
pub type NotificationId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbrev_uuid() {
        let id: Uuid = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
        assert_eq!(abbrev_uuid(&id), "550e8400");
    }
}
