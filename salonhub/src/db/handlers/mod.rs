//! Repositories: one per entity, each owning a `&mut PgConnection`.

pub mod articles;
pub mod comments;
pub mod contributions;
pub mod likes;
pub mod notifications;
pub mod posts;
pub mod queue;
pub mod repository;
pub mod settings;
pub mod users;

pub use articles::Articles;
pub use comments::Comments;
pub use contributions::Contributions;
pub use likes::Likes;
pub use notifications::Notifications;
pub use posts::Posts;
pub use queue::Queue;
pub use repository::Repository;
pub use settings::Settings;
pub use users::Users;
