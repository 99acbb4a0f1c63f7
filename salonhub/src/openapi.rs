//! OpenAPI document assembled from the handler annotations.

use utoipa::OpenApi;

use crate::api::models::{
    articles::{ArticleCreateRequest, ArticleResponse, ArticleUpdateRequest},
    auth::{AuthResponse, AuthSuccessResponse, LoginRequest, RegisterRequest},
    feed::{
        AuthorSummary, BestAnswerRequest, CommentCreateRequest, CommentResponse, LikeTargetParam, LikeToggleRequest,
        LikeToggleResponse, PostCreateRequest, PostDetailResponse, PostResponse, PostSortParam,
    },
    notifications::{NotificationListResponse, NotificationResponse},
    pagination::PaginatedResponse,
    queue::{AdminQueueResponse, AdminStatsResponse, PlacementResponse, QueueItemResponse, QueueStatsResponse},
    users::{
        AdminUserUpdateRequest, ContributionEntryResponse, LeaderboardEntry, PointsAdjustmentRequest, ProfileUpdateRequest,
        UserResponse, UserStatsResponse,
    },
};
use crate::db::models::{
    queue::QueueStatus,
    settings::{ContributionPointsSettings, PlacementSettings},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::auth::register,
        crate::api::handlers::auth::login,
        crate::api::handlers::auth::logout,
        crate::api::handlers::redirect::follow_redirect,
        crate::api::handlers::users::get_me,
        crate::api::handlers::users::update_me,
        crate::api::handlers::users::get_my_stats,
        crate::api::handlers::users::list_my_contributions,
        crate::api::handlers::users::leaderboard,
        crate::api::handlers::users::admin_list_users,
        crate::api::handlers::users::admin_update_user,
        crate::api::handlers::users::admin_adjust_points,
        crate::api::handlers::feed::create_post,
        crate::api::handlers::feed::list_posts,
        crate::api::handlers::feed::get_post,
        crate::api::handlers::feed::create_comment,
        crate::api::handlers::feed::toggle_like,
        crate::api::handlers::feed::mark_best_answer,
        crate::api::handlers::articles::list_articles,
        crate::api::handlers::articles::get_article,
        crate::api::handlers::articles::admin_list_articles,
        crate::api::handlers::articles::admin_create_article,
        crate::api::handlers::articles::admin_update_article,
        crate::api::handlers::articles::admin_delete_article,
        crate::api::handlers::notifications::list_notifications,
        crate::api::handlers::notifications::mark_notification_read,
        crate::api::handlers::notifications::mark_all_notifications_read,
        crate::api::handlers::queue::admin_queue_view,
        crate::api::handlers::queue::admin_assign_queue_item,
        crate::api::handlers::queue::admin_stats,
        crate::api::handlers::settings::get_placement_settings,
        crate::api::handlers::settings::put_placement_settings,
        crate::api::handlers::settings::get_contribution_points,
        crate::api::handlers::settings::put_contribution_points,
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        AuthResponse,
        AuthSuccessResponse,
        UserResponse,
        UserStatsResponse,
        LeaderboardEntry,
        ProfileUpdateRequest,
        AdminUserUpdateRequest,
        PointsAdjustmentRequest,
        ContributionEntryResponse,
        PostCreateRequest,
        CommentCreateRequest,
        PostResponse,
        CommentResponse,
        PostDetailResponse,
        AuthorSummary,
        PostSortParam,
        LikeTargetParam,
        LikeToggleRequest,
        LikeToggleResponse,
        BestAnswerRequest,
        ArticleCreateRequest,
        ArticleUpdateRequest,
        ArticleResponse,
        NotificationResponse,
        NotificationListResponse,
        QueueStatus,
        QueueItemResponse,
        QueueStatsResponse,
        AdminQueueResponse,
        PlacementResponse,
        AdminStatsResponse,
        PlacementSettings,
        ContributionPointsSettings,
        PaginatedResponse<UserResponse>,
        PaginatedResponse<PostResponse>,
        PaginatedResponse<ArticleResponse>,
        PaginatedResponse<ContributionEntryResponse>,
    )),
    tags(
        (name = "authentication", description = "Signup, login and logout"),
        (name = "redirect", description = "Public referral redirect entry point"),
        (name = "users", description = "Member profiles and the leaderboard"),
        (name = "feed", description = "Q&A feed: posts, comments, likes, best answers"),
        (name = "articles", description = "Learning-hub articles"),
        (name = "notifications", description = "Member notifications"),
        (name = "settings", description = "Placement ratio and contribution point table"),
        (name = "admin", description = "Admin panel operations"),
    ),
    info(
        title = "salonhub API",
        description = "Membership community hub with referral auto-placement and contribution scoring"
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let json = doc.to_json().expect("document serializes");
        assert!(json.contains("/go"));
        assert!(json.contains("/settings/placement"));
    }
}
