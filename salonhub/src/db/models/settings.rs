//! Admin-editable settings records, stored as jsonb under well-known keys.
//!
//! Readers always fetch fresh rows; nothing here is cached process-wide, so a
//! settings change is visible to the next request on every instance.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

pub const PLACEMENT_SETTINGS_KEY: &str = "placement_settings";
pub const CONTRIBUTION_POINTS_KEY: &str = "contribution_points";

/// Default share of organic placements routed to the admin pool.
pub const DEFAULT_ADMIN_RATIO: f64 = 0.2;

/// Baseline per-action point values, used whenever the settings record is
/// absent or omits an action.
pub static DEFAULT_CONTRIBUTION_POINTS: Lazy<BTreeMap<String, i64>> = Lazy::new(|| {
    BTreeMap::from([
        ("post_create".to_string(), 5),
        ("comment_create".to_string(), 10),
        ("best_answer".to_string(), 30),
        ("like_received".to_string(), 2),
        ("daily_login".to_string(), 1),
        ("article_read".to_string(), 3),
        ("sns_share".to_string(), 20),
    ])
});

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlacementSettings {
    /// Probability in [0, 1] that an organic visitor is placed with an admin
    pub admin_ratio: f64,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            admin_ratio: DEFAULT_ADMIN_RATIO,
        }
    }
}

impl PlacementSettings {
    /// Clamp the ratio into [0, 1]. A stored record is normally already
    /// clamped on write, but the selector's coin flip must never panic on a
    /// corrupt value.
    pub fn clamped(self) -> Self {
        Self {
            admin_ratio: self.admin_ratio.clamp(0.0, 1.0),
        }
    }
}

/// Mapping of action name to point value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ContributionPointsSettings(pub BTreeMap<String, i64>);

impl Default for ContributionPointsSettings {
    fn default() -> Self {
        Self(DEFAULT_CONTRIBUTION_POINTS.clone())
    }
}

impl ContributionPointsSettings {
    /// Overlay a stored record on the defaults so a partial record still
    /// yields a complete table.
    pub fn merged_with_defaults(stored: BTreeMap<String, i64>) -> Self {
        let mut merged = DEFAULT_CONTRIBUTION_POINTS.clone();
        merged.extend(stored);
        Self(merged)
    }

    /// Point value for a named action; unknown actions are worth nothing.
    pub fn points_for(&self, action: &str) -> i64 {
        self.0.get(action).copied().unwrap_or(0)
    }
}
