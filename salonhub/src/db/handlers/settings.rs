//! Database repository for the two admin-editable settings records.
//!
//! Records are whole jsonb values replaced on write (upsert by key). Reads
//! always hit the database; the rest of the application never caches these, so
//! horizontally scaled instances all see an admin change on their next request.

use crate::db::{
    errors::Result,
    models::settings::{
        ContributionPointsSettings, PlacementSettings, CONTRIBUTION_POINTS_KEY, PLACEMENT_SETTINGS_KEY,
    },
};
use sqlx::PgConnection;
use std::collections::BTreeMap;
use tracing::instrument;

pub struct Settings<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Settings<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    async fn get_raw(&mut self, key: &str) -> Result<Option<serde_json::Value>> {
        let value = sqlx::query_scalar::<_, serde_json::Value>("SELECT value FROM settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(value)
    }

    async fn upsert_raw(&mut self, key: &str, value: serde_json::Value) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&mut *self.db)
        .await?;

        Ok(())
    }

    /// Current placement settings, falling back to the hardcoded default when
    /// the record is absent. A record that fails to parse is treated the same
    /// way rather than breaking every placement.
    #[instrument(skip(self), err)]
    pub async fn placement(&mut self) -> Result<PlacementSettings> {
        let settings = match self.get_raw(PLACEMENT_SETTINGS_KEY).await? {
            Some(value) => match serde_json::from_value::<PlacementSettings>(value) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!("Malformed placement_settings record, using defaults: {e}");
                    PlacementSettings::default()
                }
            },
            None => PlacementSettings::default(),
        };

        Ok(settings.clamped())
    }

    /// Current point table, with the stored record overlaid on the defaults.
    #[instrument(skip(self), err)]
    pub async fn contribution_points(&mut self) -> Result<ContributionPointsSettings> {
        let settings = match self.get_raw(CONTRIBUTION_POINTS_KEY).await? {
            Some(value) => match serde_json::from_value::<BTreeMap<String, i64>>(value) {
                Ok(stored) => ContributionPointsSettings::merged_with_defaults(stored),
                Err(e) => {
                    tracing::warn!("Malformed contribution_points record, using defaults: {e}");
                    ContributionPointsSettings::default()
                }
            },
            None => ContributionPointsSettings::default(),
        };

        Ok(settings)
    }

    /// Replace the placement record. The ratio is clamped into [0, 1] before
    /// it is stored, matching what the admin form enforces.
    #[instrument(skip(self, settings), fields(admin_ratio = settings.admin_ratio), err)]
    pub async fn upsert_placement(&mut self, settings: PlacementSettings) -> Result<PlacementSettings> {
        let clamped = settings.clamped();
        let value = serde_json::to_value(clamped).map_err(|e| anyhow::anyhow!("serialize placement settings: {e}"))?;
        self.upsert_raw(PLACEMENT_SETTINGS_KEY, value).await?;

        Ok(clamped)
    }

    /// Replace the point table wholesale.
    #[instrument(skip(self, settings), err)]
    pub async fn upsert_contribution_points(&mut self, settings: &ContributionPointsSettings) -> Result<()> {
        let value = serde_json::to_value(settings).map_err(|e| anyhow::anyhow!("serialize contribution points: {e}"))?;
        self.upsert_raw(CONTRIBUTION_POINTS_KEY, value).await?;

        Ok(())
    }
}
