// src/segments.rs
use chrono::Utc;
use tracing::info;

use crate::database::{self, DbPool};
use crate::models::{Result, Segment};

/// Named, colored lead groupings. A lead belongs to at most one segment;
/// deleting a segment clears references instead of deleting members.
pub struct SegmentRegistry {
    workspace: String,
    db_pool: DbPool,
}

impl SegmentRegistry {
    pub fn new(workspace: &str, db_pool: DbPool) -> Self {
        Self {
            workspace: workspace.to_string(),
            db_pool,
        }
    }

    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        color: &str,
    ) -> Result<Segment> {
        if name.trim().is_empty() {
            return Err("segment name must not be empty".into());
        }

        let now = Utc::now();
        let segment = Segment {
            id: uuid::Uuid::new_v4().to_string(),
            workspace: self.workspace.clone(),
            name: name.trim().to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            color: color.to_string(),
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        database::insert_segment(&self.db_pool, &segment).await?;
        info!("Segment '{}' saved", segment.name);
        Ok(segment)
    }

    pub async fn get(&self, segment_id: &str) -> Result<Option<Segment>> {
        database::get_segment(&self.db_pool, segment_id).await
    }

    /// Segments with their member counts, for targeting pickers and stats.
    pub async fn list_with_counts(&self) -> Result<Vec<(Segment, i64)>> {
        let segments = database::list_segments(&self.db_pool, &self.workspace).await?;
        let mut out = Vec::with_capacity(segments.len());
        for segment in segments {
            let members = database::count_segment_members(&self.db_pool, &segment.id).await?;
            out.push((segment, members));
        }
        Ok(out)
    }

    pub async fn delete(&self, segment_id: &str) -> Result<()> {
        database::delete_segment(&self.db_pool, segment_id).await?;
        info!("Segment {} deleted (references cleared)", segment_id);
        Ok(())
    }

    pub async fn assign_lead(&self, lead_id: &str, segment_id: Option<&str>) -> Result<()> {
        database::assign_lead_to_segment(&self.db_pool, lead_id, segment_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_db_pool;
    use crate::models::{Lead, LeadOrigin};
    use tempfile::TempDir;

    async fn registry() -> (TempDir, DbPool, SegmentRegistry) {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        let pool = create_db_pool(db_path.to_str().unwrap()).await.unwrap();
        let registry = SegmentRegistry::new("default", pool.clone());
        (dir, pool, registry)
    }

    #[tokio::test]
    async fn create_and_list_with_member_counts() {
        let (_dir, pool, registry) = registry().await;

        let segment = registry
            .create("Fintech CTOs", Some("warm intros"), "#2563eb")
            .await
            .unwrap();

        let mut lead = Lead::new("default", "Alice", "a@x.com", LeadOrigin::Manual);
        lead.segment_id = Some(segment.id.clone());
        database::upsert_lead(&pool, &lead).await.unwrap();

        let listed = registry.list_with_counts().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0.name, "Fintech CTOs");
        assert_eq!(listed[0].1, 1);
    }

    #[tokio::test]
    async fn delete_clears_lead_references() {
        let (_dir, pool, registry) = registry().await;

        let segment = registry.create("Old list", None, "#999999").await.unwrap();
        let mut lead = Lead::new("default", "Alice", "a@x.com", LeadOrigin::Manual);
        lead.segment_id = Some(segment.id.clone());
        database::upsert_lead(&pool, &lead).await.unwrap();

        registry.delete(&segment.id).await.unwrap();

        let lead = database::get_lead_by_email(&pool, "default", "a@x.com")
            .await
            .unwrap()
            .unwrap();
        assert!(lead.segment_id.is_none());
        assert!(registry.list_with_counts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_name_is_rejected() {
        let (_dir, _pool, registry) = registry().await;
        assert!(registry.create("   ", None, "#fff").await.is_err());
    }
}
