// src/importer/mod.rs
use chrono::Utc;
use tracing::{debug, info, warn};

pub mod columns;
pub mod rows;

pub use columns::{suggest_mapping, validate_mapping, ColumnMapping};

use crate::config::ImporterConfig;
use crate::database::{self, DbPool};
use crate::models::{ImportBatch, Result};

/// Outcome of one import run. Row failures are part of a successful run;
/// only pre-flight validation or storage failure abort the operation.
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub batch_id: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

pub struct LeadImporter {
    workspace: String,
    config: ImporterConfig,
    db_pool: DbPool,
}

impl LeadImporter {
    pub fn new(workspace: &str, config: ImporterConfig, db_pool: DbPool) -> Self {
        Self {
            workspace: workspace.to_string(),
            config,
            db_pool,
        }
    }

    /// Parse the header row of raw CSV text and suggest a column mapping
    /// for it. The caller may adjust the result before running `import`.
    pub fn preview_mapping(&self, csv_text: &str) -> (Vec<String>, ColumnMapping) {
        let headers = match csv_text.lines().find(|l| !l.trim().is_empty()) {
            Some(line) => rows::split_csv_line(line)
                .into_iter()
                .map(|h| h.trim().to_string())
                .collect(),
            None => Vec::new(),
        };
        let mapping = suggest_mapping(&headers);
        (headers, mapping)
    }

    /// Run one import: pre-flight mapping validation (no writes on
    /// failure), then independent row processing with `(email, workspace)`
    /// upserts, then one ImportBatch audit row covering the run.
    pub async fn import(
        &self,
        file_name: &str,
        csv_text: &str,
        mapping: &ColumnMapping,
        segment_id: Option<&str>,
    ) -> Result<ImportSummary> {
        // Pre-flight: a missing required column is a validation error, not a
        // row failure. Nothing is written, no audit record is produced.
        if let Err(missing) = validate_mapping(mapping, &self.config.required_fields) {
            return Err(format!(
                "import mapping incomplete: missing required column(s): {}",
                missing.join(", ")
            )
            .into());
        }

        let mut lines = csv_text.lines().filter(|l| !l.trim().is_empty());
        let header = match lines.next() {
            Some(line) => rows::split_csv_line(line),
            None => return Err("import input is empty".into()),
        };

        let mut total = 0usize;
        let mut succeeded = 0usize;
        let mut errors: Vec<String> = Vec::new();

        for line in lines {
            total += 1;
            let row = rows::split_csv_line(line);

            if self.config.strict_row_width && row.len() > header.len() {
                errors.push(format!(
                    "row {}: {} cells but header has {}",
                    total,
                    row.len(),
                    header.len()
                ));
                continue;
            }

            match rows::build_candidate(&row, mapping, &self.workspace, total) {
                Ok(mut lead) => {
                    // Segment stamping is part of the row: either the lead
                    // lands in the segment or the row fails entirely.
                    lead.segment_id = segment_id.map(str::to_string);
                    match database::upsert_lead(&self.db_pool, &lead).await {
                        Ok(()) => succeeded += 1,
                        Err(e) => {
                            warn!("Import aborted by storage failure: {}", e);
                            return Err(e);
                        }
                    }
                }
                Err(message) => {
                    debug!("Skipping row: {}", message);
                    errors.push(message);
                }
            }
        }

        let failed = total - succeeded;
        let batch = ImportBatch {
            id: uuid::Uuid::new_v4().to_string(),
            workspace: self.workspace.clone(),
            file_name: file_name.to_string(),
            column_mapping: mapping.clone(),
            segment_id: segment_id.map(str::to_string),
            total_rows: total,
            succeeded,
            failed,
            errors: errors.clone(),
            imported_at: Utc::now(),
        };
        database::insert_import_batch(&self.db_pool, &batch).await?;

        info!(
            "Import '{}' complete: {} total, {} succeeded, {} failed",
            file_name, total, succeeded, failed
        );

        Ok(ImportSummary {
            batch_id: batch.id,
            total,
            succeeded,
            failed,
            errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::database::create_db_pool;
    use tempfile::TempDir;

    async fn test_pool() -> (TempDir, DbPool) {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        let pool = create_db_pool(db_path.to_str().unwrap()).await.unwrap();
        (dir, pool)
    }

    fn importer(pool: &DbPool) -> LeadImporter {
        LeadImporter::new("ws-test", Config::default().importer, pool.clone())
    }

    #[tokio::test]
    async fn basic_import_reports_row_level_failures() {
        let (_dir, pool) = test_pool().await;
        let imp = importer(&pool);

        let csv = "Email,Name,Company\na@x.com,Alice,Acme\nbad-email,Bob,Beta\n";
        let (_, mapping) = imp.preview_mapping(csv);
        let summary = imp.import("leads.csv", csv, &mapping, None).await.unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].contains("row 2"));
        assert!(summary.errors[0].contains("bad-email"));

        let lead = database::get_lead_by_email(&pool, "ws-test", "a@x.com")
            .await
            .unwrap()
            .expect("lead should exist");
        assert_eq!(lead.name, "Alice");
        assert_eq!(database::count_leads(&pool, "ws-test").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn importing_twice_is_idempotent() {
        let (_dir, pool) = test_pool().await;
        let imp = importer(&pool);

        let csv = "Name,Email\nAlice,a@x.com\nBob,b@x.com\n";
        let (_, mapping) = imp.preview_mapping(csv);

        let first = imp.import("leads.csv", csv, &mapping, None).await.unwrap();
        let second = imp.import("leads.csv", csv, &mapping, None).await.unwrap();

        assert_eq!(first.succeeded, 2);
        assert_eq!(second.succeeded, 2);
        assert_eq!(database::count_leads(&pool, "ws-test").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn reimport_updates_non_identity_fields() {
        let (_dir, pool) = test_pool().await;
        let imp = importer(&pool);

        let csv1 = "Name,Email,Company\nAlice,a@x.com,\n";
        let (_, mapping1) = imp.preview_mapping(csv1);
        imp.import("first.csv", csv1, &mapping1, None).await.unwrap();

        let csv2 = "Name,Email,Company\nAlice,a@x.com,Acme\n";
        let (_, mapping2) = imp.preview_mapping(csv2);
        imp.import("second.csv", csv2, &mapping2, None).await.unwrap();

        let lead = database::get_lead_by_email(&pool, "ws-test", "a@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lead.company.as_deref(), Some("Acme"));
        assert_eq!(database::count_leads(&pool, "ws-test").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_required_mapping_writes_nothing() {
        let (_dir, pool) = test_pool().await;
        let imp = importer(&pool);

        let csv = "Company,Phone\nAcme,123\n";
        let (_, mapping) = imp.preview_mapping(csv);
        let err = imp.import("leads.csv", csv, &mapping, None).await.unwrap_err();

        assert!(err.to_string().contains("name"));
        assert!(err.to_string().contains("email"));
        assert_eq!(database::count_leads(&pool, "ws-test").await.unwrap(), 0);
        // pre-flight failures produce no audit record
        let batches = database::list_import_batches(&pool, "ws-test").await.unwrap();
        assert!(batches.is_empty());
    }

    #[tokio::test]
    async fn successful_rows_are_stamped_with_the_segment() {
        let (_dir, pool) = test_pool().await;
        let imp = importer(&pool);

        let csv = "Name,Email\nAlice,a@x.com\n";
        let (_, mapping) = imp.preview_mapping(csv);
        imp.import("leads.csv", csv, &mapping, Some("seg-1"))
            .await
            .unwrap();

        let lead = database::get_lead_by_email(&pool, "ws-test", "a@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lead.segment_id.as_deref(), Some("seg-1"));
    }

    #[tokio::test]
    async fn audit_record_covers_the_whole_run() {
        let (_dir, pool) = test_pool().await;
        let imp = importer(&pool);

        let csv = "Name,Email\nAlice,a@x.com\nBob,not-an-email\n";
        let (_, mapping) = imp.preview_mapping(csv);
        let summary = imp.import("leads.csv", csv, &mapping, None).await.unwrap();

        let batches = database::list_import_batches(&pool, "ws-test").await.unwrap();
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.id, summary.batch_id);
        assert_eq!(batch.file_name, "leads.csv");
        assert_eq!(batch.total_rows, 2);
        assert_eq!(batch.succeeded, 1);
        assert_eq!(batch.failed, 1);
        assert_eq!(batch.errors.len(), 1);
    }
}
