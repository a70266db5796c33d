//! SQLite storage layer for Searchlight.
//!
//! Three tables: registered clients, one summary row per
//! `(client_id, report_id)` report window, and an append-only log of
//! generated insight bundles. Bundles are stored as JSON payloads with a
//! server-assigned generation timestamp; the read path returns the most
//! recent one for a report.

use chrono::{DateTime, TimeZone, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::model::{ClientProfile, InsightsBundle, PeriodSummary, ReportId, StoredInsights};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

/// A summary row as listed in the report archive.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReportRecord {
    pub report_id: ReportId,
    pub summary: PeriodSummary,
}

impl Storage {
    /// Create a new storage instance and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:searchlight.db" or "sqlite::memory:")
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let storage = Self { pool };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    /// Create the database schema if it doesn't exist.
    async fn initialize_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS clients (
                client_id TEXT PRIMARY KEY,
                company_name TEXT NOT NULL,
                contact_email TEXT NOT NULL,
                api_key TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS report_summaries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                client_id TEXT NOT NULL,
                report_id TEXT NOT NULL,
                total_clicks INTEGER NOT NULL,
                total_impressions INTEGER NOT NULL,
                average_ctr REAL NOT NULL,
                average_position REAL NOT NULL,
                mom_clicks_change REAL,
                mom_impressions_change REAL,
                mom_ctr_change REAL,
                yoy_clicks_change REAL,
                yoy_impressions_change REAL,
                yoy_ctr_change REAL,
                created_at INTEGER NOT NULL,
                UNIQUE(client_id, report_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS insight_bundles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                client_id TEXT NOT NULL,
                report_id TEXT NOT NULL,
                version TEXT NOT NULL,
                generated_at INTEGER NOT NULL,
                payload TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Index for the latest-bundle lookup per report
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_insight_bundles_report
            ON insight_bundles(client_id, report_id, generated_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Register a client, or update its profile and key if it already exists.
    pub async fn upsert_client(&self, profile: &ClientProfile, api_key: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO clients (client_id, company_name, contact_email, api_key, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(client_id) DO UPDATE SET
                company_name = excluded.company_name,
                contact_email = excluded.contact_email,
                api_key = excluded.api_key
            "#,
        )
        .bind(&profile.client_id)
        .bind(&profile.company_name)
        .bind(&profile.contact_email)
        .bind(api_key)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Check whether `api_key` matches the registered key for `client_id`.
    ///
    /// An unknown client and a wrong key are indistinguishable to the caller.
    pub async fn verify_client(&self, client_id: &str, api_key: &str) -> anyhow::Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) as matched
            FROM clients
            WHERE client_id = ? AND api_key = ?
            "#,
        )
        .bind(client_id)
        .bind(api_key)
        .fetch_one(&self.pool)
        .await?;

        let matched: i64 = row.get("matched");
        Ok(matched > 0)
    }

    /// Persist a period summary, replacing any previous row for the same
    /// report window. Regenerating a report is idempotent at this level.
    pub async fn upsert_summary(
        &self,
        client_id: &str,
        report_id: ReportId,
        summary: &PeriodSummary,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO report_summaries (
                client_id, report_id,
                total_clicks, total_impressions, average_ctr, average_position,
                mom_clicks_change, mom_impressions_change, mom_ctr_change,
                yoy_clicks_change, yoy_impressions_change, yoy_ctr_change,
                created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(client_id, report_id) DO UPDATE SET
                total_clicks = excluded.total_clicks,
                total_impressions = excluded.total_impressions,
                average_ctr = excluded.average_ctr,
                average_position = excluded.average_position,
                mom_clicks_change = excluded.mom_clicks_change,
                mom_impressions_change = excluded.mom_impressions_change,
                mom_ctr_change = excluded.mom_ctr_change,
                yoy_clicks_change = excluded.yoy_clicks_change,
                yoy_impressions_change = excluded.yoy_impressions_change,
                yoy_ctr_change = excluded.yoy_ctr_change,
                created_at = excluded.created_at
            "#,
        )
        .bind(client_id)
        .bind(report_id.to_string())
        .bind(summary.total_clicks as i64)
        .bind(summary.total_impressions as i64)
        .bind(summary.average_ctr)
        .bind(summary.average_position)
        .bind(summary.mom_clicks_change)
        .bind(summary.mom_impressions_change)
        .bind(summary.mom_ctr_change)
        .bind(summary.yoy_clicks_change)
        .bind(summary.yoy_impressions_change)
        .bind(summary.yoy_ctr_change)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch the stored summary for one report window, if present.
    pub async fn get_summary(
        &self,
        client_id: &str,
        report_id: ReportId,
    ) -> anyhow::Result<Option<PeriodSummary>> {
        let row = sqlx::query(
            r#"
            SELECT total_clicks, total_impressions, average_ctr, average_position,
                   mom_clicks_change, mom_impressions_change, mom_ctr_change,
                   yoy_clicks_change, yoy_impressions_change, yoy_ctr_change
            FROM report_summaries
            WHERE client_id = ? AND report_id = ?
            "#,
        )
        .bind(client_id)
        .bind(report_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_summary(&r)))
    }

    /// List all stored summaries for a client, newest report first.
    pub async fn list_summaries(&self, client_id: &str) -> anyhow::Result<Vec<ReportRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT report_id,
                   total_clicks, total_impressions, average_ctr, average_position,
                   mom_clicks_change, mom_impressions_change, mom_ctr_change,
                   yoy_clicks_change, yoy_impressions_change, yoy_ctr_change
            FROM report_summaries
            WHERE client_id = ?
            ORDER BY report_id DESC
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for r in &rows {
            let report_id: String = r.get("report_id");
            let report_id = report_id
                .parse()
                .map_err(|e| anyhow::anyhow!("corrupt report_id in storage: {e}"))?;
            records.push(ReportRecord {
                report_id,
                summary: row_to_summary(r),
            });
        }

        Ok(records)
    }

    /// Append a generated insights bundle for a report.
    pub async fn insert_insights(
        &self,
        client_id: &str,
        report_id: ReportId,
        version: &str,
        generated_at: DateTime<Utc>,
        bundle: &InsightsBundle,
    ) -> anyhow::Result<()> {
        let payload = serde_json::to_string(bundle)?;

        sqlx::query(
            r#"
            INSERT INTO insight_bundles (client_id, report_id, version, generated_at, payload)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(client_id)
        .bind(report_id.to_string())
        .bind(version)
        .bind(generated_at.timestamp())
        .bind(payload)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch the most recently generated bundle for a report, if any.
    ///
    /// Timestamps are stored at second precision; insertion order breaks
    /// ties between bundles generated within the same second.
    pub async fn latest_insights(
        &self,
        client_id: &str,
        report_id: ReportId,
    ) -> anyhow::Result<Option<StoredInsights>> {
        let row = sqlx::query(
            r#"
            SELECT version, generated_at, payload
            FROM insight_bundles
            WHERE client_id = ? AND report_id = ?
            ORDER BY generated_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(client_id)
        .bind(report_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let version: String = row.get("version");
        let generated_ts: i64 = row.get("generated_at");
        let payload: String = row.get("payload");

        let generated_at = Utc
            .timestamp_opt(generated_ts, 0)
            .single()
            .ok_or_else(|| anyhow::anyhow!("corrupt generated_at in storage: {generated_ts}"))?;
        let insights: InsightsBundle = serde_json::from_str(&payload)?;

        Ok(Some(StoredInsights {
            client_id: client_id.to_string(),
            report_id,
            version,
            generated_at,
            insights,
        }))
    }
}

fn row_to_summary(row: &sqlx::sqlite::SqliteRow) -> PeriodSummary {
    let total_clicks: i64 = row.get("total_clicks");
    let total_impressions: i64 = row.get("total_impressions");

    PeriodSummary {
        total_clicks: total_clicks as u64,
        total_impressions: total_impressions as u64,
        average_ctr: row.get("average_ctr"),
        average_position: row.get("average_position"),
        mom_clicks_change: row.get("mom_clicks_change"),
        mom_impressions_change: row.get("mom_impressions_change"),
        mom_ctr_change: row.get("mom_ctr_change"),
        yoy_clicks_change: row.get("yoy_clicks_change"),
        yoy_impressions_change: row.get("yoy_impressions_change"),
        yoy_ctr_change: row.get("yoy_ctr_change"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::{INSIGHTS_VERSION, generate_insights};

    fn summary(total_clicks: u64) -> PeriodSummary {
        PeriodSummary {
            total_clicks,
            total_impressions: total_clicks * 50,
            average_ctr: 0.02,
            average_position: 8.5,
            mom_clicks_change: Some(12.0),
            mom_impressions_change: None,
            mom_ctr_change: None,
            yoy_clicks_change: None,
            yoy_impressions_change: None,
            yoy_ctr_change: None,
        }
    }

    #[tokio::test]
    async fn test_summary_roundtrip() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let report_id: ReportId = "2025-07".parse().unwrap();

        let original = summary(1000);
        storage
            .upsert_summary("acme", report_id, &original)
            .await
            .unwrap();

        let loaded = storage.get_summary("acme", report_id).await.unwrap().unwrap();
        assert_eq!(loaded, original);

        // Absent deltas stay absent through storage.
        assert!(loaded.mom_impressions_change.is_none());
        assert_eq!(loaded.mom_clicks_change, Some(12.0));
    }

    #[tokio::test]
    async fn test_summary_missing_report() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let report_id: ReportId = "2025-07".parse().unwrap();

        let loaded = storage.get_summary("acme", report_id).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_summary() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let report_id: ReportId = "2025-07".parse().unwrap();

        storage
            .upsert_summary("acme", report_id, &summary(1000))
            .await
            .unwrap();
        storage
            .upsert_summary("acme", report_id, &summary(2000))
            .await
            .unwrap();

        let loaded = storage.get_summary("acme", report_id).await.unwrap().unwrap();
        assert_eq!(loaded.total_clicks, 2000);

        let all = storage.list_summaries("acme").await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_list_summaries_newest_first() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();

        for month in ["2024-12", "2025-02", "2025-01"] {
            storage
                .upsert_summary("acme", month.parse().unwrap(), &summary(100))
                .await
                .unwrap();
        }
        // Another client's reports must not leak into the listing.
        storage
            .upsert_summary("other", "2025-03".parse().unwrap(), &summary(1))
            .await
            .unwrap();

        let records = storage.list_summaries("acme").await.unwrap();
        let ids: Vec<String> = records.iter().map(|r| r.report_id.to_string()).collect();
        assert_eq!(ids, vec!["2025-02", "2025-01", "2024-12"]);
    }

    #[tokio::test]
    async fn test_latest_insights_by_timestamp() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let report_id: ReportId = "2025-07".parse().unwrap();

        let older = generate_insights(&summary(1000));
        let newer = generate_insights(&summary(2000));

        let t0 = Utc::now() - chrono::Duration::hours(1);
        let t1 = Utc::now();

        storage
            .insert_insights("acme", report_id, INSIGHTS_VERSION, t0, &older)
            .await
            .unwrap();
        storage
            .insert_insights("acme", report_id, INSIGHTS_VERSION, t1, &newer)
            .await
            .unwrap();

        let latest = storage
            .latest_insights("acme", report_id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(latest.version, "1.0");
        assert_eq!(latest.insights, newer);
        assert_eq!(latest.generated_at.timestamp(), t1.timestamp());
    }

    #[tokio::test]
    async fn test_latest_insights_none_for_unknown_report() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();
        let report_id: ReportId = "2025-07".parse().unwrap();

        let latest = storage.latest_insights("acme", report_id).await.unwrap();
        assert!(latest.is_none());
    }

    #[tokio::test]
    async fn test_verify_client() {
        let storage = Storage::new("sqlite::memory:").await.unwrap();

        let profile = ClientProfile {
            client_id: "acme".to_string(),
            company_name: "Acme Corp".to_string(),
            contact_email: "seo@acme.example".to_string(),
        };
        storage.upsert_client(&profile, "secret-key").await.unwrap();

        assert!(storage.verify_client("acme", "secret-key").await.unwrap());
        assert!(!storage.verify_client("acme", "wrong-key").await.unwrap());
        assert!(!storage.verify_client("unknown", "secret-key").await.unwrap());
    }
}
