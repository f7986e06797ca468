// ABOUTME: Anonymous usage analytics storage
// ABOUTME: Raw event log plus per-day counters with success rate derived on read

use chrono::{NaiveDate, Utc};
use prdsmith_core::generate_id;
use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, SqlitePool};

use crate::StorageResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    PageView,
    PrdGenerated,
    PrdFailed,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PageView => "page_view",
            EventType::PrdGenerated => "prd_generated",
            EventType::PrdFailed => "prd_failed",
        }
    }
}

/// Event to append to the log
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_type: EventType,
    pub anonymous_id: String,
    pub session_id: Option<String>,
    pub metadata: Option<Value>,
    pub duration_ms: Option<i64>,
}

impl NewEvent {
    pub fn new(event_type: EventType, anonymous_id: impl Into<String>) -> Self {
        Self {
            event_type,
            anonymous_id: anonymous_id.into(),
            session_id: None,
            metadata: None,
            duration_ms: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// Counters for one UTC day
#[derive(Debug, Clone, Default, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub date: String,
    pub total_visits: i64,
    pub prd_total: i64,
    pub prd_success: i64,
    pub error_count: i64,
    pub total_tokens: i64,
}

impl DailyStats {
    /// Share of generation attempts that succeeded, 0.0 when none ran
    pub fn success_rate(&self) -> f64 {
        if self.prd_total == 0 {
            0.0
        } else {
            self.prd_success as f64 / self.prd_total as f64
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct CounterDelta {
    visits: i64,
    prd_total: i64,
    prd_success: i64,
    errors: i64,
    tokens: i64,
}

pub struct AnalyticsStorage {
    pool: SqlitePool,
}

impl AnalyticsStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record_event(&self, event: &NewEvent) -> StorageResult<()> {
        let metadata = event
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO analytics_events (id, event_type, anonymous_id, session_id, metadata, duration_ms, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(generate_id())
        .bind(event.event_type.as_str())
        .bind(&event.anonymous_id)
        .bind(&event.session_id)
        .bind(metadata)
        .bind(event.duration_ms)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn record_page_view(
        &self,
        anonymous_id: &str,
        session_id: Option<&str>,
        path: Option<&str>,
    ) -> StorageResult<()> {
        let mut event = NewEvent::new(EventType::PageView, anonymous_id);
        event.session_id = session_id.map(str::to_string);
        if let Some(path) = path {
            event.metadata = Some(serde_json::json!({ "path": path }));
        }
        self.record_event(&event).await?;
        self.bump(CounterDelta {
            visits: 1,
            ..CounterDelta::default()
        })
        .await
    }

    /// Log a generation attempt and update the day's counters
    pub async fn record_generation(&self, event: &NewEvent, tokens: u32) -> StorageResult<()> {
        self.record_event(event).await?;

        let succeeded = event.event_type == EventType::PrdGenerated;
        self.bump(CounterDelta {
            prd_total: 1,
            prd_success: i64::from(succeeded),
            errors: i64::from(!succeeded),
            tokens: i64::from(tokens),
            ..CounterDelta::default()
        })
        .await
    }

    pub async fn daily_stats(&self, date: NaiveDate) -> StorageResult<Option<DailyStats>> {
        Ok(sqlx::query_as::<_, DailyStats>(
            r#"
            SELECT date, total_visits, prd_total, prd_success, error_count, total_tokens
            FROM daily_stats WHERE date = ?
            "#,
        )
        .bind(date.format("%Y-%m-%d").to_string())
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn today(&self) -> StorageResult<DailyStats> {
        let today = Utc::now().date_naive();
        Ok(self.daily_stats(today).await?.unwrap_or_else(|| DailyStats {
            date: today.format("%Y-%m-%d").to_string(),
            ..DailyStats::default()
        }))
    }

    async fn bump(&self, delta: CounterDelta) -> StorageResult<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO daily_stats (date, total_visits, prd_total, prd_success, error_count, total_tokens, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(date) DO UPDATE SET
                total_visits = total_visits + excluded.total_visits,
                prd_total = prd_total + excluded.prd_total,
                prd_success = prd_success + excluded.prd_success,
                error_count = error_count + excluded.error_count,
                total_tokens = total_tokens + excluded.total_tokens,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(now.date_naive().format("%Y-%m-%d").to_string())
        .bind(delta.visits)
        .bind(delta.prd_total)
        .bind(delta.prd_success)
        .bind(delta.errors)
        .bind(delta.tokens)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
