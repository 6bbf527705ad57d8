use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::UserId;
use sqlx::{PgExecutor, PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    EventId, OutboxError, OutboxEvent, Result,
    store::{ClaimRequest, OutboxStore, validate_for_append},
};

const EVENT_COLUMNS: &str = "id, event_type, event_payload, user_id, created_at, dispatched_at, attempts, last_error, failed_at";
const CLAIMED_COLUMNS: &str = "e.id, e.event_type, e.event_payload, e.user_id, e.created_at, e.dispatched_at, e.attempts, e.last_error, e.failed_at";

/// PostgreSQL-backed outbox.
#[derive(Clone)]
pub struct PostgresOutboxStore {
    pool: PgPool,
}

impl PostgresOutboxStore {
    /// Creates a new PostgreSQL outbox store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations (outbox and read-model tables).
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_event(row: PgRow) -> Result<OutboxEvent> {
        let attempts: i32 = row.try_get("attempts")?;

        Ok(OutboxEvent {
            id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            payload: row.try_get("event_payload")?,
            user_id: row
                .try_get::<Option<Uuid>, _>("user_id")?
                .map(UserId::from_uuid),
            created_at: row.try_get("created_at")?,
            dispatched_at: row.try_get("dispatched_at")?,
            attempts: u32::try_from(attempts).unwrap_or_default(),
            last_error: row.try_get("last_error")?,
            failed_at: row.try_get("failed_at")?,
        })
    }

    async fn ensure_exists(&self, id: EventId) -> Result<()> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM outbox_events WHERE id = $1)")
                .bind(id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        if exists {
            Ok(())
        } else {
            Err(OutboxError::NotFound(id))
        }
    }
}

/// Sets `dispatched_at` on a pending event through any executor.
///
/// Used both by [`PostgresOutboxStore`] and by the projection transaction,
/// which marks the event in the same transaction as the read-model writes.
/// Returns `false` when the event is missing or already dispatched.
pub async fn mark_dispatched_with<'e, E>(
    executor: E,
    id: EventId,
    at: DateTime<Utc>,
) -> std::result::Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE outbox_events
        SET dispatched_at = $2,
            claimed_by = NULL,
            claimed_until = NULL
        WHERE id = $1 AND dispatched_at IS NULL
        "#,
    )
    .bind(id.as_uuid())
    .bind(at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

#[async_trait]
impl OutboxStore for PostgresOutboxStore {
    async fn append(&self, event: OutboxEvent) -> Result<()> {
        validate_for_append(&event)?;

        sqlx::query(
            r#"
            INSERT INTO outbox_events (id, event_type, event_payload, user_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(&event.event_type)
        .bind(&event.payload)
        .bind(event.user_id.map(|u| u.as_uuid()))
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: EventId) -> Result<Option<OutboxEvent>> {
        let row = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM outbox_events WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_event).transpose()
    }

    async fn fetch_undispatched(&self, limit: usize) -> Result<Vec<OutboxEvent>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM outbox_events
            WHERE dispatched_at IS NULL AND failed_at IS NULL
            ORDER BY created_at ASC, id ASC
            LIMIT $1
            "#
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn claim_batch(&self, request: &ClaimRequest) -> Result<Vec<OutboxEvent>> {
        // Rows locked by a concurrent claimer are skipped, not waited on.
        let rows = sqlx::query(&format!(
            r#"
            WITH claimable AS (
                SELECT id
                FROM outbox_events
                WHERE dispatched_at IS NULL
                  AND failed_at IS NULL
                  AND (claimed_until IS NULL OR claimed_until < NOW())
                ORDER BY created_at ASC, id ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE outbox_events e
            SET claimed_by = $2,
                claimed_until = NOW() + make_interval(secs => $3),
                attempts = e.attempts + 1
            FROM claimable c
            WHERE e.id = c.id
            RETURNING {CLAIMED_COLUMNS}
            "#
        ))
        .bind(request.limit as i64)
        .bind(&request.claimer)
        .bind(request.lease.as_secs_f64())
        .fetch_all(&self.pool)
        .await?;

        let mut events = rows
            .into_iter()
            .map(Self::row_to_event)
            .collect::<Result<Vec<_>>>()?;

        // RETURNING does not preserve the CTE ordering.
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        tracing::debug!(
            claimer = %request.claimer,
            claimed = events.len(),
            "claimed outbox batch"
        );

        Ok(events)
    }

    async fn mark_dispatched(&self, id: EventId, at: DateTime<Utc>) -> Result<bool> {
        if mark_dispatched_with(&self.pool, id, at).await? {
            return Ok(true);
        }
        self.ensure_exists(id).await?;
        Ok(false)
    }

    async fn release(&self, id: EventId, error: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_events
            SET claimed_by = NULL,
                claimed_until = NULL,
                last_error = $2
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(OutboxError::NotFound(id));
        }
        Ok(())
    }

    async fn dead_letter(&self, id: EventId, error: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_events
            SET failed_at = NOW(),
                claimed_by = NULL,
                claimed_until = NULL,
                last_error = $2
            WHERE id = $1 AND dispatched_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .bind(error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            self.ensure_exists(id).await?;
        }
        Ok(())
    }

    async fn pending_count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM outbox_events WHERE dispatched_at IS NULL AND failed_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}
