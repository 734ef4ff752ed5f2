use anyhow::Result;
use sqlx::PgPool;
use tracing::info;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS disaster_event_live (
        id            BIGSERIAL         PRIMARY KEY,
        disaster_type TEXT              NOT NULL,
        title         TEXT              NOT NULL,
        location      TEXT              NOT NULL,
        location_key  TEXT              NOT NULL,
        magnitude     DOUBLE PRECISION,
        depth         TEXT,
        alert_level   TEXT,
        status        TEXT,
        started_at    TIMESTAMPTZ       NOT NULL,
        expected_end  TIMESTAMPTZ,
        source        TEXT              NOT NULL,
        is_active     BOOLEAN           NOT NULL DEFAULT TRUE,
        created_at    TIMESTAMPTZ       NOT NULL DEFAULT now(),
        updated_at    TIMESTAMPTZ       NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS disaster_event_live_cluster_idx
        ON disaster_event_live (disaster_type, location_key)
        WHERE is_active
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS disaster_history (
        id            BIGSERIAL         PRIMARY KEY,
        disaster_type TEXT              NOT NULL,
        title         TEXT              NOT NULL,
        location      TEXT              NOT NULL,
        location_key  TEXT              NOT NULL,
        magnitude     DOUBLE PRECISION,
        depth         TEXT,
        alert_level   TEXT,
        description   TEXT              NOT NULL,
        occurred_at   TIMESTAMPTZ       NOT NULL,
        time_estimated BOOLEAN          NOT NULL DEFAULT FALSE,
        ended_at      TIMESTAMPTZ,
        source        TEXT              NOT NULL,
        created_at    TIMESTAMPTZ       NOT NULL DEFAULT now()
    )
    "#,
    r#"
    ALTER TABLE disaster_history
        ADD COLUMN IF NOT EXISTS time_estimated BOOLEAN NOT NULL DEFAULT FALSE
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS disaster_history_dedup_idx
        ON disaster_history (disaster_type, location_key, occurred_at)
    "#,
];

/// Create tables and indexes. Idempotent.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Disaster store migrations applied");
    Ok(())
}
