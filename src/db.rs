use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::event::{EventRecord, NewEvent, TIMESTAMP_FORMAT};
use crate::traits::EventStore;

/// SQLite-backed event store.
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to `database_url` and run pending migrations.
    ///
    /// In-memory databases live only as long as their connection, so they get
    /// a single connection that is never recycled.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {database_url}"))?
            .create_if_missing(true);

        let pool_options = if is_in_memory(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        let database = Self { pool };
        database.migrate().await?;

        tracing::debug!("Database ready at {}", database_url);
        Ok(database)
    }

    /// Create the `events` table if it does not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub async fn insert_event(&self, event: &NewEvent) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO events (starts_at, ends_at, kind, weekly_recurring) \
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(event.starts_at.format(TIMESTAMP_FORMAT).to_string())
        .bind(event.ends_at.format(TIMESTAMP_FORMAT).to_string())
        .bind(event.kind.as_str())
        .bind(event.weekly_recurring)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert event")?;

        tracing::debug!("Inserted {} event {}", event.kind, id);
        Ok(id)
    }

    /// Batch insert several events, returning their ids in order.
    pub async fn insert_events(&self, events: &[NewEvent]) -> Result<Vec<i64>> {
        let mut ids = Vec::with_capacity(events.len());
        for event in events {
            ids.push(self.insert_event(event).await?);
        }
        Ok(ids)
    }

    pub async fn get_events(&self) -> Result<Vec<EventRecord>> {
        let events = sqlx::query_as::<_, EventRecord>(
            "SELECT id, starts_at, ends_at, kind, weekly_recurring FROM events",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch events")?;

        Ok(events)
    }

    pub async fn count_events(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count events")?;
        Ok(count)
    }

    /// Delete every event and return how many rows were removed.
    pub async fn clear_events(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM events")
            .execute(&self.pool)
            .await
            .context("Failed to clear events")?;
        Ok(result.rows_affected())
    }
}

impl EventStore for Database {
    async fn fetch_events(&self) -> Result<Vec<EventRecord>> {
        self.get_events().await
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}
