use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::postgres::PostgresClient;

/// Arbitrary key for the advisory lock held while a migration applies, so
/// several instances starting together apply each migration once.
const MIGRATION_LOCK_KEY: i64 = 0x6169_7263_746c;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "00001_create_devices",
        sql: include_str!("../../migrations/postgres/00001_create_devices.sql"),
    },
    Migration {
        version: "00002_create_requested_devices",
        sql: include_str!("../../migrations/postgres/00002_create_requested_devices.sql"),
    },
    Migration {
        version: "00003_create_sensor_readings",
        sql: include_str!("../../migrations/postgres/00003_create_sensor_readings.sql"),
    },
];

/// Applies the schema migrations embedded in this crate.
///
/// Each migration runs in its own transaction and is recorded in
/// `schema_migrations`; already-recorded versions are skipped.
pub struct MigrationRunner {
    client: PostgresClient,
}

impl MigrationRunner {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }

    /// Runs all pending migrations, returning how many were applied
    pub async fn run_migrations(&self) -> Result<usize> {
        let mut conn = self.client.get_connection().await?;

        conn.batch_execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version TEXT PRIMARY KEY,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        )
        .await
        .context("Failed to create schema_migrations table")?;

        let mut applied = 0;
        for migration in MIGRATIONS {
            let transaction = conn
                .transaction()
                .await
                .context("Failed to open migration transaction")?;

            transaction
                .execute("SELECT pg_advisory_xact_lock($1)", &[&MIGRATION_LOCK_KEY])
                .await
                .context("Failed to acquire migration lock")?;

            let already_applied = transaction
                .query_opt(
                    "SELECT version FROM schema_migrations WHERE version = $1",
                    &[&migration.version],
                )
                .await
                .context("Failed to read schema_migrations")?
                .is_some();

            if already_applied {
                debug!(version = migration.version, "migration already applied");
                continue;
            }

            transaction
                .batch_execute(migration.sql)
                .await
                .with_context(|| format!("Migration {} failed", migration.version))?;

            transaction
                .execute(
                    "INSERT INTO schema_migrations (version) VALUES ($1)",
                    &[&migration.version],
                )
                .await
                .with_context(|| format!("Failed to record migration {}", migration.version))?;

            transaction
                .commit()
                .await
                .with_context(|| format!("Failed to commit migration {}", migration.version))?;

            info!(version = migration.version, "applied migration");
            applied += 1;
        }

        debug!(applied, "migrations completed successfully");
        Ok(applied)
    }

    /// Versions recorded in `schema_migrations`, oldest first
    pub async fn applied_versions(&self) -> Result<Vec<String>> {
        let conn = self.client.get_connection().await?;
        let rows = conn
            .query(
                "SELECT version FROM schema_migrations ORDER BY version",
                &[],
            )
            .await
            .context("Failed to read schema_migrations")?;

        Ok(rows.iter().map(|row| row.get(0)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered_and_unique() {
        let versions: Vec<&str> = MIGRATIONS.iter().map(|m| m.version).collect();
        let mut sorted = versions.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(versions, sorted);
    }

    #[test]
    fn test_migrations_are_embedded() {
        assert!(MIGRATIONS.iter().all(|m| !m.sql.trim().is_empty()));
        assert!(MIGRATIONS[0].sql.contains("CREATE TABLE IF NOT EXISTS devices"));
    }
}
