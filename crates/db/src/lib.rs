//! SurrealDB client factory and migration tooling for FOLIO.

use anyhow::Context;
use serde::Deserialize;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;

use folio_kernel::settings::DatabaseSettings;
use folio_kernel::Migration;

/// Establish a SurrealDB connection using the configured endpoint.
///
/// The endpoint scheme selects the engine: `ws://` or `http://` for a
/// remote server, `mem://` for an embedded in-memory instance.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Surreal<Any>> {
    tracing::info!(endpoint = %settings.endpoint, "connecting to database");

    let db = surrealdb::engine::any::connect(settings.endpoint.as_str())
        .await
        .with_context(|| format!("failed to connect to database at '{}'", settings.endpoint))?;

    db.use_ns(settings.namespace.as_str())
        .use_db(settings.database.as_str())
        .await
        .context("failed to select namespace and database")?;

    Ok(db)
}

#[derive(Debug, Deserialize)]
struct AppliedMigration {
    key: String,
}

/// Apply pending migrations, recording each in the `migration` ledger table.
///
/// Migrations are keyed by `{module}:{id}` and skipped when already applied,
/// so startup is idempotent.
pub async fn run_migrations(
    db: &Surreal<Any>,
    migrations: &[(String, Migration)],
) -> anyhow::Result<()> {
    db.query("DEFINE TABLE IF NOT EXISTS migration SCHEMALESS;")
        .await
        .context("failed to define migration ledger table")?
        .check()
        .context("failed to define migration ledger table")?;

    let mut response = db
        .query("SELECT key FROM migration;")
        .await
        .context("failed to read migration ledger")?;
    let applied: Vec<AppliedMigration> = response
        .take(0)
        .context("failed to decode migration ledger")?;
    let applied: Vec<String> = applied.into_iter().map(|m| m.key).collect();

    for (module, migration) in migrations {
        let key = format!("{}:{}", module, migration.id);

        if applied.iter().any(|k| k == &key) {
            tracing::debug!(migration = %key, "migration already applied, skipping");
            continue;
        }

        tracing::info!(migration = %key, "applying migration");

        db.query(migration.up)
            .await
            .with_context(|| format!("failed to apply migration '{}'", key))?
            .check()
            .with_context(|| format!("migration '{}' reported an error", key))?;

        db.query("CREATE migration SET key = $key, appliedAt = time::now();")
            .bind(("key", key.clone()))
            .await
            .with_context(|| format!("failed to record migration '{}'", key))?
            .check()
            .with_context(|| format!("failed to record migration '{}'", key))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem_settings() -> DatabaseSettings {
        DatabaseSettings {
            endpoint: "mem://".to_string(),
            namespace: "folio".to_string(),
            database: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_connect_in_memory() {
        let db = connect(&mem_settings()).await.unwrap();
        db.query("INFO FOR DB;").await.unwrap().check().unwrap();
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = connect(&mem_settings()).await.unwrap();

        let migrations = vec![(
            "catalog".to_string(),
            Migration {
                id: "001_init",
                up: "DEFINE TABLE IF NOT EXISTS book SCHEMALESS;",
            },
        )];

        run_migrations(&db, &migrations).await.unwrap();
        run_migrations(&db, &migrations).await.unwrap();

        let mut response = db.query("SELECT key FROM migration;").await.unwrap();
        let applied: Vec<AppliedMigration> = response.take(0).unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].key, "catalog:001_init");
    }
}
