#![cfg(test)]
use std::time::Duration;

use migration::MigratorTrait;
use models::db::{connect_with_config, DatabaseConfig};
use sea_orm::DatabaseConnection;
use tokio::sync::OnceCell;

// Migrations run at most once per test process; `false` means no usable database.
static MIGRATED: OnceCell<bool> = OnceCell::const_new();

fn test_config() -> DatabaseConfig {
    let mut cfg = DatabaseConfig::from_file().unwrap_or_else(|_| DatabaseConfig::from_env());
    cfg.max_connections = cfg.max_connections.max(5);
    cfg.min_connections = cfg.min_connections.min(1);
    cfg.connect_timeout = Duration::from_secs(2);
    cfg.acquire_timeout = Duration::from_secs(2);
    cfg
}

/// Connection for DB-backed tests, or `None` when Postgres is unavailable
/// or `SKIP_DB_TESTS` is set.
pub async fn get_db() -> Option<DatabaseConnection> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return None;
    }

    let migrated = MIGRATED
        .get_or_init(|| async {
            match connect_with_config(&test_config()).await {
                Ok(db) => match migration::Migrator::up(&db, None).await {
                    Ok(()) => true,
                    Err(e) => {
                        eprintln!("skipping db tests: migration failed: {e}");
                        false
                    }
                },
                Err(e) => {
                    eprintln!("skipping db tests: {e}");
                    false
                }
            }
        })
        .await;
    if !*migrated {
        return None;
    }

    // Fresh pool for the current test's runtime
    connect_with_config(&test_config()).await.ok()
}
