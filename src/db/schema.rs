use anyhow::{Context, Result};
use rusqlite::Connection;

struct Migration {
    version: &'static str,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "001",
        name: "initial",
        sql: include_str!("migrations/001_initial.sql"),
    },
    Migration {
        version: "002",
        name: "single_current_lease",
        sql: include_str!("migrations/002_single_current_lease.sql"),
    },
];

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )
    .context("Failed to create schema_migrations table")?;

    let applied = get_applied_migrations(conn)?;

    for migration in MIGRATIONS {
        if !applied.iter().any(|v| v == migration.version) {
            apply_migration(conn, migration)?;
        }
    }

    Ok(())
}

fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(versions)
}

fn mark_migration_applied(conn: &Connection, version: &str, name: &str) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)",
        (version, name, &now),
    )?;
    Ok(())
}

fn apply_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    tracing::info!(
        "Applying migration {}: {}",
        migration.version,
        migration.name
    );

    conn.execute_batch(&format!("BEGIN TRANSACTION; {} COMMIT;", migration.sql))
        .with_context(|| {
            format!(
                "Failed to apply migration {}: {}",
                migration.version, migration.name
            )
        })?;

    mark_migration_applied(conn, migration.version, migration.name)?;

    tracing::info!("Migration {} applied successfully", migration.version);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_lease(conn: &Connection, id: &str, status: &str, voided_reason: Option<&str>) {
        conn.execute(
            "INSERT INTO leases (id, owner_user_id, property_id, start_date, status, voided_reason,
                                 created_at, updated_at)
             VALUES (?, 'owner', 'prop', '2024-01-01', ?, ?, 'now', 'now')",
            (id, status, voided_reason),
        )
        .unwrap();
    }

    fn migrated() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO properties (id, owner_user_id, name, created_at, updated_at)
             VALUES ('prop', 'owner', 'Unit 1', 'now', 'now')",
            [],
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_migrations_run_on_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='leases'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);

        let versions = get_applied_migrations(&conn).unwrap();
        assert_eq!(versions, vec!["001", "002"]);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let versions = get_applied_migrations(&conn).unwrap();
        assert_eq!(versions, vec!["001", "002"]);
    }

    #[test]
    fn test_second_current_lease_is_rejected() {
        let conn = migrated();
        insert_lease(&conn, "a", "active", None);

        let err = conn
            .execute(
                "INSERT INTO leases (id, owner_user_id, property_id, start_date, status,
                                     created_at, updated_at)
                 VALUES ('b', 'owner', 'prop', '2024-02-01', 'month_to_month', 'now', 'now')",
                [],
            )
            .unwrap_err();
        assert!(err.to_string().contains("UNIQUE constraint failed: leases.property_id"));
    }

    #[test]
    fn test_ended_and_voided_leases_do_not_count() {
        let conn = migrated();
        insert_lease(&conn, "a", "ended", None);
        insert_lease(&conn, "b", "voided", Some("roster change"));
        insert_lease(&conn, "c", "active", None);
    }

    #[test]
    fn test_voided_lease_requires_reason() {
        let conn = migrated();
        let result = conn.execute(
            "INSERT INTO leases (id, owner_user_id, property_id, start_date, status,
                                 created_at, updated_at)
             VALUES ('a', 'owner', 'prop', '2024-01-01', 'voided', 'now', 'now')",
            [],
        );
        assert!(result.is_err());
    }
}
