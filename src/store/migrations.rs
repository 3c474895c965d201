use rusqlite::Connection;

const MIGRATION_001: &str = include_str!("../../migrations/001_initial.sql");

pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    // Create migrations tracking table
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id      INTEGER PRIMARY KEY,
            name    TEXT NOT NULL,
            applied INTEGER NOT NULL
        );",
    )?;

    let migrations: &[(i64, &str, &str)] = &[(1, "001_initial", MIGRATION_001)];

    for &(id, name, sql) in migrations {
        let applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !applied {
            tracing::info!(migration = name, "applying migration");
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO _migrations (id, name, applied) VALUES (?1, ?2, unixepoch())",
                rusqlite::params![id, name],
            )?;
        }
    }

    Ok(())
}
