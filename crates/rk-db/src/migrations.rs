//! Embedded SQL migrations and runner.
//!
//! Migrations are stored as `&str` constants and executed in order.  A
//! `schema_migrations` table tracks which versions have been applied.

use rusqlite::Connection;
use rk_core::{Error, Result};

/// V1: initial schema -- scenes, markers, performers and their dependents.
const V1_INITIAL: &str = r#"
-- Scenes (source media items)
CREATE TABLE scenes (
    id            TEXT PRIMARY KEY,
    path          TEXT NOT NULL UNIQUE,
    checksum      TEXT,
    oshash        TEXT,
    title         TEXT,
    duration_secs REAL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

-- Markers (owned by scenes)
CREATE TABLE scene_markers (
    id         TEXT PRIMARY KEY,
    scene_id   TEXT NOT NULL REFERENCES scenes(id) ON DELETE CASCADE,
    title      TEXT NOT NULL DEFAULT '',
    seconds    REAL NOT NULL CHECK (seconds >= 0),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Performers
CREATE TABLE performers (
    id            TEXT PRIMARY KEY,
    checksum      TEXT NOT NULL UNIQUE,
    name          TEXT NOT NULL,
    url           TEXT,
    gender        TEXT,
    birthdate     TEXT,
    ethnicity     TEXT,
    country       TEXT,
    eye_color     TEXT,
    height        TEXT,
    measurements  TEXT,
    fake_tits     TEXT,
    career_length TEXT,
    tattoos       TEXT,
    piercings     TEXT,
    aliases       TEXT,
    twitter       TEXT,
    instagram     TEXT,
    favorite      INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE performers_image (
    performer_id TEXT PRIMARY KEY REFERENCES performers(id) ON DELETE CASCADE,
    image        BLOB NOT NULL
);

CREATE TABLE performer_stash_ids (
    performer_id TEXT NOT NULL REFERENCES performers(id) ON DELETE CASCADE,
    endpoint     TEXT NOT NULL CHECK (endpoint <> ''),
    stash_id     TEXT NOT NULL CHECK (stash_id <> ''),
    PRIMARY KEY (performer_id, endpoint)
);
"#;

/// V2: lookup indexes for hash-keyed and scene-keyed queries.
const V2_INDEXES: &str = r#"
CREATE INDEX idx_scenes_checksum      ON scenes(checksum);
CREATE INDEX idx_scenes_oshash        ON scenes(oshash);
CREATE INDEX idx_scene_markers_scene  ON scene_markers(scene_id);
CREATE INDEX idx_performers_name      ON performers(name);
"#;

/// Ordered list of (version, sql) pairs.
const MIGRATIONS: &[(i64, &str)] = &[(1, V1_INITIAL), (2, V2_INDEXES)];

/// Run all pending migrations on `conn`.
///
/// Creates the `schema_migrations` tracking table if it does not exist,
/// then applies each outstanding migration inside a transaction.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .map_err(|e| Error::database(format!("Failed to create schema_migrations: {e}")))?;

    for &(version, sql) in MIGRATIONS {
        let already: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .map_err(|e| Error::database(e.to_string()))?;

        if already {
            continue;
        }

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        tx.execute_batch(sql)
            .map_err(|e| Error::database(format!("Migration V{version} failed: {e}")))?;

        tx.execute("INSERT INTO schema_migrations (version) VALUES (?1)", [version])
            .map_err(|e| Error::database(e.to_string()))?;

        tx.commit().map_err(|e| Error::database(e.to_string()))?;

        tracing::debug!(version, "Applied migration");
    }

    Ok(())
}
