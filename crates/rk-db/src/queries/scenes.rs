//! Scene CRUD operations.

use chrono::Utc;
use rk_core::{Error, Result, SceneId};
use rusqlite::{Connection, OptionalExtension};

use crate::models::{NewScene, Scene};

const COLS: &str = "id, path, checksum, oshash, title, duration_secs, created_at, updated_at";

/// Create a new scene record.
pub fn create_scene(conn: &Connection, new: &NewScene) -> Result<Scene> {
    let id = SceneId::new();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO scenes (id, path, checksum, oshash, title, duration_secs, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        rusqlite::params![
            id.to_string(),
            new.path,
            new.checksum,
            new.oshash,
            new.title,
            new.duration_secs,
            &now,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Scene {
        id,
        path: new.path.clone(),
        checksum: new.checksum.clone(),
        oshash: new.oshash.clone(),
        title: new.title.clone(),
        duration_secs: new.duration_secs,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Get a scene by ID.
pub fn get_scene(conn: &Connection, id: SceneId) -> Result<Option<Scene>> {
    let q = format!("SELECT {COLS} FROM scenes WHERE id = ?1");
    conn.query_row(&q, [id.to_string()], Scene::from_row)
        .optional()
        .map_err(|e| Error::database(e.to_string()))
}

/// List scenes that own at least one marker.
pub fn list_scenes_with_markers(conn: &Connection) -> Result<Vec<Scene>> {
    let q = format!(
        "SELECT {COLS} FROM scenes s
         WHERE EXISTS (SELECT 1 FROM scene_markers m WHERE m.scene_id = s.id)
         ORDER BY path"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], Scene::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Replace a scene's content hashes after a re-scan.
pub fn update_scene_hashes(
    conn: &Connection,
    id: SceneId,
    checksum: Option<&str>,
    oshash: Option<&str>,
) -> Result<Scene> {
    let now = Utc::now().to_rfc3339();
    let n = conn
        .execute(
            "UPDATE scenes SET checksum = ?1, oshash = ?2, updated_at = ?3 WHERE id = ?4",
            rusqlite::params![checksum, oshash, now, id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    if n == 0 {
        return Err(Error::not_found("scene", id));
    }
    get_scene(conn, id)?.ok_or_else(|| Error::not_found("scene", id))
}

/// Delete a scene; its markers go with it.
pub fn delete_scene(conn: &Connection, id: SceneId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM scenes WHERE id = ?1", [id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}
