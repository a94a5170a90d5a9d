//! Scene marker CRUD operations.

use chrono::Utc;
use rk_core::{Error, Result, SceneId, SceneMarkerId};
use rusqlite::{Connection, OptionalExtension};

use crate::models::SceneMarker;

const COLS: &str = "id, scene_id, title, seconds, created_at, updated_at";

/// Create a marker at `seconds` within a scene.
pub fn create_marker(
    conn: &Connection,
    scene_id: SceneId,
    title: &str,
    seconds: f64,
) -> Result<SceneMarker> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(Error::Validation(format!(
            "marker offset must be a non-negative number, got {seconds}"
        )));
    }

    let id = SceneMarkerId::new();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO scene_markers (id, scene_id, title, seconds, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        rusqlite::params![id.to_string(), scene_id.to_string(), title, seconds, &now],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(SceneMarker {
        id,
        scene_id,
        title: title.to_string(),
        seconds,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Get a marker by ID.
pub fn get_marker(conn: &Connection, id: SceneMarkerId) -> Result<Option<SceneMarker>> {
    let q = format!("SELECT {COLS} FROM scene_markers WHERE id = ?1");
    conn.query_row(&q, [id.to_string()], SceneMarker::from_row)
        .optional()
        .map_err(|e| Error::database(e.to_string()))
}

/// List a scene's markers ordered by offset.
pub fn list_markers_by_scene(conn: &Connection, scene_id: SceneId) -> Result<Vec<SceneMarker>> {
    let q = format!("SELECT {COLS} FROM scene_markers WHERE scene_id = ?1 ORDER BY seconds ASC");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([scene_id.to_string()], SceneMarker::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Total number of markers.
pub fn count_markers(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM scene_markers", [], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))
}

/// Delete a marker by ID.
pub fn delete_marker(conn: &Connection, id: SceneMarkerId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM scene_markers WHERE id = ?1", [id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}
