//! Performer CRUD plus the dependent image and stash-id tables.

use chrono::Utc;
use rk_core::{Error, Patch, PerformerId, Result};
use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension};

use crate::models::{NewPerformer, Performer, PerformerPartial, StashId};

const COLS: &str = "id, checksum, name, url, gender, birthdate, ethnicity, country,
    eye_color, height, measurements, fake_tits, career_length, tattoos, piercings,
    aliases, twitter, instagram, favorite, created_at, updated_at";

/// Create a new performer row.
pub fn create_performer(conn: &Connection, new: &NewPerformer) -> Result<Performer> {
    let id = PerformerId::new();
    let now = Utc::now().to_rfc3339();
    let d = &new.details;

    conn.execute(
        "INSERT INTO performers (id, checksum, name, url, gender, birthdate, ethnicity,
            country, eye_color, height, measurements, fake_tits, career_length, tattoos,
            piercings, aliases, twitter, instagram, favorite, created_at, updated_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?20)",
        rusqlite::params![
            id.to_string(),
            new.checksum,
            new.name,
            d.url,
            d.gender.map(|g| g.as_str()),
            d.birthdate,
            d.ethnicity,
            d.country,
            d.eye_color,
            d.height,
            d.measurements,
            d.fake_tits,
            d.career_length,
            d.tattoos,
            d.piercings,
            d.aliases,
            d.twitter,
            d.instagram,
            new.favorite,
            &now,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Performer {
        id,
        checksum: new.checksum.clone(),
        name: new.name.clone(),
        url: d.url.clone(),
        gender: d.gender,
        birthdate: d.birthdate.clone(),
        ethnicity: d.ethnicity.clone(),
        country: d.country.clone(),
        eye_color: d.eye_color.clone(),
        height: d.height.clone(),
        measurements: d.measurements.clone(),
        fake_tits: d.fake_tits.clone(),
        career_length: d.career_length.clone(),
        tattoos: d.tattoos.clone(),
        piercings: d.piercings.clone(),
        aliases: d.aliases.clone(),
        twitter: d.twitter.clone(),
        instagram: d.instagram.clone(),
        favorite: new.favorite,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Get a performer by ID.
pub fn get_performer(conn: &Connection, id: PerformerId) -> Result<Option<Performer>> {
    let q = format!("SELECT {COLS} FROM performers WHERE id = ?1");
    conn.query_row(&q, [id.to_string()], Performer::from_row)
        .optional()
        .map_err(|e| Error::database(e.to_string()))
}

/// Get a performer by exact name.
pub fn get_performer_by_name(conn: &Connection, name: &str) -> Result<Option<Performer>> {
    let q = format!("SELECT {COLS} FROM performers WHERE name = ?1 LIMIT 1");
    conn.query_row(&q, [name], Performer::from_row)
        .optional()
        .map_err(|e| Error::database(e.to_string()))
}

/// Total number of performers.
pub fn count_performers(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM performers", [], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))
}

/// Accumulates `col = ?` assignments for a partial UPDATE.
#[derive(Default)]
struct Assignments {
    cols: Vec<&'static str>,
    values: Vec<Box<dyn ToSql>>,
}

impl Assignments {
    fn set<T: ToSql + 'static>(&mut self, col: &'static str, value: T) {
        self.cols.push(col);
        self.values.push(Box::new(value));
    }

    fn patch<T: ToSql + 'static>(&mut self, col: &'static str, patch: Patch<T>) {
        if let Some(value) = patch.into_update() {
            self.set(col, value);
        }
    }
}

/// Apply a partial update. Columns whose patch is unset are left alone;
/// `updated_at` is always bumped.
pub fn update_performer(conn: &Connection, partial: &PerformerPartial) -> Result<Performer> {
    let mut a = Assignments::default();
    let d = partial.details.clone();

    if let Some((name, checksum)) = &partial.name {
        a.set("name", name.clone());
        a.set("checksum", checksum.clone());
    }
    a.patch("url", d.url);
    a.patch("gender", d.gender.map(|g| g.as_str().to_string()));
    a.patch("birthdate", d.birthdate);
    a.patch("ethnicity", d.ethnicity);
    a.patch("country", d.country);
    a.patch("eye_color", d.eye_color);
    a.patch("height", d.height);
    a.patch("measurements", d.measurements);
    a.patch("fake_tits", d.fake_tits);
    a.patch("career_length", d.career_length);
    a.patch("tattoos", d.tattoos);
    a.patch("piercings", d.piercings);
    a.patch("aliases", d.aliases);
    a.patch("twitter", d.twitter);
    a.patch("instagram", d.instagram);
    // A cleared favorite flag means "not a favorite"; the column is NOT NULL.
    if let Some(favorite) = partial.favorite.clone().into_update() {
        a.set("favorite", favorite.unwrap_or(false));
    }
    a.set("updated_at", Utc::now().to_rfc3339());

    let set_clause = a
        .cols
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{col} = ?{}", i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let q = format!(
        "UPDATE performers SET {set_clause} WHERE id = ?{}",
        a.cols.len() + 1
    );

    a.values.push(Box::new(partial.id.to_string()));
    let params: Vec<&dyn ToSql> = a.values.iter().map(|b| b.as_ref()).collect();

    let n = conn
        .execute(&q, params.as_slice())
        .map_err(|e| Error::database(e.to_string()))?;
    if n == 0 {
        return Err(Error::not_found("performer", partial.id));
    }

    get_performer(conn, partial.id)?.ok_or_else(|| Error::not_found("performer", partial.id))
}

/// Delete a performer by ID. Image and stash-id rows cascade.
pub fn delete_performer(conn: &Connection, id: PerformerId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM performers WHERE id = ?1", [id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Get a performer's image blob.
pub fn get_image(conn: &Connection, id: PerformerId) -> Result<Option<Vec<u8>>> {
    conn.query_row(
        "SELECT image FROM performers_image WHERE performer_id = ?1",
        [id.to_string()],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Insert or replace a performer's image blob.
pub fn update_image(conn: &Connection, id: PerformerId, image: &[u8]) -> Result<()> {
    conn.execute(
        "INSERT INTO performers_image (performer_id, image) VALUES (?1, ?2)
         ON CONFLICT(performer_id) DO UPDATE SET image = excluded.image",
        rusqlite::params![id.to_string(), image],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// Remove a performer's image, if any.
pub fn delete_image(conn: &Connection, id: PerformerId) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM performers_image WHERE performer_id = ?1",
            [id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// List a performer's external identifiers ordered by endpoint.
pub fn get_stash_ids(conn: &Connection, id: PerformerId) -> Result<Vec<StashId>> {
    let mut stmt = conn
        .prepare(
            "SELECT endpoint, stash_id FROM performer_stash_ids
             WHERE performer_id = ?1 ORDER BY endpoint",
        )
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([id.to_string()], StashId::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Replace the full set of external identifiers for a performer.
pub fn update_stash_ids(conn: &Connection, id: PerformerId, ids: &[StashId]) -> Result<()> {
    conn.execute(
        "DELETE FROM performer_stash_ids WHERE performer_id = ?1",
        [id.to_string()],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    let mut stmt = conn
        .prepare(
            "INSERT INTO performer_stash_ids (performer_id, endpoint, stash_id)
             VALUES (?1, ?2, ?3)",
        )
        .map_err(|e| Error::database(e.to_string()))?;
    for link in ids {
        stmt.execute(rusqlite::params![id.to_string(), link.endpoint, link.stash_id])
            .map_err(|e| Error::database(e.to_string()))?;
    }
    Ok(())
}
