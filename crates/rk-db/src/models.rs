//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`. Input shapes (`New*`, `*Partial`) live beside the row
//! they write.

use rk_core::{Gender, HashAlgorithm, Patch, PerformerId, SceneId, SceneMarkerId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

/// Parse a UUID-based ID from a text column.
fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(T::from(uuid))
}

fn parse_opt_gender(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<Gender>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|v| {
        v.parse::<Gender>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    })
    .transpose()
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Scene {
    pub id: SceneId,
    pub path: String,
    pub checksum: Option<String>,
    pub oshash: Option<String>,
    pub title: Option<String>,
    pub duration_secs: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl Scene {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            path: row.get(1)?,
            checksum: row.get(2)?,
            oshash: row.get(3)?,
            title: row.get(4)?,
            duration_secs: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    /// The content hash selected by `algorithm`, or `None` when that hash
    /// has not been computed (or is empty).
    pub fn hash(&self, algorithm: HashAlgorithm) -> Option<&str> {
        let hash = match algorithm {
            HashAlgorithm::Md5 => self.checksum.as_deref(),
            HashAlgorithm::Oshash => self.oshash.as_deref(),
        };
        hash.filter(|h| !h.is_empty())
    }
}

/// Insert shape for [`Scene`].
#[derive(Debug, Clone, Default)]
pub struct NewScene {
    pub path: String,
    pub checksum: Option<String>,
    pub oshash: Option<String>,
    pub title: Option<String>,
    pub duration_secs: Option<f64>,
}

// ---------------------------------------------------------------------------
// SceneMarker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SceneMarker {
    pub id: SceneMarkerId,
    pub scene_id: SceneId,
    pub title: String,
    pub seconds: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl SceneMarker {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            scene_id: parse_id(row, 1)?,
            title: row.get(2)?,
            seconds: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    /// Offset truncated to whole seconds; this is what artifact paths use.
    pub fn whole_seconds(&self) -> u64 {
        if self.seconds.is_finite() && self.seconds > 0.0 {
            self.seconds.trunc() as u64
        } else {
            0
        }
    }
}

// ---------------------------------------------------------------------------
// Performer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Performer {
    pub id: PerformerId,
    pub checksum: String,
    pub name: String,
    pub url: Option<String>,
    pub gender: Option<Gender>,
    pub birthdate: Option<String>,
    pub ethnicity: Option<String>,
    pub country: Option<String>,
    pub eye_color: Option<String>,
    pub height: Option<String>,
    pub measurements: Option<String>,
    pub fake_tits: Option<String>,
    pub career_length: Option<String>,
    pub tattoos: Option<String>,
    pub piercings: Option<String>,
    pub aliases: Option<String>,
    pub twitter: Option<String>,
    pub instagram: Option<String>,
    pub favorite: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Performer {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            checksum: row.get(1)?,
            name: row.get(2)?,
            url: row.get(3)?,
            gender: parse_opt_gender(row, 4)?,
            birthdate: row.get(5)?,
            ethnicity: row.get(6)?,
            country: row.get(7)?,
            eye_color: row.get(8)?,
            height: row.get(9)?,
            measurements: row.get(10)?,
            fake_tits: row.get(11)?,
            career_length: row.get(12)?,
            tattoos: row.get(13)?,
            piercings: row.get(14)?,
            aliases: row.get(15)?,
            twitter: row.get(16)?,
            instagram: row.get(17)?,
            favorite: row.get(18)?,
            created_at: row.get(19)?,
            updated_at: row.get(20)?,
        })
    }
}

/// Descriptive performer attributes, all optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformerDetails {
    pub url: Option<String>,
    pub gender: Option<Gender>,
    pub birthdate: Option<String>,
    pub ethnicity: Option<String>,
    pub country: Option<String>,
    pub eye_color: Option<String>,
    pub height: Option<String>,
    pub measurements: Option<String>,
    pub fake_tits: Option<String>,
    pub career_length: Option<String>,
    pub tattoos: Option<String>,
    pub piercings: Option<String>,
    pub aliases: Option<String>,
    pub twitter: Option<String>,
    pub instagram: Option<String>,
}

/// Insert shape for [`Performer`]. The checksum must already be derived
/// from `name`.
#[derive(Debug, Clone)]
pub struct NewPerformer {
    pub name: String,
    pub checksum: String,
    pub details: PerformerDetails,
    pub favorite: bool,
}

/// Tri-state changes to the descriptive attributes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PerformerDetailsPatch {
    pub url: Patch<String>,
    pub gender: Patch<Gender>,
    pub birthdate: Patch<String>,
    pub ethnicity: Patch<String>,
    pub country: Patch<String>,
    pub eye_color: Patch<String>,
    pub height: Patch<String>,
    pub measurements: Patch<String>,
    pub fake_tits: Patch<String>,
    pub career_length: Patch<String>,
    pub tattoos: Patch<String>,
    pub piercings: Patch<String>,
    pub aliases: Patch<String>,
    pub twitter: Patch<String>,
    pub instagram: Patch<String>,
}

/// Update shape for [`Performer`]. `name` and `checksum` travel together.
#[derive(Debug, Clone)]
pub struct PerformerPartial {
    pub id: PerformerId,
    pub name: Option<(String, String)>,
    pub details: PerformerDetailsPatch,
    pub favorite: Patch<bool>,
}

/// Link between a performer and an identifier in an external system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashId {
    pub endpoint: String,
    pub stash_id: String,
}

impl StashId {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            endpoint: row.get(0)?,
            stash_id: row.get(1)?,
        })
    }
}
