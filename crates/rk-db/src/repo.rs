//! Per-entity repository facades handed out by transaction scopes.
//!
//! [`ReaderRepository`] only exposes lookups; [`Repository`] exposes the
//! full CRUD surface. Both borrow the scope's transaction, so nothing built
//! from them can outlive (or escape) the enclosing scope. Writer facades
//! deref to their reader counterpart.

use std::ops::Deref;

use rk_core::{Error, PerformerId, Result, SceneId, SceneMarkerId};
use rusqlite::Connection;

use crate::models::{
    NewPerformer, NewScene, Performer, PerformerPartial, Scene, SceneMarker, StashId,
};
use crate::queries::{markers, performers, scenes};

/// Read-only access to every entity within one transaction.
#[derive(Clone, Copy)]
pub struct ReaderRepository<'a> {
    conn: &'a Connection,
}

impl<'a> ReaderRepository<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn scenes(&self) -> SceneReader<'a> {
        SceneReader { conn: self.conn }
    }

    pub fn markers(&self) -> MarkerReader<'a> {
        MarkerReader { conn: self.conn }
    }

    pub fn performers(&self) -> PerformerReader<'a> {
        PerformerReader { conn: self.conn }
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &'a Connection {
        self.conn
    }
}

/// Read-write access to every entity within one transaction.
#[derive(Clone, Copy)]
pub struct Repository<'a> {
    conn: &'a Connection,
}

impl<'a> Repository<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn scenes(&self) -> SceneRepo<'a> {
        SceneRepo {
            reader: SceneReader { conn: self.conn },
        }
    }

    pub fn markers(&self) -> MarkerRepo<'a> {
        MarkerRepo {
            reader: MarkerReader { conn: self.conn },
        }
    }

    pub fn performers(&self) -> PerformerRepo<'a> {
        PerformerRepo {
            reader: PerformerReader { conn: self.conn },
        }
    }
}

// ---------------------------------------------------------------------------
// Scenes
// ---------------------------------------------------------------------------

pub struct SceneReader<'a> {
    conn: &'a Connection,
}

impl SceneReader<'_> {
    pub fn find(&self, id: SceneId) -> Result<Option<Scene>> {
        scenes::get_scene(self.conn, id)
    }

    /// Scenes that own at least one marker.
    pub fn with_markers(&self) -> Result<Vec<Scene>> {
        scenes::list_scenes_with_markers(self.conn)
    }
}

pub struct SceneRepo<'a> {
    reader: SceneReader<'a>,
}

impl<'a> Deref for SceneRepo<'a> {
    type Target = SceneReader<'a>;

    fn deref(&self) -> &Self::Target {
        &self.reader
    }
}

impl SceneRepo<'_> {
    pub fn create(&self, new: &NewScene) -> Result<Scene> {
        scenes::create_scene(self.reader.conn, new)
    }

    pub fn update_hashes(
        &self,
        id: SceneId,
        checksum: Option<&str>,
        oshash: Option<&str>,
    ) -> Result<Scene> {
        scenes::update_scene_hashes(self.reader.conn, id, checksum, oshash)
    }

    /// Delete a scene and, by cascade, its markers.
    pub fn destroy(&self, id: SceneId) -> Result<()> {
        if scenes::delete_scene(self.reader.conn, id)? {
            Ok(())
        } else {
            Err(Error::not_found("scene", id))
        }
    }
}

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

pub struct MarkerReader<'a> {
    conn: &'a Connection,
}

impl MarkerReader<'_> {
    pub fn find(&self, id: SceneMarkerId) -> Result<Option<SceneMarker>> {
        markers::get_marker(self.conn, id)
    }

    pub fn find_by_scene(&self, scene_id: SceneId) -> Result<Vec<SceneMarker>> {
        markers::list_markers_by_scene(self.conn, scene_id)
    }

    pub fn count(&self) -> Result<i64> {
        markers::count_markers(self.conn)
    }
}

pub struct MarkerRepo<'a> {
    reader: MarkerReader<'a>,
}

impl<'a> Deref for MarkerRepo<'a> {
    type Target = MarkerReader<'a>;

    fn deref(&self) -> &Self::Target {
        &self.reader
    }
}

impl MarkerRepo<'_> {
    pub fn create(&self, scene_id: SceneId, title: &str, seconds: f64) -> Result<SceneMarker> {
        markers::create_marker(self.reader.conn, scene_id, title, seconds)
    }

    pub fn destroy(&self, id: SceneMarkerId) -> Result<()> {
        if markers::delete_marker(self.reader.conn, id)? {
            Ok(())
        } else {
            Err(Error::not_found("scene marker", id))
        }
    }
}

// ---------------------------------------------------------------------------
// Performers
// ---------------------------------------------------------------------------

pub struct PerformerReader<'a> {
    conn: &'a Connection,
}

impl PerformerReader<'_> {
    pub fn find(&self, id: PerformerId) -> Result<Option<Performer>> {
        performers::get_performer(self.conn, id)
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<Performer>> {
        performers::get_performer_by_name(self.conn, name)
    }

    pub fn count(&self) -> Result<i64> {
        performers::count_performers(self.conn)
    }

    pub fn image(&self, id: PerformerId) -> Result<Option<Vec<u8>>> {
        performers::get_image(self.conn, id)
    }

    pub fn stash_ids(&self, id: PerformerId) -> Result<Vec<StashId>> {
        performers::get_stash_ids(self.conn, id)
    }
}

pub struct PerformerRepo<'a> {
    reader: PerformerReader<'a>,
}

impl<'a> Deref for PerformerRepo<'a> {
    type Target = PerformerReader<'a>;

    fn deref(&self) -> &Self::Target {
        &self.reader
    }
}

impl PerformerRepo<'_> {
    pub fn create(&self, new: &NewPerformer) -> Result<Performer> {
        performers::create_performer(self.reader.conn, new)
    }

    pub fn update(&self, partial: &PerformerPartial) -> Result<Performer> {
        performers::update_performer(self.reader.conn, partial)
    }

    pub fn destroy(&self, id: PerformerId) -> Result<()> {
        if performers::delete_performer(self.reader.conn, id)? {
            Ok(())
        } else {
            Err(Error::not_found("performer", id))
        }
    }

    pub fn update_image(&self, id: PerformerId, image: &[u8]) -> Result<()> {
        performers::update_image(self.reader.conn, id, image)
    }

    pub fn destroy_image(&self, id: PerformerId) -> Result<()> {
        performers::delete_image(self.reader.conn, id).map(|_| ())
    }

    pub fn update_stash_ids(&self, id: PerformerId, ids: &[StashId]) -> Result<()> {
        performers::update_stash_ids(self.reader.conn, id, ids)
    }
}
