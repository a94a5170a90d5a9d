//! Multi-entity performer mutations.
//!
//! Each operation runs as exactly one [`TxnManager::with_txn`] scope, so the
//! performer row, its image row and its stash-id links always reflect the
//! same input. Input decoding (base64 images, checksums) happens before the
//! scope opens; a bad payload writes nothing.

use rk_core::checksum::{decode_base64_image, md5_from_string};
use rk_core::{Error, Patch, PerformerId, Result};
use serde::Deserialize;

use crate::models::{
    NewPerformer, Performer, PerformerDetails, PerformerDetailsPatch, PerformerPartial, StashId,
};
use crate::txn::TxnManager;

/// Input for [`create_performer`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PerformerCreateInput {
    pub name: String,
    #[serde(flatten)]
    pub details: PerformerDetails,
    pub favorite: Option<bool>,
    /// Base64 image, bare or as a `data:` URI.
    pub image: Option<String>,
    pub stash_ids: Option<Vec<StashId>>,
}

/// Change set for [`update_performer`].
///
/// Every optional attribute is a [`Patch`]: unset fields are left alone,
/// cleared fields are nulled. A cleared `image` removes the stored image;
/// cleared `stash_ids` removes every link.
#[derive(Debug, Clone, Deserialize)]
pub struct PerformerUpdateInput {
    pub id: PerformerId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub details: PerformerDetailsPatch,
    #[serde(default)]
    pub favorite: Patch<bool>,
    #[serde(default)]
    pub image: Patch<String>,
    #[serde(default)]
    pub stash_ids: Patch<Vec<StashId>>,
}

impl PerformerUpdateInput {
    /// A change set that touches nothing but `updated_at`.
    pub fn new(id: PerformerId) -> Self {
        Self {
            id,
            name: None,
            details: PerformerDetailsPatch::default(),
            favorite: Patch::Unset,
            image: Patch::Unset,
            stash_ids: Patch::Unset,
        }
    }
}

/// Decode an optional base64 image; empty payloads count as "no image".
fn decode_image(image: Option<&str>) -> Result<Option<Vec<u8>>> {
    match image {
        Some(s) if !s.trim().is_empty() => {
            let (_, data) = decode_base64_image(s)?;
            Ok((!data.is_empty()).then_some(data))
        }
        _ => Ok(None),
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation("performer name must not be empty".into()));
    }
    Ok(())
}

/// Create a performer together with its image and stash-id links.
pub fn create_performer(txn: &TxnManager, input: PerformerCreateInput) -> Result<Performer> {
    validate_name(&input.name)?;
    let image = decode_image(input.image.as_deref())?;

    let new = NewPerformer {
        checksum: md5_from_string(&input.name),
        name: input.name,
        details: input.details,
        favorite: input.favorite.unwrap_or(false),
    };
    let stash_ids = input.stash_ids;

    let performer = txn.with_txn(|repo| {
        let performers = repo.performers();
        let performer = performers.create(&new)?;

        if let Some(data) = &image {
            performers.update_image(performer.id, data)?;
        }
        if let Some(ids) = &stash_ids {
            performers.update_stash_ids(performer.id, ids)?;
        }

        Ok(performer)
    })?;

    tracing::info!(performer_id = %performer.id, name = %performer.name, "Created performer");
    Ok(performer)
}

/// Apply a change set to a performer and its dependents.
pub fn update_performer(txn: &TxnManager, input: PerformerUpdateInput) -> Result<Performer> {
    if let Some(name) = &input.name {
        validate_name(name)?;
    }

    // Set(image) with an empty payload behaves like Clear.
    let image = match &input.image {
        Patch::Unset => Patch::Unset,
        Patch::Clear => Patch::Clear,
        Patch::Set(s) => match decode_image(Some(s))? {
            Some(data) => Patch::Set(data),
            None => Patch::Clear,
        },
    };

    let partial = PerformerPartial {
        id: input.id,
        // The checksum is always recomputed alongside a name change.
        name: input.name.map(|name| {
            let checksum = md5_from_string(&name);
            (name, checksum)
        }),
        details: input.details,
        favorite: input.favorite,
    };
    let stash_ids = input.stash_ids;

    let performer = txn.with_txn(|repo| {
        let performers = repo.performers();
        let performer = performers.update(&partial)?;

        match &image {
            Patch::Set(data) => performers.update_image(performer.id, data)?,
            Patch::Clear => performers.destroy_image(performer.id)?,
            Patch::Unset => {}
        }

        match &stash_ids {
            Patch::Set(ids) => performers.update_stash_ids(performer.id, ids)?,
            Patch::Clear => performers.update_stash_ids(performer.id, &[])?,
            Patch::Unset => {}
        }

        Ok(performer)
    })?;

    tracing::info!(performer_id = %performer.id, "Updated performer");
    Ok(performer)
}

/// Delete one performer. Dependent rows go with it.
pub fn destroy_performer(txn: &TxnManager, id: PerformerId) -> Result<()> {
    txn.with_txn(|repo| repo.performers().destroy(id))?;
    tracing::info!(performer_id = %id, "Destroyed performer");
    Ok(())
}

/// Delete several performers; if any is missing, none are deleted.
pub fn destroy_performers(txn: &TxnManager, ids: &[PerformerId]) -> Result<()> {
    txn.with_txn(|repo| {
        let performers = repo.performers();
        for id in ids {
            performers.destroy(*id)?;
        }
        Ok(())
    })?;
    tracing::info!(count = ids.len(), "Destroyed performers");
    Ok(())
}
