//! Marker artifact generation for one scene or one marker.
//!
//! A [`GenerationTask`] loads its scene and markers in a read-only
//! transaction, then walks every (marker, kind) pair. Markers that fall in
//! the same whole second map to the same files and are handled once. Each
//! pair ends in its
//! own [`ArtifactStatus`]; a failed encode or placement never stops the
//! remaining pairs. Only a metadata failure (missing scene or marker, lookup
//! error, no usable content hash) aborts the task, before anything is
//! written.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rk_av::{EncodeRequest, Encoder};
use rk_core::config::GenerateConfig;
use rk_core::{ArtifactKind, Error, HashAlgorithm, Result, SceneId, SceneMarkerId};
use rk_db::models::Scene;
use rk_db::TxnManager;
use serde::Serialize;

use crate::store::ArtifactStore;

/// Encoding parameters shared by every task.
#[derive(Debug, Clone)]
pub struct GenerateSettings {
    pub width: u32,
    pub hash_algorithm: HashAlgorithm,
    pub encode_timeout: Duration,
}

impl Default for GenerateSettings {
    fn default() -> Self {
        Self::from_config(&GenerateConfig::default())
    }
}

impl GenerateSettings {
    pub fn from_config(cfg: &GenerateConfig) -> Self {
        Self {
            width: cfg.marker_width,
            hash_algorithm: cfg.hash_algorithm,
            encode_timeout: cfg.encode_timeout(),
        }
    }
}

/// Everything a task needs besides its target. Cheap to clone.
#[derive(Clone)]
pub struct GenerationContext {
    pub txn: TxnManager,
    pub store: ArtifactStore,
    pub encoder: Arc<dyn Encoder>,
    pub settings: GenerateSettings,
}

impl GenerationContext {
    pub fn new(
        txn: TxnManager,
        store: ArtifactStore,
        encoder: Arc<dyn Encoder>,
        settings: GenerateSettings,
    ) -> Self {
        Self {
            txn,
            store,
            encoder,
            settings,
        }
    }
}

/// What a task generates artifacts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum GenerationTarget {
    /// Every marker of the scene.
    Scene(SceneId),
    /// One marker, within its owning scene.
    Marker(SceneMarkerId),
}

impl fmt::Display for GenerationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scene(id) => write!(f, "scene {id}"),
            Self::Marker(id) => write!(f, "marker {id}"),
        }
    }
}

/// Result of one (marker, kind) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum ArtifactStatus {
    /// Already present and overwrite was off; nothing was done.
    Skipped,
    /// Encoded and placed at its canonical path.
    Generated,
    /// Encoding or placement failed; the canonical path is unchanged.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactOutcome {
    pub kind: ArtifactKind,
    pub status: ArtifactStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkerReport {
    pub marker_id: SceneMarkerId,
    pub offset_secs: u64,
    pub outcomes: Vec<ArtifactOutcome>,
}

impl MarkerReport {
    /// Status of `kind` for this marker.
    pub fn status(&self, kind: ArtifactKind) -> Option<&ArtifactStatus> {
        self.outcomes
            .iter()
            .find(|o| o.kind == kind)
            .map(|o| &o.status)
    }
}

/// Everything a task did, per marker and kind.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub target: GenerationTarget,
    pub markers: Vec<MarkerReport>,
    /// Set when the task was aborted before any artifact work.
    pub error: Option<String>,
}

impl TaskReport {
    fn new(target: GenerationTarget) -> Self {
        Self {
            target,
            markers: Vec::new(),
            error: None,
        }
    }

    fn aborted(target: GenerationTarget, error: &Error) -> Self {
        Self {
            target,
            markers: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.error.is_some()
    }

    fn count(&self, pred: impl Fn(&ArtifactStatus) -> bool) -> usize {
        self.markers
            .iter()
            .flat_map(|m| &m.outcomes)
            .filter(|o| pred(&o.status))
            .count()
    }

    pub fn generated(&self) -> usize {
        self.count(|s| matches!(s, ArtifactStatus::Generated))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, ArtifactStatus::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ArtifactStatus::Failed(_)))
    }

    /// Pairs the encoder was asked to produce.
    pub fn attempted(&self) -> usize {
        self.generated() + self.failed()
    }
}

/// A (marker, offset) pair and the kinds it still needs.
struct PlannedMarker {
    marker_id: SceneMarkerId,
    offset_secs: u64,
    pending: Vec<ArtifactKind>,
}

/// Everything a task will do, decided before any encoding starts.
struct Plan {
    scene: Scene,
    hash: String,
    markers: Vec<PlannedMarker>,
}

impl Plan {
    fn outstanding(&self) -> usize {
        self.markers.iter().map(|m| m.pending.len()).sum()
    }
}

/// Generation of the missing artifacts of one scene or marker.
#[derive(Clone)]
pub struct GenerationTask {
    ctx: GenerationContext,
    target: GenerationTarget,
    overwrite: bool,
}

impl GenerationTask {
    pub fn new(ctx: GenerationContext, target: GenerationTarget, overwrite: bool) -> Self {
        Self {
            ctx,
            target,
            overwrite,
        }
    }

    pub fn target(&self) -> GenerationTarget {
        self.target
    }

    /// Number of (marker, kind) pairs [`run`](Self::run) would encode right
    /// now. A task whose metadata cannot be loaded counts as zero.
    pub async fn outstanding(&self) -> usize {
        match self.plan().await {
            Ok(plan) => plan.outstanding(),
            Err(e) => {
                tracing::debug!(task = %self.target, error = %e, "[generator] nothing outstanding");
                0
            }
        }
    }

    /// Generate every pending artifact of the target.
    pub async fn run(&self) -> TaskReport {
        let plan = match self.plan().await {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!(task = %self.target, error = %e, "[generator] aborting task");
                return TaskReport::aborted(self.target, &e);
            }
        };

        let mut report = TaskReport::new(self.target);
        for marker in &plan.markers {
            report
                .markers
                .push(self.generate_marker(&plan.scene, &plan.hash, marker).await);
        }
        report
    }

    /// Database reads and existence checks block, so planning runs on the
    /// blocking pool. `run` and `outstanding` share it.
    async fn plan(&self) -> Result<Plan> {
        let task = self.clone();
        tokio::task::spawn_blocking(move || task.plan_blocking())
            .await
            .map_err(|e| Error::Internal(format!("spawn_blocking join error: {e}")))?
    }

    fn plan_blocking(&self) -> Result<Plan> {
        let (scene, markers) = self.ctx.txn.with_read_txn(|repo| match self.target {
            GenerationTarget::Scene(scene_id) => {
                let scene = repo
                    .scenes()
                    .find(scene_id)?
                    .ok_or_else(|| Error::not_found("scene", scene_id))?;
                let markers = repo.markers().find_by_scene(scene_id)?;
                Ok((scene, markers))
            }
            GenerationTarget::Marker(marker_id) => {
                let marker = repo
                    .markers()
                    .find(marker_id)?
                    .ok_or_else(|| Error::not_found("scene marker", marker_id))?;
                let scene = repo
                    .scenes()
                    .find(marker.scene_id)?
                    .ok_or_else(|| Error::not_found("scene", marker.scene_id))?;
                Ok((scene, vec![marker]))
            }
        })?;

        let algorithm = self.ctx.settings.hash_algorithm;
        let hash = scene
            .hash(algorithm)
            .ok_or_else(|| {
                Error::generation("hash", format!("scene {} has no {algorithm} hash", scene.id))
            })?
            .to_string();

        // Markers within the same second share artifact files; the first one
        // owns them.
        let mut seen = HashSet::new();
        let markers = markers
            .into_iter()
            .filter(|m| {
                let first = seen.insert(m.whole_seconds());
                if !first {
                    tracing::debug!(
                        marker_id = %m.id,
                        offset = m.whole_seconds(),
                        "[generator] marker shares its second with an earlier one"
                    );
                }
                first
            })
            .map(|m| PlannedMarker {
                marker_id: m.id,
                offset_secs: m.whole_seconds(),
                pending: self.pending_kinds(&hash, m.whole_seconds()),
            })
            .collect();

        Ok(Plan {
            scene,
            hash,
            markers,
        })
    }

    /// Kinds of the (hash, offset) pair that need encoding under the current
    /// overwrite flag.
    fn pending_kinds(&self, hash: &str, offset_secs: u64) -> Vec<ArtifactKind> {
        ArtifactKind::ALL
            .into_iter()
            .filter(|&kind| self.overwrite || !self.ctx.store.exists(hash, offset_secs, kind))
            .collect()
    }

    async fn generate_marker(&self, scene: &Scene, hash: &str, marker: &PlannedMarker) -> MarkerReport {
        let mut outcomes = Vec::with_capacity(ArtifactKind::ALL.len());
        for kind in ArtifactKind::ALL {
            let status = if marker.pending.contains(&kind) {
                self.generate_artifact(scene, hash, marker.offset_secs, kind)
                    .await
            } else {
                ArtifactStatus::Skipped
            };
            outcomes.push(ArtifactOutcome { kind, status });
        }

        MarkerReport {
            marker_id: marker.marker_id,
            offset_secs: marker.offset_secs,
            outcomes,
        }
    }

    async fn generate_artifact(
        &self,
        scene: &Scene,
        hash: &str,
        offset_secs: u64,
        kind: ArtifactKind,
    ) -> ArtifactStatus {
        match self.encode_and_place(scene, hash, offset_secs, kind).await {
            Ok(()) => {
                tracing::info!(
                    scene_id = %scene.id,
                    offset = offset_secs,
                    %kind,
                    "[generator] marker artifact generated"
                );
                ArtifactStatus::Generated
            }
            Err(e) => {
                tracing::error!(
                    scene_id = %scene.id,
                    offset = offset_secs,
                    %kind,
                    error = %e,
                    "[generator] marker artifact failed"
                );
                ArtifactStatus::Failed(e.to_string())
            }
        }
    }

    async fn encode_and_place(
        &self,
        scene: &Scene,
        hash: &str,
        offset_secs: u64,
        kind: ArtifactKind,
    ) -> Result<()> {
        let store = &self.ctx.store;
        let (final_path, temp_path) = match (
            store.paths().resolve(hash, offset_secs, kind),
            store.paths().temp_path(hash, offset_secs, kind),
        ) {
            (Some(final_path), Some(temp_path)) => (final_path, temp_path),
            _ => {
                return Err(Error::generation(
                    "resolve",
                    format!("no artifact location for hash {hash:?}"),
                ))
            }
        };

        store.prepare_temp_dir().await?;

        let request = EncodeRequest {
            source: scene.path.clone().into(),
            offset_secs,
            kind,
            width: self.ctx.settings.width,
            output: temp_path.clone(),
        };

        let timeout = self.ctx.settings.encode_timeout;
        let encoded = match tokio::time::timeout(timeout, self.ctx.encoder.encode(&request)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(Error::tool("encoder", format!("timed out after {timeout:?}"))),
        };
        if let Err(e) = encoded {
            // Whatever the encoder left behind is not a usable artifact.
            if let Err(rm_err) = tokio::fs::remove_file(&temp_path).await {
                if rm_err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %temp_path.display(), error = %rm_err, "Failed to remove partial output");
                }
            }
            return Err(e);
        }

        store.place_atomically(&temp_path, &final_path).await
    }
}
