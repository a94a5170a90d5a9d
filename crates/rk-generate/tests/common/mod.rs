//! Shared harness for generation integration tests.
//!
//! [`TestHarness`] owns a scratch directory holding a file-backed database
//! and the generated artifact tree. Encoders are fakes that write a small
//! marker file to the requested output, so every property of the pipeline
//! can be checked without ffmpeg.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rk_av::{EncodeRequest, Encoder};
use rk_core::config::PathsConfig;
use rk_core::{ArtifactKind, Error, Result, SceneId};
use rk_db::models::{NewScene, Scene, SceneMarker};
use rk_db::pool::init_pool;
use rk_db::TxnManager;
use rk_generate::{ArtifactPaths, ArtifactStore, GenerateSettings, GenerationContext};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;

pub struct TestHarness {
    pub dir: TempDir,
    pub txn: TxnManager,
    pub store: ArtifactStore,
}

impl TestHarness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = init_pool(&dir.path().join("test.db")).expect("pool");
        let paths = PathsConfig {
            generated: dir.path().join("generated"),
        };
        Self {
            txn: TxnManager::new(pool),
            store: ArtifactStore::new(ArtifactPaths::from_config(&paths)),
            dir,
        }
    }

    pub fn context(&self, encoder: Arc<dyn Encoder>) -> GenerationContext {
        self.context_with(encoder, GenerateSettings::default())
    }

    pub fn context_with(
        &self,
        encoder: Arc<dyn Encoder>,
        settings: GenerateSettings,
    ) -> GenerationContext {
        GenerationContext::new(self.txn.clone(), self.store.clone(), encoder, settings)
    }

    /// Insert a scene with the given md5 checksum and markers at `offsets`.
    pub fn scene_with_markers(&self, checksum: &str, offsets: &[f64]) -> (Scene, Vec<SceneMarker>) {
        let checksum = (!checksum.is_empty()).then(|| checksum.to_string());
        self.txn
            .with_txn(|repo| {
                let scene = repo.scenes().create(&NewScene {
                    path: format!("/media/{}.mp4", SceneId::new()),
                    checksum,
                    ..Default::default()
                })?;
                let markers = offsets
                    .iter()
                    .enumerate()
                    .map(|(i, &secs)| repo.markers().create(scene.id, &format!("m{i}"), secs))
                    .collect::<Result<Vec<_>>>()?;
                Ok((scene, markers))
            })
            .expect("seed scene")
    }

    pub fn artifact_path(&self, hash: &str, offset: u64, kind: ArtifactKind) -> PathBuf {
        self.store
            .paths()
            .resolve(hash, offset, kind)
            .expect("valid hash")
    }

    pub fn read_artifact(&self, hash: &str, offset: u64, kind: ArtifactKind) -> Option<Vec<u8>> {
        std::fs::read(self.artifact_path(hash, offset, kind)).ok()
    }

    pub fn tmp_root(&self) -> &Path {
        self.store.paths().tmp_root()
    }
}

/// Contents a fake encoder writes for `request`.
pub fn artifact_bytes(request: &EncodeRequest) -> Vec<u8> {
    format!("{}@{}", request.kind, request.offset_secs).into_bytes()
}

/// Writes a small file per request and records every call.
#[derive(Default)]
pub struct FakeEncoder {
    calls: AtomicUsize,
    requests: Mutex<Vec<EncodeRequest>>,
    /// Requests matching these (offset, kind) pairs fail.
    fail_on: HashSet<(u64, ArtifactKind)>,
    /// Failing requests write half an artifact before failing.
    partial_write: bool,
    delay: Option<Duration>,
    /// Pause between writing the two halves of the output.
    split: Option<Duration>,
}

impl FakeEncoder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(pairs: &[(u64, ArtifactKind)], partial_write: bool) -> Arc<Self> {
        Arc::new(Self {
            fail_on: pairs.iter().copied().collect(),
            partial_write,
            ..Default::default()
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Default::default()
        })
    }

    pub fn split(pause: Duration) -> Arc<Self> {
        Arc::new(Self {
            split: Some(pause),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<EncodeRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn encode(&self, request: &EncodeRequest) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().expect("lock").push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_on.contains(&(request.offset_secs, request.kind)) {
            if self.partial_write {
                let bytes = artifact_bytes(request);
                tokio::fs::write(&request.output, &bytes[..bytes.len() / 2]).await?;
            }
            return Err(Error::tool("fake", format!("cannot encode {}", request.kind)));
        }

        let bytes = artifact_bytes(request);
        if let Some(pause) = self.split {
            let (head, tail) = bytes.split_at(bytes.len() / 2);
            tokio::fs::write(&request.output, head).await?;
            tokio::time::sleep(pause).await;
            let mut file = tokio::fs::OpenOptions::new()
                .append(true)
                .open(&request.output)
                .await?;
            file.write_all(tail).await?;
            file.flush().await?;
            return Ok(());
        }

        tokio::fs::write(&request.output, bytes).await?;
        Ok(())
    }
}

/// Tracks how many encodes run at once.
#[derive(Default)]
pub struct InFlightEncoder {
    current: AtomicUsize,
    pub peak: AtomicUsize,
}

#[async_trait]
impl Encoder for InFlightEncoder {
    async fn encode(&self, request: &EncodeRequest) -> Result<()> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        let result = tokio::fs::write(&request.output, artifact_bytes(request)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        result.map_err(Error::from)
    }
}

/// Panics on every request.
pub struct PanickingEncoder;

#[async_trait]
impl Encoder for PanickingEncoder {
    async fn encode(&self, _request: &EncodeRequest) -> Result<()> {
        panic!("encoder crashed")
    }
}
