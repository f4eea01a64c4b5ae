//! Object storage for synthesized segment audio
//!
//! Audio lives under `projects/{project_id}/segments/{segment_id}-{hash}.mp3` in an
//! [`ObjectStore`] chosen by configuration: in-memory, local filesystem or S3.

use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::{
    ObjectStore, PutPayload, aws::AmazonS3Builder, local::LocalFileSystem, memory::InMemory,
    path::Path as ObjectPath,
};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_128;

use crate::config::{AudioStorageConfig, AudioStorageKind};

#[derive(Debug, Error)]
pub enum AudioStoreError {
    #[error("audio storage misconfigured: {0}")]
    Config(String),

    #[error(transparent)]
    Backend(#[from] object_store::Error),

    #[error("local storage error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AudioStoreResult<T> = Result<T, AudioStoreError>;

/// Object key for one version of a segment's audio.
///
/// Keyed by [`audio_hash`], so writing a new version never touches the object a
/// segment currently references.
pub fn audio_key(project_id: &str, segment_id: &str, hash: &str) -> String {
    format!("projects/{project_id}/segments/{segment_id}-{hash}.mp3")
}

/// Fingerprint of the synthesis inputs. Identical inputs reuse stored audio.
pub fn audio_hash(voice_id: &str, language: &str, script: &str) -> String {
    let input = format!("{voice_id}|{language}|{script}");
    format!("{:032x}", xxh3_128(input.as_bytes()))
}

#[derive(Clone)]
pub struct AudioStore {
    inner: Arc<dyn ObjectStore>,
    backend: &'static str,
}

impl std::fmt::Debug for AudioStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioStore")
            .field("backend", &self.backend)
            .finish()
    }
}

impl AudioStore {
    pub fn from_config(config: &AudioStorageConfig) -> AudioStoreResult<Self> {
        match config.kind {
            AudioStorageKind::Memory => Ok(Self::in_memory()),
            AudioStorageKind::Local => {
                let path = config.local_path.as_ref().ok_or_else(|| {
                    AudioStoreError::Config("local storage requires a path".to_string())
                })?;
                std::fs::create_dir_all(path)?;
                let fs = LocalFileSystem::new_with_prefix(path)?;
                Ok(Self {
                    inner: Arc::new(fs),
                    backend: "local",
                })
            }
            AudioStorageKind::S3 => {
                let bucket = config.s3_bucket.as_ref().ok_or_else(|| {
                    AudioStoreError::Config("s3 storage requires a bucket".to_string())
                })?;
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
                if let Some(region) = &config.s3_region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = &config.s3_endpoint {
                    builder = builder.with_endpoint(endpoint).with_allow_http(true);
                }
                if let (Some(key), Some(secret)) = (&config.s3_access_key, &config.s3_secret_key)
                {
                    builder = builder
                        .with_access_key_id(key)
                        .with_secret_access_key(secret);
                }
                Ok(Self {
                    inner: Arc::new(builder.build()?),
                    backend: "s3",
                })
            }
        }
    }

    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(InMemory::new()),
            backend: "memory",
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend
    }

    pub async fn put(&self, key: &str, audio: Bytes) -> AudioStoreResult<()> {
        let size = audio.len();
        self.inner
            .put(&ObjectPath::from(key), PutPayload::from(audio))
            .await?;
        tracing::debug!(key, size, backend = self.backend, "Stored audio");
        Ok(())
    }

    /// Fetch stored audio, `None` when the key does not exist
    pub async fn get(&self, key: &str) -> AudioStoreResult<Option<Bytes>> {
        match self.inner.get(&ObjectPath::from(key)).await {
            Ok(result) => Ok(Some(result.bytes().await?)),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete(&self, key: &str) -> AudioStoreResult<()> {
        match self.inner.delete(&ObjectPath::from(key)).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every audio object of a project; returns how many were deleted
    pub async fn delete_project(&self, project_id: &str) -> AudioStoreResult<usize> {
        let prefix = ObjectPath::from(format!("projects/{project_id}"));
        let objects: Vec<_> = self.inner.list(Some(&prefix)).try_collect().await?;

        let mut deleted = 0;
        for meta in objects {
            match self.inner.delete(&meta.location).await {
                Ok(()) => deleted += 1,
                Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        if deleted > 0 {
            tracing::info!(project_id, deleted, "Removed project audio");
        }
        Ok(deleted)
    }
}
