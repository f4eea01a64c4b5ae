use std::sync::Arc;
use std::time::Duration;

use moka::future::{Cache, CacheBuilder};

use super::{SpeechSynthesizer, TTSError, TTSResult, Voice};

/// Cached voices list shared by all dashboard users.
///
/// The provider list is the same for every caller, so a single entry is kept. Concurrent
/// misses share one upstream request; failures are returned to every waiter and not cached.
#[derive(Clone)]
pub struct VoiceCatalog {
    tts: Arc<dyn SpeechSynthesizer>,
    cache: Cache<(), Arc<Vec<Voice>>>,
}

impl VoiceCatalog {
    pub fn new(tts: Arc<dyn SpeechSynthesizer>, ttl: Duration) -> Self {
        let cache = CacheBuilder::new(1).time_to_live(ttl).build();
        Self { tts, cache }
    }

    /// Voices and whether they came from the cache
    pub async fn voices(&self) -> TTSResult<(Arc<Vec<Voice>>, bool)> {
        if let Some(voices) = self.cache.get(&()).await {
            return Ok((voices, true));
        }

        let tts = Arc::clone(&self.tts);
        let voices = self
            .cache
            .try_get_with((), async move {
                let voices = tts.list_voices().await?;
                tracing::info!(count = voices.len(), "Fetched voices from provider");
                Ok::<_, TTSError>(Arc::new(voices))
            })
            .await
            .map_err(unshare)?;
        Ok((voices, false))
    }
}

/// Recover an owned error from the one moka hands to every waiter
fn unshare(err: Arc<TTSError>) -> TTSError {
    Arc::try_unwrap(err).unwrap_or_else(|shared| match shared.as_ref() {
        TTSError::NotConfigured => TTSError::NotConfigured,
        TTSError::InvalidRequest(message) => TTSError::InvalidRequest(message.clone()),
        TTSError::Api { status, message } => TTSError::Api {
            status: *status,
            message: message.clone(),
        },
        TTSError::EmptyAudio => TTSError::EmptyAudio,
        TTSError::Http(e) => TTSError::Api {
            status: e.status().map_or(502, |s| s.as_u16()),
            message: e.to_string(),
        },
    })
}
