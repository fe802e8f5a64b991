//! Memoizing wrapper around a [WellboreProvider].

use crate::error::WellboreError;
use crate::models::{DrilledWellboreMetadata, SmdaAddress, Trajectory};
use crate::provider::WellboreProvider;

use async_trait::async_trait;
use cached::{Cached, TimedSizedCache};
use tokio::sync::Mutex;

/// Default number of entries kept per query kind
pub const DEFAULT_CACHE_SIZE: usize = 256;

/// Default lifetime of an entry, in seconds
pub const DEFAULT_CACHE_LIFESPAN: u64 = 600;

/// Caches metadata and trajectory results of an inner provider, keyed by API and arguments.
///
/// Errors are not cached.
pub struct CachedProvider<P> {
    inner: P,
    metadata: Mutex<TimedSizedCache<String, Option<DrilledWellboreMetadata>>>,
    trajectories: Mutex<TimedSizedCache<String, Option<Trajectory>>>,
}

impl<P: WellboreProvider> CachedProvider<P> {
    /// # Arguments
    ///
    /// * `inner`: Provider to cache
    /// * `size`: Maximum number of entries per query kind
    /// * `lifespan`: Lifetime of an entry in seconds
    pub fn new(inner: P, size: usize, lifespan: u64) -> Self {
        Self {
            inner,
            metadata: Mutex::new(TimedSizedCache::with_size_and_lifespan(size, lifespan)),
            trajectories: Mutex::new(TimedSizedCache::with_size_and_lifespan(size, lifespan)),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: WellboreProvider> WellboreProvider for CachedProvider<P> {
    fn provider_id(&self) -> &str {
        self.inner.provider_id()
    }

    async fn drilled_wellbore_metadata(
        &self,
        smda: &SmdaAddress,
        field: Option<&str>,
        license: Option<&str>,
    ) -> Result<Option<DrilledWellboreMetadata>, WellboreError> {
        let key = format!("{}|{:?}|{:?}", smda.api, field, license);
        if let Some(hit) = self.metadata.lock().await.cache_get(&key) {
            tracing::debug!("Metadata cache hit for {}", key);
            return Ok(hit.clone());
        }
        let value = self
            .inner
            .drilled_wellbore_metadata(smda, field, license)
            .await?;
        self.metadata.lock().await.cache_set(key, value.clone());
        Ok(value)
    }

    async fn drilled_wellbore_trajectory(
        &self,
        smda: &SmdaAddress,
        wellbore_name: &str,
        md_min: f64,
        md_max: Option<f64>,
    ) -> Result<Option<Trajectory>, WellboreError> {
        let key = format!(
            "{}|{}|{}|{:?}",
            smda.api,
            wellbore_name,
            md_min.to_bits(),
            md_max.map(f64::to_bits)
        );
        if let Some(hit) = self.trajectories.lock().await.cache_get(&key) {
            tracing::debug!("Trajectory cache hit for {}", key);
            return Ok(hit.clone());
        }
        let value = self
            .inner
            .drilled_wellbore_trajectory(smda, wellbore_name, md_min, md_max)
            .await?;
        self.trajectories.lock().await.cache_set(key, value.clone());
        Ok(value)
    }
}
