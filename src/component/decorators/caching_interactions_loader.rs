use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::{
    cache::{Cache, CacheError},
    component::{
        loader::InteractionsLoader,
        role::ComponentDescriptor,
        types::LoaderResult,
    },
    config::DEFAULT_FINALITY_DEPTH,
    contract::{ContractId, HeightRange, Interaction},
    network::NetworkClient,
};

/// Serves interactions from a cache, delegating to the wrapped loader on a miss.
///
/// Only ranges that ended at least `finality_depth` blocks below the chain tip
/// are stored; anything newer always goes to the wrapped loader.
pub struct CachingInteractionsLoader {
    inner: Arc<dyn InteractionsLoader>,
    cache: Arc<dyn Cache>,
    network: Arc<dyn NetworkClient>,
    finality_depth: u64,
}

impl CachingInteractionsLoader {
    pub fn new(
        inner: Arc<dyn InteractionsLoader>,
        cache: Arc<dyn Cache>,
        network: Arc<dyn NetworkClient>,
    ) -> Self {
        Self {
            inner,
            cache,
            network,
            finality_depth: DEFAULT_FINALITY_DEPTH,
        }
    }

    pub fn with_finality_depth(mut self, finality_depth: u64) -> Self {
        self.finality_depth = finality_depth;
        self
    }

    pub fn inner(&self) -> &Arc<dyn InteractionsLoader> {
        &self.inner
    }

    pub fn finality_depth(&self) -> u64 {
        self.finality_depth
    }

    pub fn cache_key(contract_id: &ContractId, range: HeightRange) -> String {
        format!("interactions/{}/{}", contract_id, range)
    }
}

#[async_trait]
impl InteractionsLoader for CachingInteractionsLoader {
    #[instrument(level = "debug", skip(self))]
    async fn load(
        &self,
        contract_id: &ContractId,
        range: HeightRange,
    ) -> LoaderResult<Vec<Interaction>> {
        let key = Self::cache_key(contract_id, range);

        if let Some(cached) = self.cache.get(&key).await? {
            match serde_json::from_value::<Vec<Interaction>>(cached) {
                Ok(interactions) => {
                    debug!("cache hit for {} ({} interactions)", key, interactions.len());
                    return Ok(interactions);
                }
                Err(e) => warn!("discarding undecodable cache entry {}: {}", key, e),
            }
        }

        // The tip is read before loading: blocks mined during the load must
        // not make a partial answer look final.
        let tip = self.network.current_height().await?;
        let interactions = self.inner.load(contract_id, range).await?;

        if !range.is_final(tip, self.finality_depth) {
            debug!("{} is not final at tip {}, not caching", range, tip);
            return Ok(interactions);
        }

        let value = serde_json::to_value(&interactions)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.cache.put(&key, value).await?;
        debug!("cached {} interactions under {}", interactions.len(), key);

        Ok(interactions)
    }

    fn describe(&self) -> ComponentDescriptor {
        ComponentDescriptor::new("caching-interactions")
            .with_param("finality_depth", self.finality_depth)
            .wrapping(self.inner.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::{MemoryCache, MockCache},
        component::{loader::MockInteractionsLoader, types::LoaderError},
        network::MockNetworkClient,
    };
    use serde_json::json;

    fn interactions() -> Vec<Interaction> {
        vec![
            Interaction::new("tx1", 10, "000010"),
            Interaction::new("tx2", 11, "000011"),
        ]
    }

    fn network_at(tip: u64) -> Arc<dyn NetworkClient> {
        let mut network = MockNetworkClient::new();
        network.expect_current_height().returning(move || Ok(tip));
        Arc::new(network)
    }

    fn caching(inner: MockInteractionsLoader, tip: u64) -> CachingInteractionsLoader {
        CachingInteractionsLoader::new(
            Arc::new(inner),
            Arc::new(MemoryCache::default()),
            network_at(tip),
        )
    }

    #[tokio::test]
    async fn test_hit_does_not_call_inner_twice() {
        let mut inner = MockInteractionsLoader::new();
        inner
            .expect_load()
            .times(1)
            .returning(|_, _| Ok(interactions()));

        let loader = caching(inner, 100);
        let id = ContractId::new("c1");
        let range = HeightRange::new(0, 20).unwrap();

        let first = loader.load(&id, range).await.unwrap();
        let second = loader.load(&id, range).await.unwrap();
        assert_eq!(first, interactions());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_open_range_sees_new_interactions() {
        let mut inner = MockInteractionsLoader::new();
        let mut calls = 0;
        inner.expect_load().times(2).returning(move |_, _| {
            calls += 1;
            let mut found = vec![Interaction::new("tx1", 10, "000010")];
            if calls > 1 {
                found.push(Interaction::new("tx2", 11, "000011"));
            }
            Ok(found)
        });

        let loader = caching(inner, 100);
        let id = ContractId::new("c1");
        let range = HeightRange::new(0, u64::MAX).unwrap();

        assert_eq!(loader.load(&id, range).await.unwrap().len(), 1);
        assert_eq!(loader.load(&id, range).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_range_within_finality_depth_is_not_cached() {
        let mut inner = MockInteractionsLoader::new();
        inner
            .expect_load()
            .times(2)
            .returning(|_, _| Ok(interactions()));

        // tip 25, depth 10: heights above 15 may still change
        let loader = caching(inner, 25);
        let id = ContractId::new("c1");
        let range = HeightRange::new(0, 20).unwrap();

        loader.load(&id, range).await.unwrap();
        loader.load(&id, range).await.unwrap();
    }

    #[tokio::test]
    async fn test_finality_depth_is_configurable() {
        let mut inner = MockInteractionsLoader::new();
        inner
            .expect_load()
            .times(1)
            .returning(|_, _| Ok(interactions()));

        let loader = caching(inner, 25).with_finality_depth(0);
        let id = ContractId::new("c1");
        let range = HeightRange::new(0, 20).unwrap();

        loader.load(&id, range).await.unwrap();
        loader.load(&id, range).await.unwrap();
    }

    #[tokio::test]
    async fn test_distinct_ranges_are_cached_separately() {
        let mut inner = MockInteractionsLoader::new();
        inner
            .expect_load()
            .times(2)
            .returning(|_, _| Ok(interactions()));

        let loader = caching(inner, 100);
        let id = ContractId::new("c1");
        loader.load(&id, HeightRange::new(0, 20).unwrap()).await.unwrap();
        loader.load(&id, HeightRange::new(0, 21).unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn test_inner_error_is_not_cached() {
        let mut inner = MockInteractionsLoader::new();
        let mut calls = 0;
        inner.expect_load().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Err(LoaderError::Unavailable("down".to_string()))
            } else {
                Ok(interactions())
            }
        });

        let loader = caching(inner, 100);
        let id = ContractId::new("c1");
        let range = HeightRange::new(0, 20).unwrap();

        assert_eq!(
            loader.load(&id, range).await.unwrap_err(),
            LoaderError::Unavailable("down".to_string())
        );
        assert_eq!(loader.load(&id, range).await.unwrap(), interactions());
    }

    #[tokio::test]
    async fn test_tip_failure_propagates() {
        let mut network = MockNetworkClient::new();
        network
            .expect_current_height()
            .returning(|| Err(crate::network::NetworkError::Unavailable("offline".to_string())));
        let mut inner = MockInteractionsLoader::new();
        inner.expect_load().never();

        let loader = CachingInteractionsLoader::new(
            Arc::new(inner),
            Arc::new(MemoryCache::default()),
            Arc::new(network),
        );
        let result = loader
            .load(&ContractId::new("c1"), HeightRange::new(0, 20).unwrap())
            .await;
        assert!(matches!(result, Err(LoaderError::Network(_))));
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let mut cache = MockCache::new();
        cache
            .expect_get()
            .times(1)
            .returning(|_| Ok(Some(json!("garbage"))));
        cache.expect_put().times(1).returning(|_, _| Ok(()));

        let mut inner = MockInteractionsLoader::new();
        inner
            .expect_load()
            .times(1)
            .returning(|_, _| Ok(interactions()));

        let loader = CachingInteractionsLoader::new(Arc::new(inner), Arc::new(cache), network_at(100));
        let result = loader
            .load(&ContractId::new("c1"), HeightRange::new(0, 20).unwrap())
            .await
            .unwrap();
        assert_eq!(result, interactions());
    }

    #[test]
    fn test_describe_reports_inner() {
        let mut inner = MockInteractionsLoader::new();
        inner
            .expect_describe()
            .returning(|| ComponentDescriptor::new("stub"));
        let loader = caching(inner, 100).with_finality_depth(4);

        let descriptor = loader.describe();
        assert_eq!(descriptor.kind, "caching-interactions");
        assert_eq!(descriptor.param("finality_depth"), Some("4"));
        assert_eq!(descriptor.inner().unwrap().kind, "stub");
        assert_eq!(
            CachingInteractionsLoader::cache_key(&ContractId::new("c1"), HeightRange::new(1, 2).unwrap()),
            "interactions/c1/1-2"
        );
    }
}
