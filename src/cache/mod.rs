//! Endpoint resolution cache
//!
//! Maps resource identifiers to their data-plane endpoints so callers don't
//! pay for a management API round trip every time they need one. The cache
//! is an explicitly constructed value shared through `Arc`; it is filled
//! lazily by [`EndpointCache::resolve`] or in bulk by
//! [`EndpointCache::populate`], and entries only leave it through
//! invalidation.

mod source;

pub use source::{ArmEndpointSource, EndpointSource, Listed};

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::ids::{ResourceGroupId, ResourceId, ScopedResource, SubscriptionId};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Case-insensitive cache key derived from an identifier's path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim_end_matches('/').to_lowercase())
    }

    pub fn from_id<I: ResourceId>(id: &I) -> Self {
        Self::new(&id.id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndpointCacheEntry<I> {
    pub key: CacheKey,
    pub id: I,
    pub endpoint: String,
    pub subscription_id: String,
    pub resource_group_name: String,
}

/// What a sweep covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    Subscription(SubscriptionId),
    ResourceGroup(ResourceGroupId),
}

impl ListScope {
    pub fn path(&self) -> String {
        match self {
            ListScope::Subscription(id) => id.id(),
            ListScope::ResourceGroup(id) => id.id(),
        }
    }
}

/// Counts from one [`EndpointCache::populate`] sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulateReport {
    /// Entries taken straight from the primary listing
    pub listed: usize,
    /// Entries filled in by point lookups
    pub resolved: usize,
    /// Point lookups that failed and were skipped
    pub skipped: usize,
}

impl PopulateReport {
    pub fn inserted(&self) -> usize {
        self.listed + self.resolved
    }
}

pub struct EndpointCache<I: ScopedResource> {
    entries: RwLock<HashMap<CacheKey, EndpointCacheEntry<I>>>,
    source: Arc<dyn EndpointSource<I>>,
    config: CacheConfig,
}

impl<I: ScopedResource> EndpointCache<I> {
    pub fn new(source: Arc<dyn EndpointSource<I>>, config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            source,
            config,
        }
    }

    pub async fn lookup(&self, key: &CacheKey) -> Option<String> {
        self.entries.read().await.get(key).map(|e| e.endpoint.clone())
    }

    pub async fn lookup_id(&self, id: &I) -> Option<String> {
        self.lookup(&CacheKey::from_id(id)).await
    }

    /// Insert or overwrite the entry for `id`
    pub async fn insert(&self, id: I, endpoint: impl Into<String>) {
        let entry = EndpointCacheEntry {
            key: CacheKey::from_id(&id),
            subscription_id: id.subscription_id().to_string(),
            resource_group_name: id.resource_group_name().to_string(),
            endpoint: endpoint.into(),
            id,
        };
        tracing::debug!("caching {} -> {}", entry.key, entry.endpoint);
        self.entries.write().await.insert(entry.key.clone(), entry);
    }

    /// Endpoint for `id`, fetched and cached on a miss
    pub async fn resolve(&self, id: &I, cancel: &CancellationToken) -> Result<String> {
        if let Some(endpoint) = self.lookup_id(id).await {
            return Ok(endpoint);
        }

        tracing::debug!("cache miss for {}", id.describe());
        let endpoint = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Canceled),
            endpoint = self.source.get(id) => endpoint?,
        };
        self.insert(id.clone(), endpoint.clone()).await;
        Ok(endpoint)
    }

    /// Sweep `scope` and fill the cache.
    ///
    /// Entries from the primary listing are taken as they are, first one
    /// winning when the listing repeats an identifier. Identifiers that only
    /// show up in the secondary listing are looked up one by one; those
    /// lookups are skipped on failure. A failed listing fails the sweep.
    pub async fn populate(&self, scope: &ListScope, cancel: &CancellationToken) -> Result<PopulateReport> {
        let mut report = PopulateReport::default();

        let primary = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Canceled),
            listed = self.source.list_primary(scope) => listed?,
        };

        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for Listed { id, endpoint } in primary {
            if !seen.insert(CacheKey::from_id(&id)) {
                continue;
            }
            match endpoint {
                Some(endpoint) => {
                    self.insert(id, endpoint).await;
                    report.listed += 1;
                },
                None => pending.push(id),
            }
        }

        let secondary = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Canceled),
            listed = self.source.list_secondary(scope) => listed?,
        };

        {
            let entries = self.entries.read().await;
            for id in secondary {
                let key = CacheKey::from_id(&id);
                if !entries.contains_key(&key) && seen.insert(key) {
                    pending.push(id);
                }
            }
        }

        let source = &self.source;
        let mut lookups = stream::iter(pending)
            .map(|id| async move {
                let result = source.get(&id).await;
                (id, result)
            })
            .buffer_unordered(self.config.max_concurrent_lookups.max(1));

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Canceled),
                next = lookups.next() => next,
            };
            let Some((id, result)) = next else {
                break;
            };
            match result {
                Ok(endpoint) => {
                    self.insert(id, endpoint).await;
                    report.resolved += 1;
                },
                Err(e) => {
                    if e.is_skippable() {
                        tracing::debug!("skipping {}: {}", id.describe(), e);
                    } else {
                        tracing::warn!("skipping {}: {}", id.describe(), e);
                    }
                    report.skipped += 1;
                },
            }
        }

        tracing::info!(
            "cached {} {} endpoint(s) under {} ({} listed, {} looked up, {} skipped)",
            report.inserted(),
            I::RESOURCE_TYPE,
            scope.path(),
            report.listed,
            report.resolved,
            report.skipped
        );
        Ok(report)
    }

    pub async fn invalidate(&self, key: &CacheKey) -> Option<EndpointCacheEntry<I>> {
        let removed = self.entries.write().await.remove(key);
        if removed.is_some() {
            tracing::debug!("invalidated {}", key);
        }
        removed
    }

    pub async fn invalidate_id(&self, id: &I) -> Option<EndpointCacheEntry<I>> {
        self.invalidate(&CacheKey::from_id(id)).await
    }

    /// Drop every entry in a resource group, returning how many were removed
    pub async fn invalidate_resource_group(&self, group: &ResourceGroupId) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| {
            !(entry.subscription_id.eq_ignore_ascii_case(group.subscription_id())
                && entry.resource_group_name.eq_ignore_ascii_case(group.resource_group_name()))
        });
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!("invalidated {} entries under {}", removed, group);
        }
        removed
    }

    /// Identifier whose endpoint is `endpoint`, ignoring case and a trailing slash
    pub async fn find_by_endpoint(&self, endpoint: &str) -> Option<I> {
        let wanted = endpoint.trim_end_matches('/');
        self.entries
            .read()
            .await
            .values()
            .find(|entry| entry.endpoint.trim_end_matches('/').eq_ignore_ascii_case(wanted))
            .map(|entry| entry.id.clone())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
