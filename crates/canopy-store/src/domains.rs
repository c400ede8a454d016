//! The domain cache.

use crate::source::DomainSource;
use crate::StoreResult;
use canopy_core::{DomainEntry, NodeId};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Caches domain assignments for hostname and culture resolution.
///
/// Entries are loaded from the domain source on first use and dropped
/// wholesale by [`DomainCache::invalidate`] whenever a domain-change
/// notification arrives; the next access reloads.
pub struct DomainCache {
    source: Arc<dyn DomainSource>,
    entries: RwLock<Option<Arc<Vec<DomainEntry>>>>,
}

impl DomainCache {
    /// Creates a cache over a domain source.
    #[must_use]
    pub fn new(source: Arc<dyn DomainSource>) -> Self {
        Self {
            source,
            entries: RwLock::new(None),
        }
    }

    /// Returns all domain entries, loading them if needed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Source`] when loading fails; the
    /// cache stays cold and the next access retries.
    pub fn all(&self) -> StoreResult<Arc<Vec<DomainEntry>>> {
        if let Some(entries) = self.entries.read().as_ref() {
            return Ok(entries.clone());
        }
        let loaded = Arc::new(self.source.load_domains()?);
        debug!(count = loaded.len(), "loaded domain entries");
        *self.entries.write() = Some(loaded.clone());
        Ok(loaded)
    }

    /// Resolves which node and culture an authority (hostname, or
    /// hostname/path) maps to.
    ///
    /// The most specific (longest) matching name wins; wildcard
    /// domains never match a hostname.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Source`] when loading fails.
    pub fn match_domain(&self, authority: &str) -> StoreResult<Option<DomainEntry>> {
        let entries = self.all()?;
        let best = entries
            .iter()
            .filter(|d| d.matches(authority))
            .max_by_key(|d| d.name.len())
            .cloned();
        Ok(best)
    }

    /// Returns the non-wildcard domain assigned to a node, if any.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::Source`] when loading fails.
    pub fn domain_for_node(&self, content_id: NodeId) -> StoreResult<Option<DomainEntry>> {
        let entries = self.all()?;
        Ok(entries
            .iter()
            .find(|d| !d.is_wildcard && d.content_id == content_id)
            .cloned())
    }

    /// Drops the cached entries; the next access reloads.
    pub fn invalidate(&self) {
        debug!("invalidating domain cache");
        *self.entries.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    struct CountingSource {
        domains: Vec<DomainEntry>,
        loads: Mutex<usize>,
    }

    impl CountingSource {
        fn new(domains: Vec<DomainEntry>) -> Self {
            Self {
                domains,
                loads: Mutex::new(0),
            }
        }
    }

    impl DomainSource for CountingSource {
        fn load_domains(&self) -> StoreResult<Vec<DomainEntry>> {
            *self.loads.lock() += 1;
            Ok(self.domains.clone())
        }
    }

    fn sample_source() -> Arc<CountingSource> {
        Arc::new(CountingSource::new(vec![
            DomainEntry::new(1, "example.com", NodeId::new(1000), "en-US"),
            DomainEntry::new(2, "example.com/da", NodeId::new(2000), "da-DK"),
            DomainEntry::wildcard(3, NodeId::new(3000), "fr-FR"),
        ]))
    }

    #[test]
    fn loads_lazily_and_caches() {
        let source = sample_source();
        let cache = DomainCache::new(source.clone());

        assert_eq!(*source.loads.lock(), 0);
        cache.all().unwrap();
        cache.all().unwrap();
        assert_eq!(*source.loads.lock(), 1);
    }

    #[test]
    fn most_specific_name_wins() {
        let cache = DomainCache::new(sample_source());

        let hit = cache.match_domain("example.com/da/nyheder").unwrap().unwrap();
        assert_eq!(hit.content_id, NodeId::new(2000));

        let hit = cache.match_domain("example.com/om-os").unwrap().unwrap();
        assert_eq!(hit.content_id, NodeId::new(1000));

        assert!(cache.match_domain("other.org").unwrap().is_none());
    }

    #[test]
    fn domain_for_node_skips_wildcards() {
        let cache = DomainCache::new(sample_source());
        assert!(cache.domain_for_node(NodeId::new(3000)).unwrap().is_none());
        assert_eq!(
            cache
                .domain_for_node(NodeId::new(1000))
                .unwrap()
                .unwrap()
                .name,
            "example.com"
        );
    }

    #[test]
    fn invalidate_forces_reload() {
        let source = sample_source();
        let cache = DomainCache::new(source.clone());

        cache.all().unwrap();
        cache.invalidate();
        cache.all().unwrap();
        assert_eq!(*source.loads.lock(), 2);
    }
}
