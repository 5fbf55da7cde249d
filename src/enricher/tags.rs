use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub const LOGSTASH_TAGS_PREFIX: &str = "LOGSTASH_TAGS=";
pub const DEFAULT_TAG_CACHE_CAPACITY: usize = 10_000;

/// Tags attached to every document from one container.
pub type TagSet = Arc<[String]>;

#[derive(Debug, Default)]
struct TagCache {
    entries: HashMap<String, TagSet>,
    // Insertion order, oldest first.
    order: VecDeque<String>,
}

/// Per-adapter cache of `LOGSTASH_TAGS` keyed by container id.
///
/// A container's environment is treated as immutable: once resolved, the tag
/// set is served from the cache until the entry is evicted, either because the
/// container was removed or because the cache reached its capacity.
#[derive(Debug)]
pub struct TagResolver {
    cache: Mutex<TagCache>,
    capacity: usize,
    scans: AtomicU64,
}

impl Default for TagResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TagResolver {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TAG_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(TagCache::default()),
            capacity: capacity.max(1),
            scans: AtomicU64::new(0),
        }
    }

    pub fn resolve<S: AsRef<str>>(&self, container_id: &str, env: &[S]) -> TagSet {
        let mut cache = self.cache.lock();

        if let Some(tags) = cache.entries.get(container_id) {
            return tags.clone();
        }

        let tags = self.scan(env);

        while cache.entries.len() >= self.capacity {
            let Some(oldest) = cache.order.pop_front() else {
                break;
            };
            cache.entries.remove(&oldest);
            tracing::debug!("Tag cache full, evicted container {}", oldest);
        }

        cache.entries.insert(container_id.to_string(), tags.clone());
        cache.order.push_back(container_id.to_string());

        tags
    }

    /// Drop the cached tags of a removed container. Returns whether an entry
    /// existed.
    pub fn evict(&self, container_id: &str) -> bool {
        let mut cache = self.cache.lock();
        if cache.entries.remove(container_id).is_none() {
            return false;
        }
        cache.order.retain(|id| id != container_id);
        true
    }

    pub fn len(&self) -> usize {
        self.cache.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of environment scans performed so far.
    pub fn scan_count(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }

    fn scan<S: AsRef<str>>(&self, env: &[S]) -> TagSet {
        self.scans.fetch_add(1, Ordering::Relaxed);

        env.iter()
            .find_map(|entry| entry.as_ref().strip_prefix(LOGSTASH_TAGS_PREFIX))
            .map(|raw| raw.split(',').map(str::to_string).collect::<Vec<_>>())
            .unwrap_or_default()
            .into()
    }
}
