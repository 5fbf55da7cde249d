use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Ids of the containers whose logs are currently being followed.
///
/// A claim is held by the tail task for as long as its log stream is open.
/// Docker ends the stream when a container stops, so dropping the guard at
/// that point lets the next `start` of the same container be tailed again.
#[derive(Debug, Clone, Default)]
pub struct TailRegistry {
    tailed: Arc<Mutex<HashSet<String>>>,
}

impl TailRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `id` for tailing. `None` when it is already being tailed.
    pub fn claim(&self, id: &str) -> Option<TailGuard> {
        if !self.tailed.lock().insert(id.to_string()) {
            return None;
        }
        Some(TailGuard {
            id: id.to_string(),
            registry: self.clone(),
        })
    }

    pub fn is_tailed(&self, id: &str) -> bool {
        self.tailed.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.tailed.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases its container id when dropped.
#[derive(Debug)]
pub struct TailGuard {
    id: String,
    registry: TailRegistry,
}

impl TailGuard {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for TailGuard {
    fn drop(&mut self) {
        self.registry.tailed.lock().remove(&self.id);
    }
}
