use crate::patch::plan::Patch;
use crate::pipeline::cache::BoundedCache;
use crate::pipeline::fingerprint::{CacheKey, SnapshotKey};
use crate::template::render::RenderTree;
use serde::Serialize;
use std::sync::Arc;

/// Last rendered output for a template/theme pair, used as the diff baseline.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    pub(crate) cache_key: CacheKey,
    pub(crate) output: Arc<str>,
    pub(crate) tree: Arc<RenderTree>,
    pub(crate) timestamp: u64,
}

/// Read-only view of a retained snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotInfo {
    /// Key of the data the snapshot was rendered from.
    pub cache_key: CacheKey,
    /// Logical insertion time; larger is newer.
    pub timestamp: u64,
    /// Length of the rendered output in bytes.
    pub output_len: usize,
    /// Number of data-bound regions in the structural summary.
    pub regions: usize,
}

/// Bounded snapshot and patch stores. Both evict oldest first.
#[derive(Debug)]
pub(crate) struct History {
    clock: u64,
    snapshots: BoundedCache<SnapshotKey, Arc<Snapshot>>,
    patches: BoundedCache<u64, Arc<Patch>>,
}

impl History {
    pub(crate) fn new(max_snapshots: usize, max_patches: usize) -> Self {
        Self {
            clock: 0,
            snapshots: BoundedCache::new(max_snapshots),
            patches: BoundedCache::new(max_patches),
        }
    }

    pub(crate) fn snapshot(&self, key: &SnapshotKey) -> Option<Arc<Snapshot>> {
        self.snapshots.get(key).cloned()
    }

    pub(crate) fn store_snapshot(
        &mut self,
        cache_key: CacheKey,
        output: Arc<str>,
        tree: Arc<RenderTree>,
    ) {
        self.clock += 1;
        let snapshot = Snapshot {
            cache_key,
            output,
            tree,
            timestamp: self.clock,
        };
        let evicted = self
            .snapshots
            .insert(snapshot.cache_key.snapshot_key(), Arc::new(snapshot));
        for (key, old) in evicted {
            tracing::debug!(
                template = %key.template_id,
                theme = %key.theme_id,
                timestamp = old.timestamp,
                capacity = self.snapshots.capacity(),
                "evicted snapshot"
            );
        }
    }

    pub(crate) fn store_patch(&mut self, patch: Arc<Patch>) {
        self.patches.insert(patch.id, patch);
    }

    pub(crate) fn snapshot_infos(&self) -> Vec<SnapshotInfo> {
        self.snapshots
            .iter()
            .map(|(_, s)| SnapshotInfo {
                cache_key: s.cache_key.clone(),
                timestamp: s.timestamp,
                output_len: s.output.len(),
                regions: s.tree.region_count(),
            })
            .collect()
    }

    pub(crate) fn patches(&self) -> Vec<Arc<Patch>> {
        self.patches.iter().map(|(_, p)| Arc::clone(p)).collect()
    }

    pub(crate) fn clear(&mut self) {
        self.snapshots.clear();
        self.patches.clear();
    }
}
