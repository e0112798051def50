//! Wrapper type cache
//!
//! Maps a source class to its synthesized wrapper. Lookups are lock-free
//! on hit; a miss synthesizes outside any lock and publishes with
//! first-writer-wins semantics, so every caller observes the same descriptor.
//! Two threads missing at once may both synthesize; the loser's class stays
//! registered in the runtime but is never handed out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace};

use super::error::ProxyResult;
use super::type_builder::WrapperType;
use crate::vm::ClassId;

/// Source class to wrapper type, never evicted
#[derive(Debug, Default)]
pub struct TypeCache {
    types: DashMap<ClassId, Arc<WrapperType>>,
    syntheses: AtomicUsize,
}

impl TypeCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached wrapper for `class_id`, synthesizing it on a miss
    pub fn resolve<F>(&self, class_id: ClassId, synthesize: F) -> ProxyResult<Arc<WrapperType>>
    where
        F: FnOnce() -> ProxyResult<WrapperType>,
    {
        if let Some(found) = self.get(class_id) {
            trace!(class_id, "wrapper type cache hit");
            return Ok(found);
        }

        let created = Arc::new(synthesize()?);
        self.syntheses.fetch_add(1, Ordering::Relaxed);

        let stored = {
            let entry = self
                .types
                .entry(class_id)
                .or_insert_with(|| Arc::clone(&created));
            Arc::clone(entry.value())
        };
        if !Arc::ptr_eq(&stored, &created) {
            debug!(
                class_id,
                discarded = created.class_id,
                kept = stored.class_id,
                "lost wrapper synthesis race"
            );
        }
        Ok(stored)
    }

    /// Cached wrapper for `class_id`, if any
    pub fn get(&self, class_id: ClassId) -> Option<Arc<WrapperType>> {
        self.types.get(&class_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Whether a wrapper for `class_id` is cached
    pub fn contains(&self, class_id: ClassId) -> bool {
        self.types.contains_key(&class_id)
    }

    /// Number of cached wrappers
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Number of syntheses performed, including ones that lost a race
    pub fn synthesis_count(&self) -> usize {
        self.syntheses.load(Ordering::Relaxed)
    }
}
