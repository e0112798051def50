//! Class registry for managing runtime class metadata

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::object::{Class, ClassId};

/// Class registry for the runtime
///
/// Classes are immutable once registered and handed out as `Arc`s so callers
/// can release the registry lock before using them.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    /// Classes indexed by ID
    classes: Vec<Arc<Class>>,
    /// Class name to ID mapping (first registration wins)
    name_to_id: FxHashMap<String, ClassId>,
}

impl ClassRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class built with `next_class_id()` as its ID
    pub fn register_class(&mut self, class: Class) -> ClassId {
        debug_assert_eq!(class.id, self.classes.len(), "class ID out of sequence");
        let id = class.id;
        self.name_to_id.entry(class.name.clone()).or_insert(id);
        self.classes.push(Arc::new(class));
        id
    }

    /// Get class by ID
    pub fn get_class(&self, id: ClassId) -> Option<Arc<Class>> {
        self.classes.get(id).cloned()
    }

    /// Get class by name
    pub fn get_class_by_name(&self, name: &str) -> Option<Arc<Class>> {
        self.name_to_id
            .get(name)
            .and_then(|id| self.classes.get(*id))
            .cloned()
    }

    /// Get next available class ID
    pub fn next_class_id(&self) -> ClassId {
        self.classes.len()
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterate over all classes with their IDs
    pub fn iter(&self) -> impl Iterator<Item = (ClassId, &Arc<Class>)> {
        self.classes.iter().enumerate()
    }
}
