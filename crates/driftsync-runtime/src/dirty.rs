//! Dirty-set of folders awaiting summary recomputation

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Set of folder ids whose reported status is stale.
///
/// Marking is idempotent and draining is atomic. Each coordinator instance
/// owns its own set; the lock is held for the single operation only, never
/// across an await point.
#[derive(Debug, Default)]
pub struct DirtySet {
    folders: Mutex<HashSet<String>>,
}

impl DirtySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a folder as needing recomputation
    pub fn mark(&self, folder: &str) {
        self.lock().insert(folder.to_string());
    }

    /// Mark a batch of folders
    pub fn mark_all<I>(&self, folders: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.lock().extend(folders);
    }

    /// Remove a folder that is being handled out of band; true if present
    pub fn unmark(&self, folder: &str) -> bool {
        self.lock().remove(folder)
    }

    /// Take every marked folder, leaving the set empty
    pub fn drain(&self) -> Vec<String> {
        self.lock().drain().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.folders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_is_idempotent() {
        let dirty = DirtySet::new();
        dirty.mark("docs");
        dirty.mark("docs");
        dirty.mark("docs");
        assert_eq!(dirty.len(), 1);
        assert_eq!(dirty.drain(), vec!["docs".to_string()]);
    }

    #[test]
    fn test_drain_empties_the_set() {
        let dirty = DirtySet::new();
        dirty.mark("docs");
        dirty.mark("music");

        let mut drained = dirty.drain();
        drained.sort();
        assert_eq!(drained, vec!["docs".to_string(), "music".to_string()]);
        assert!(dirty.is_empty());
        assert!(dirty.drain().is_empty());
    }

    #[test]
    fn test_unmark() {
        let dirty = DirtySet::new();
        dirty.mark("docs");
        assert!(dirty.unmark("docs"));
        assert!(!dirty.unmark("docs"));
        assert!(dirty.is_empty());
    }

    #[test]
    fn test_mark_all() {
        let dirty = DirtySet::new();
        dirty.mark("docs");
        dirty.mark_all(vec!["docs".to_string(), "music".to_string()]);
        assert_eq!(dirty.len(), 2);
    }
}
