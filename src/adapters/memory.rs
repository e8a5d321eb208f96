use crate::domain::ports::ObjectStore;
use crate::utils::error::Result;
use std::cell::RefCell;
use std::collections::BTreeMap;

/// Keeps uncompressed objects in memory. Used for hashing without a repository
/// and in tests.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RefCell<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.borrow().is_empty()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn read_raw(&self, sha: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.objects.borrow().get(sha).cloned())
    }

    fn write_raw(&self, sha: &str, framed: &[u8]) -> Result<()> {
        self.objects
            .borrow_mut()
            .entry(sha.to_string())
            .or_insert_with(|| framed.to_vec());
        Ok(())
    }

    fn find_by_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .objects
            .borrow()
            .keys()
            .filter(|sha| sha.starts_with(prefix))
            .cloned()
            .collect())
    }
}
