use crate::utils::error::Result;

/// Content-addressed storage for framed object bytes (`<kind> <size>\0<payload>`).
pub trait ObjectStore {
    /// `None` when no object with this sha exists.
    fn read_raw(&self, sha: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `framed` under `sha`. Existing objects are left untouched.
    fn write_raw(&self, sha: &str, framed: &[u8]) -> Result<()>;

    /// Full shas of every object starting with `prefix` (lowercase hex).
    fn find_by_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}
