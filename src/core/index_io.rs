use crate::core::repository::Repository;
use crate::domain::index::Index;
use crate::utils::error::Result;
use std::fs;

/// Reads `.git/index`; an absent file is an empty index.
pub fn read_index(repo: &Repository) -> Result<Index> {
    let path = repo.repo_path(&["index"]);
    if !path.is_file() {
        return Ok(Index::default());
    }
    let index = Index::parse(&fs::read(&path)?)?;
    tracing::debug!("Read index with {} entries", index.entries.len());
    Ok(index)
}

pub fn write_index(repo: &Repository, index: &mut Index) -> Result<()> {
    let path = repo.repo_file(false, &["index"])?;
    fs::write(&path, index.serialize())?;
    tracing::debug!("Wrote index with {} entries", index.entries.len());
    Ok(())
}
