//! `add` and `rm`: moving files in and out of the index.

use crate::core::index_io::{read_index, write_index};
use crate::core::objects::hash_object;
use crate::core::repository::{Repository, GIT_DIR};
use crate::domain::index::{IndexEntry, Timestamp, MODE_TYPE_REGULAR};
use crate::domain::model::ObjectKind;
use crate::utils::error::{Result, TwitError};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Maps a filesystem path to its worktree-relative index name.
///
/// The path does not have to exist, so removed files can still be named.
pub fn worktree_name(repo: &Repository, path: &Path) -> Result<String> {
    let absolute = canonical_prefix(path);
    let outside = || TwitError::PathOutsideWorktree {
        path: path.to_path_buf(),
    };
    let name = repo.relative_path(&absolute).ok_or_else(outside)?;
    if name == GIT_DIR || name.starts_with(&format!("{}/", GIT_DIR)) {
        return Err(outside());
    }
    Ok(name)
}

/// Canonicalizes the longest existing ancestor of `path` and re-appends the rest.
fn canonical_prefix(path: &Path) -> PathBuf {
    let mut missing = Vec::new();
    let mut current = path;
    loop {
        if let Ok(canonical) = current.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical, |joined, part| joined.join(part));
        }
        match (current.parent(), current.file_name()) {
            (Some(parent), Some(file)) => {
                missing.push(file.to_os_string());
                current = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

/// Removes `paths` from the index, and from disk when `delete` is set.
///
/// Returns the names that were unstaged.
pub fn rm(
    repo: &Repository,
    paths: &[PathBuf],
    delete: bool,
    skip_missing: bool,
) -> Result<Vec<String>> {
    let mut requested = BTreeSet::new();
    for path in paths {
        requested.insert(worktree_name(repo, path)?);
    }

    let mut index = read_index(repo)?;
    let (removed, kept): (Vec<IndexEntry>, Vec<IndexEntry>) = index
        .entries
        .drain(..)
        .partition(|entry| requested.contains(&entry.name));

    let removed_names: Vec<String> = removed.into_iter().map(|e| e.name).collect();
    let missing: Vec<String> = requested
        .iter()
        .filter(|name| !removed_names.contains(name))
        .cloned()
        .collect();
    if !missing.is_empty() && !skip_missing {
        return Err(TwitError::NotInIndex { paths: missing });
    }

    if delete {
        for name in &removed_names {
            let path = repo.worktree_path(name);
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!("Deleted {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    index.entries = kept;
    write_index(repo, &mut index)?;
    Ok(removed_names)
}

/// Stages `paths`, replacing any existing entries for them.
///
/// Returns the names that were staged.
pub fn add(repo: &Repository, paths: &[PathBuf]) -> Result<Vec<String>> {
    let mut staged: Vec<(String, PathBuf)> = Vec::with_capacity(paths.len());
    for path in paths {
        if !path.is_file() {
            return Err(TwitError::PathOutsideWorktree {
                path: path.to_path_buf(),
            });
        }
        let name = worktree_name(repo, path)?;
        if !staged.iter().any(|(n, _)| n == &name) {
            let absolute = repo.worktree_path(&name);
            staged.push((name, absolute));
        }
    }

    let mut index = read_index(repo)?;
    index
        .entries
        .retain(|entry| !staged.iter().any(|(name, _)| name == &entry.name));

    for (name, path) in &staged {
        let data = fs::read(path)?;
        let sha = hash_object(&data, ObjectKind::Blob, Some(repo.objects()))?;
        let metadata = fs::metadata(path)?;
        tracing::info!("Staged {} as {}", name, &sha[..7]);
        index.entries.push(entry_from_metadata(name.clone(), sha, &metadata));
    }

    write_index(repo, &mut index)?;
    Ok(staged.into_iter().map(|(name, _)| name).collect())
}

/// Builds a regular-file index entry from filesystem metadata.
pub fn entry_from_metadata(name: String, sha: String, metadata: &fs::Metadata) -> IndexEntry {
    let stat = FileStat::from_metadata(metadata);
    IndexEntry {
        ctime: stat.ctime,
        mtime: stat.mtime,
        dev: stat.dev,
        ino: stat.ino,
        mode_type: MODE_TYPE_REGULAR,
        mode_perms: if stat.executable { 0o755 } else { 0o644 },
        uid: stat.uid,
        gid: stat.gid,
        fsize: metadata.len() as u32,
        sha,
        flag_assume_valid: false,
        flag_stage: 0,
        name,
    }
}

/// The stat fields the index records, truncated to 32 bits like git does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub ctime: Timestamp,
    pub mtime: Timestamp,
    pub dev: u32,
    pub ino: u32,
    pub uid: u32,
    pub gid: u32,
    pub executable: bool,
}

impl FileStat {
    #[cfg(unix)]
    pub fn from_metadata(metadata: &fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        Self {
            ctime: (metadata.ctime() as u32, metadata.ctime_nsec() as u32),
            mtime: (metadata.mtime() as u32, metadata.mtime_nsec() as u32),
            dev: metadata.dev() as u32,
            ino: metadata.ino() as u32,
            uid: metadata.uid(),
            gid: metadata.gid(),
            executable: metadata.mode() & 0o111 != 0,
        }
    }

    #[cfg(not(unix))]
    pub fn from_metadata(metadata: &fs::Metadata) -> Self {
        let mtime = system_timestamp(metadata.modified().ok());
        Self {
            ctime: system_timestamp(metadata.created().ok()).max(mtime),
            mtime,
            dev: 0,
            ino: 0,
            uid: 0,
            gid: 0,
            executable: false,
        }
    }
}

#[cfg(not(unix))]
fn system_timestamp(time: Option<std::time::SystemTime>) -> Timestamp {
    time.and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| (d.as_secs() as u32, d.subsec_nanos()))
        .unwrap_or((0, 0))
}
