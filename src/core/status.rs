//! Compares HEAD, the index and the worktree.

use crate::adapters::MemoryObjectStore;
use crate::core::history::tree_to_map;
use crate::core::ignore_io::read_ignore_rules;
use crate::core::index_io::read_index;
use crate::core::objects::hash_object;
use crate::core::refs::{head_state, object_find_required, ref_resolve, HeadState};
use crate::core::repository::{Repository, GIT_DIR};
use crate::core::staging::FileStat;
use crate::domain::index::IndexEntry;
use crate::domain::model::ObjectKind;
use crate::utils::error::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub kind: ChangeKind,
    pub path: String,
}

impl Change {
    fn new(kind: ChangeKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub head: HeadState,
    /// HEAD vs index.
    pub staged: Vec<Change>,
    /// Index vs worktree.
    pub unstaged: Vec<Change>,
    pub untracked: Vec<String>,
}

pub fn status(repo: &Repository) -> Result<StatusReport> {
    let index = read_index(repo)?;
    let head = head_state(repo)?;

    let head_files = match ref_resolve(repo, "HEAD")? {
        Some(_) => tree_to_map(repo, &object_find_required(repo, "HEAD", ObjectKind::Tree)?)?,
        None => BTreeMap::new(),
    };

    let staged = staged_changes(&head_files, &index.entries);
    let (unstaged, untracked) = worktree_changes(repo, &index.entries)?;

    Ok(StatusReport {
        head,
        staged,
        unstaged,
        untracked,
    })
}

fn staged_changes(head_files: &BTreeMap<String, String>, entries: &[IndexEntry]) -> Vec<Change> {
    let mut remaining = head_files.clone();
    let mut changes = Vec::new();

    for entry in entries {
        match remaining.remove(&entry.name) {
            Some(sha) if sha != entry.sha => {
                changes.push(Change::new(ChangeKind::Modified, entry.name.as_str()))
            }
            Some(_) => {}
            None => changes.push(Change::new(ChangeKind::Added, entry.name.as_str())),
        }
    }
    changes.extend(
        remaining
            .into_keys()
            .map(|path| Change::new(ChangeKind::Deleted, path)),
    );
    changes
}

fn worktree_changes(
    repo: &Repository,
    entries: &[IndexEntry],
) -> Result<(Vec<Change>, Vec<String>)> {
    let mut all_files = BTreeSet::new();
    walk_worktree(repo, repo.worktree(), &mut all_files)?;

    let mut unstaged = Vec::new();
    for entry in entries {
        all_files.remove(&entry.name);

        let path = repo.worktree_path(&entry.name);
        let metadata = match fs::symlink_metadata(&path) {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => {
                unstaged.push(Change::new(ChangeKind::Deleted, entry.name.as_str()));
                continue;
            }
        };

        // 時間戳相同就視為未修改，不同時才比對內容
        let stat = FileStat::from_metadata(&metadata);
        if stat.ctime == entry.ctime && stat.mtime == entry.mtime {
            continue;
        }
        let sha = hash_object::<MemoryObjectStore>(
            &fs::read(&path)?,
            ObjectKind::Blob,
            None,
        )?;
        if sha != entry.sha {
            unstaged.push(Change::new(ChangeKind::Modified, entry.name.as_str()));
        }
    }

    let rules = read_ignore_rules(repo)?;
    let mut untracked = Vec::new();
    for path in all_files {
        if !rules.check(&path)? {
            untracked.push(path);
        }
    }

    Ok((unstaged, untracked))
}

fn walk_worktree(repo: &Repository, dir: &Path, files: &mut BTreeSet<String>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            if path == repo.gitdir() || entry.file_name() == GIT_DIR {
                continue;
            }
            walk_worktree(repo, &path, files)?;
        } else if let Some(name) = repo.relative_path(&path) {
            files.insert(name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, sha: &str) -> IndexEntry {
        IndexEntry {
            ctime: (0, 0),
            mtime: (0, 0),
            dev: 0,
            ino: 0,
            mode_type: crate::domain::index::MODE_TYPE_REGULAR,
            mode_perms: 0o644,
            uid: 0,
            gid: 0,
            fsize: 0,
            sha: sha.to_string(),
            flag_assume_valid: false,
            flag_stage: 0,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_staged_changes_against_head() {
        let head: BTreeMap<String, String> = [
            ("same.txt", "1111"),
            ("changed.txt", "2222"),
            ("removed.txt", "3333"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let entries = vec![
            entry("changed.txt", "9999"),
            entry("new.txt", "4444"),
            entry("same.txt", "1111"),
        ];

        let changes = staged_changes(&head, &entries);
        assert_eq!(
            changes,
            vec![
                Change::new(ChangeKind::Modified, "changed.txt"),
                Change::new(ChangeKind::Added, "new.txt"),
                Change::new(ChangeKind::Deleted, "removed.txt"),
            ]
        );
    }
}
