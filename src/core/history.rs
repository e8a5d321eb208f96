//! Read-only walks over commits and trees, used by `log`, `ls-tree` and `status`.

use crate::core::checkout::read_tree;
use crate::core::refs::object_find_required;
use crate::core::repository::Repository;
use crate::domain::model::{GitObject, ObjectKind};
use crate::domain::tree::TreeLeaf;
use crate::utils::error::Result;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogNode {
    pub sha: String,
    pub summary: String,
    pub parents: Vec<String>,
}

/// Every commit reachable from `start`, depth first, each visited once.
pub fn commit_graph(repo: &Repository, start: &str) -> Result<Vec<LogNode>> {
    let start = object_find_required(repo, start, ObjectKind::Commit)?;

    let mut nodes = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![start];

    while let Some(sha) = stack.pop() {
        if !seen.insert(sha.clone()) {
            continue;
        }
        let commit = match repo.require_object(&sha)? {
            GitObject::Commit(commit) => commit,
            other => {
                tracing::warn!("Parent {} is a {}, not a commit", sha, other.kind());
                continue;
            }
        };

        let parents = commit.parents();
        // push in reverse so the first parent is walked first
        stack.extend(parents.iter().rev().cloned());
        nodes.push(LogNode {
            sha,
            summary: commit.summary(),
            parents,
        });
    }

    Ok(nodes)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedLeaf {
    pub leaf: TreeLeaf,
    /// Path from the listed tree's root.
    pub path: String,
}

/// Lists a tree-ish. With `recursive`, subtrees are expanded instead of listed.
pub fn list_tree(repo: &Repository, name: &str, recursive: bool) -> Result<Vec<ListedLeaf>> {
    let sha = object_find_required(repo, name, ObjectKind::Tree)?;
    let mut out = Vec::new();
    list_into(repo, &sha, recursive, "", &mut out)?;
    Ok(out)
}

fn list_into(
    repo: &Repository,
    sha: &str,
    recursive: bool,
    prefix: &str,
    out: &mut Vec<ListedLeaf>,
) -> Result<()> {
    for leaf in read_tree(repo, sha)? {
        let path = format!("{}{}", prefix, leaf.path);
        if recursive && leaf.is_tree() {
            list_into(repo, &leaf.sha, recursive, &format!("{}/", path), out)?;
        } else {
            out.push(ListedLeaf { leaf, path });
        }
    }
    Ok(())
}

/// Flattens a tree into `path -> blob sha`.
pub fn tree_to_map(repo: &Repository, tree_sha: &str) -> Result<BTreeMap<String, String>> {
    let mut leaves = Vec::new();
    list_into(repo, tree_sha, true, "", &mut leaves)?;
    Ok(leaves
        .into_iter()
        .map(|listed| (listed.path, listed.leaf.sha))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::commit::{commit, Identity};
    use crate::core::refs::ref_create;
    use crate::core::staging::add;
    use crate::domain::kvlm::Kvlm;
    use crate::domain::model::Commit;
    use std::fs;
    use tempfile::TempDir;

    fn identity() -> Identity {
        Identity {
            name: "T".to_string(),
            email: "t@example.com".to_string(),
        }
    }

    #[test]
    fn test_commit_graph_follows_parents() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::create(temp_dir.path(), "master").unwrap();
        let first = commit(&repo, &identity(), "first").unwrap();
        let second = commit(&repo, &identity(), "second\n\nbody").unwrap();

        let nodes = commit_graph(&repo, "HEAD").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].sha, second.sha);
        assert_eq!(nodes[0].summary, "second");
        assert_eq!(nodes[0].parents, vec![first.sha.clone()]);
        assert_eq!(nodes[1].sha, first.sha);
        assert!(nodes[1].parents.is_empty());
    }

    fn write_commit(repo: &Repository, message: &str, parents: &[&str]) -> String {
        let mut kvlm = Kvlm::new();
        kvlm.push("tree", b"4b825dc642cb6eb9a060e54bf8d69288fbee4904".to_vec());
        for parent in parents {
            kvlm.push("parent", parent.as_bytes().to_vec());
        }
        kvlm.push("author", b"T <t@example.com> 0 +0000".to_vec());
        kvlm.set_message(format!("{}\n", message).into_bytes());
        repo.write_object(&GitObject::Commit(Commit { kvlm })).unwrap()
    }

    #[test]
    fn test_commit_graph_visits_shared_ancestor_once() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::create(temp_dir.path(), "master").unwrap();
        let root = write_commit(&repo, "root", &[]);
        let left = write_commit(&repo, "left", &[&root]);
        let right = write_commit(&repo, "right", &[&root]);
        let merge = write_commit(&repo, "merge", &[&left, &right]);
        ref_create(&repo, "refs/heads/master", &merge).unwrap();

        let nodes = commit_graph(&repo, "HEAD").unwrap();
        let order: Vec<&str> = nodes.iter().map(|n| n.summary.as_str()).collect();
        assert_eq!(order, vec!["merge", "left", "root", "right"]);
        assert_eq!(nodes[0].parents, vec![left, right]);
        assert_eq!(nodes[3].parents, vec![root]);
    }

    #[test]
    fn test_list_tree_recursive_and_flat() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::create(temp_dir.path(), "master").unwrap();
        let worktree = repo.worktree().to_path_buf();
        fs::create_dir(worktree.join("lib")).unwrap();
        fs::write(worktree.join("lib/x.rs"), "x").unwrap();
        fs::write(worktree.join("top.txt"), "t").unwrap();
        add(&repo, &[worktree.join("lib/x.rs"), worktree.join("top.txt")]).unwrap();
        commit(&repo, &identity(), "files").unwrap();

        let flat: Vec<String> = list_tree(&repo, "HEAD", false)
            .unwrap()
            .into_iter()
            .map(|l| l.path)
            .collect();
        assert_eq!(flat, vec!["lib", "top.txt"]);

        let deep: Vec<String> = list_tree(&repo, "HEAD", true)
            .unwrap()
            .into_iter()
            .map(|l| l.path)
            .collect();
        assert_eq!(deep, vec!["lib/x.rs", "top.txt"]);
    }
}
