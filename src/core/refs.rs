//! References: text files under `.git/` holding a sha or `ref: <other ref>`.

use crate::core::repository::Repository;
use crate::domain::model::{GitObject, ObjectKind};
use crate::domain::ports::ObjectStore;
use crate::utils::error::{Result, TwitError};
use crate::utils::validation::{validate_ref_name, validate_sha};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::sync::OnceLock;

const MAX_REF_DEPTH: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefNode {
    /// `None` for a dangling symbolic ref.
    Ref(Option<String>),
    Dir(BTreeMap<String, RefNode>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadState {
    Branch(String),
    Detached(String),
}

/// Resolves `name` (relative to `.git`) to a sha. `None` when the chain ends in a
/// missing file, which is normal for `HEAD` before the first commit.
pub fn ref_resolve(repo: &Repository, name: &str) -> Result<Option<String>> {
    let mut current = name.to_string();
    for _ in 0..MAX_REF_DEPTH {
        let path = repo.repo_path(&[current.as_str()]);
        if !path.is_file() {
            return Ok(None);
        }
        let data = fs::read_to_string(&path)?;
        let data = data.trim();
        match data.strip_prefix("ref: ") {
            Some(target) => current = target.trim().to_string(),
            None => return Ok(Some(data.to_string())),
        }
    }
    Err(TwitError::RefCycle {
        name: name.to_string(),
    })
}

/// Writes `<sha>\n` to `.git/<name>`.
pub fn ref_create(repo: &Repository, name: &str, sha: &str) -> Result<()> {
    validate_sha(name, sha)?;
    let parts: Vec<&str> = name.split('/').collect();
    let path = repo.repo_file(true, &parts)?;
    fs::write(path, format!("{}\n", sha))?;
    tracing::debug!("Updated {} to {}", name, sha);
    Ok(())
}

/// Everything under `refs/`, sorted.
pub fn ref_list(repo: &Repository) -> Result<BTreeMap<String, RefNode>> {
    match repo.repo_dir(false, &["refs"])? {
        Some(_) => list_dir(repo, "refs"),
        None => Ok(BTreeMap::new()),
    }
}

fn list_dir(repo: &Repository, prefix: &str) -> Result<BTreeMap<String, RefNode>> {
    let mut refs = BTreeMap::new();
    for entry in fs::read_dir(repo.repo_path(&[prefix]))? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let full = format!("{}/{}", prefix, name);
        let node = if entry.file_type()?.is_dir() {
            RefNode::Dir(list_dir(repo, &full)?)
        } else {
            RefNode::Ref(ref_resolve(repo, &full)?)
        };
        refs.insert(name, node);
    }
    Ok(refs)
}

/// Flattens [`ref_list`] into `(full ref name, sha)` pairs.
pub fn flatten_refs(refs: &BTreeMap<String, RefNode>, prefix: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (name, node) in refs {
        let full = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", prefix, name)
        };
        match node {
            RefNode::Ref(Some(sha)) => out.push((full, sha.clone())),
            RefNode::Ref(None) => {}
            RefNode::Dir(children) => out.extend(flatten_refs(children, &full)),
        }
    }
    out
}

pub fn head_state(repo: &Repository) -> Result<HeadState> {
    let head = fs::read_to_string(repo.repo_path(&["HEAD"]))?;
    let head = head.trim();
    match head.strip_prefix("ref: ") {
        Some(target) => Ok(HeadState::Branch(
            target
                .trim()
                .strip_prefix("refs/heads/")
                .unwrap_or(target.trim())
                .to_string(),
        )),
        None => Ok(HeadState::Detached(head.to_string())),
    }
}

/// Moves the branch HEAD points to, or HEAD itself when detached.
pub fn update_head(repo: &Repository, sha: &str) -> Result<()> {
    let head = fs::read_to_string(repo.repo_path(&["HEAD"]))?;
    match head.trim().strip_prefix("ref: ") {
        Some(target) => ref_create(repo, target.trim(), sha),
        None => ref_create(repo, "HEAD", sha),
    }
}

fn hash_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9A-Fa-f]{4,40}$").expect("static regex"))
}

/// Every sha `name` could refer to.
pub fn object_resolve(repo: &Repository, name: &str) -> Result<Vec<String>> {
    let name = name.trim();
    let mut candidates: Vec<String> = Vec::new();

    if name.is_empty() {
        return Ok(candidates);
    }

    if name == "HEAD" {
        if let Some(sha) = ref_resolve(repo, "HEAD")? {
            candidates.push(sha);
        }
        return Ok(candidates);
    }

    // 4 is the shortest prefix git accepts as a short hash
    if hash_regex().is_match(name) {
        candidates.extend(repo.objects().find_by_prefix(&name.to_ascii_lowercase())?);
    }

    if validate_ref_name(name).is_ok() {
        for namespace in ["refs/tags", "refs/heads", "refs/remotes"] {
            if let Some(sha) = ref_resolve(repo, &format!("{}/{}", namespace, name))? {
                candidates.push(sha);
            }
        }
    }

    let mut unique = Vec::with_capacity(candidates.len());
    for sha in candidates {
        if !unique.contains(&sha) {
            unique.push(sha);
        }
    }
    Ok(unique)
}

/// Resolves `name` to one sha, optionally peeling it to `kind`.
///
/// With `follow`, tags are peeled to their target and commits to their tree
/// (when a tree was requested). Returns `None` when the object cannot be
/// peeled to `kind`.
pub fn object_find(
    repo: &Repository,
    name: &str,
    kind: Option<ObjectKind>,
    follow: bool,
) -> Result<Option<String>> {
    let mut candidates = object_resolve(repo, name)?;
    let sha = match candidates.len() {
        0 => {
            return Err(TwitError::ObjectNotFound {
                name: name.to_string(),
            })
        }
        1 => candidates.remove(0),
        _ => {
            return Err(TwitError::AmbiguousReference {
                name: name.to_string(),
                candidates,
            })
        }
    };

    let Some(kind) = kind else {
        return Ok(Some(sha));
    };

    let mut sha = sha;
    loop {
        let object = repo.require_object(&sha)?;
        if object.kind() == kind {
            return Ok(Some(sha));
        }
        if !follow {
            return Ok(None);
        }

        let next = match &object {
            GitObject::Tag(tag) => tag.object(),
            GitObject::Commit(commit) if kind == ObjectKind::Tree => commit.tree(),
            _ => None,
        };
        match next {
            Some(next) => {
                tracing::debug!("Peeling {} {} to {}", object.kind(), sha, next);
                sha = next;
            }
            None => return Ok(None),
        }
    }
}

/// [`object_find`] that treats "cannot peel" as a type mismatch error.
pub fn object_find_required(repo: &Repository, name: &str, kind: ObjectKind) -> Result<String> {
    match object_find(repo, name, Some(kind), true)? {
        Some(sha) => Ok(sha),
        None => {
            let sha = object_find(repo, name, None, false)?.unwrap_or_default();
            let actual = repo
                .read_object(&sha)?
                .map(|o| o.kind().to_string())
                .unwrap_or_else(|| "missing object".to_string());
            Err(TwitError::ObjectTypeMismatch {
                sha,
                expected: kind.to_string(),
                actual,
            })
        }
    }
}
