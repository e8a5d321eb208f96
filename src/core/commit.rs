//! Turning the index into trees and commits.

use crate::config::repo_config::RepoConfig;
use crate::config::settings::{config_home, Settings};
use crate::core::index_io::read_index;
use crate::core::refs::{head_state, ref_resolve, update_head, HeadState};
use crate::core::repository::Repository;
use crate::domain::index::{Index, IndexEntry};
use crate::domain::kvlm::Kvlm;
use crate::domain::model::{Commit, GitObject};
use crate::domain::tree::TreeLeaf;
use crate::utils::error::Result;
use chrono::{DateTime, FixedOffset, Local};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

const DIR_MODE: &str = "040000";
const UNKNOWN_NAME: &str = "Unknown";
const UNKNOWN_EMAIL: &str = "unknown@example.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

impl Identity {
    /// Twit settings first, then the repository config, `$XDG_CONFIG_HOME/git/config`
    /// and `~/.gitconfig`.
    pub fn resolve(repo: &Repository, settings: &Settings) -> Self {
        let mut global = Vec::new();
        if let Some(home) = config_home() {
            global.push(home.join("git").join("config"));
        }
        if let Some(home) = dirs::home_dir() {
            global.push(home.join(".gitconfig"));
        }
        Self::resolve_with(repo, settings, &global)
    }

    /// [`Identity::resolve`] with explicit global config files. Files that are
    /// missing or unreadable are skipped.
    pub fn resolve_with(repo: &Repository, settings: &Settings, global: &[PathBuf]) -> Self {
        let mut configs = vec![repo.config().clone()];
        for path in global {
            match RepoConfig::from_optional_file(path) {
                Ok(config) => configs.push(config),
                Err(e) => tracing::warn!("⚠️ Skipping {}: {}", path.display(), e),
            }
        }

        let lookup = |key: &str| -> Option<String> {
            configs
                .iter()
                .find_map(|config| config.get(key).map(str::to_string))
        };

        let name = settings
            .user_name()
            .map(str::to_string)
            .or_else(|| lookup("user.name"))
            .unwrap_or_else(|| UNKNOWN_NAME.to_string());
        let email = settings
            .user_email()
            .map(str::to_string)
            .or_else(|| lookup("user.email"))
            .unwrap_or_else(|| UNKNOWN_EMAIL.to_string());

        Self { name, email }
    }
}

enum Item<'a> {
    Entry(&'a IndexEntry),
    Dir(String),
}

/// Writes one tree per directory in `index`, deepest first. Returns the root tree's sha.
pub fn tree_from_index(repo: &Repository, index: &Index) -> Result<String> {
    let mut contents: BTreeMap<String, Vec<Item<'_>>> = BTreeMap::new();
    contents.insert(String::new(), Vec::new());

    for entry in &index.entries {
        let dirname = parent_of(&entry.name);

        // 確保每一層父目錄都有對應的節點
        let mut key = dirname;
        while !key.is_empty() && !contents.contains_key(key) {
            contents.insert(key.to_string(), Vec::new());
            key = parent_of(key);
        }

        if let Some(items) = contents.get_mut(dirname) {
            items.push(Item::Entry(entry));
        }
    }

    let mut paths: Vec<String> = contents.keys().cloned().collect();
    paths.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut shas: HashMap<String, String> = HashMap::new();
    for path in paths {
        let items = contents.remove(&path).unwrap_or_default();
        let mut leaves = Vec::with_capacity(items.len());

        for item in items {
            match item {
                Item::Entry(entry) => {
                    leaves.push(TreeLeaf::new(
                        entry.mode_string(),
                        base_name(&entry.name),
                        entry.sha.clone(),
                    ));
                }
                Item::Dir(dir) => {
                    if let Some(sha) = shas.get(&dir) {
                        leaves.push(TreeLeaf::new(DIR_MODE, base_name(&dir), sha.clone()));
                    }
                }
            }
        }

        let sha = repo.write_object(&GitObject::Tree(leaves))?;
        tracing::debug!("Wrote tree {} for {:?}", sha, path);

        if path.is_empty() {
            return Ok(sha);
        }
        if let Some(parent) = contents.get_mut(parent_of(&path)) {
            parent.push(Item::Dir(path.clone()));
        }
        shas.insert(path, sha);
    }

    // unreachable: the root key is inserted up front and sorts last
    repo.write_object(&GitObject::Tree(Vec::new()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub sha: String,
    pub head: HeadState,
    pub summary: String,
}

/// Commits the index with the current local time.
pub fn commit(repo: &Repository, identity: &Identity, message: &str) -> Result<CommitOutcome> {
    commit_at(repo, identity, message, Local::now().fixed_offset())
}

pub fn commit_at(
    repo: &Repository,
    identity: &Identity,
    message: &str,
    when: DateTime<FixedOffset>,
) -> Result<CommitOutcome> {
    let index = read_index(repo)?;
    let tree = tree_from_index(repo, &index)?;

    let mut kvlm = Kvlm::new();
    kvlm.push("tree", tree.into_bytes());
    if let Some(parent) = ref_resolve(repo, "HEAD")? {
        kvlm.push("parent", parent.into_bytes());
    }

    let stamp = signature(identity, when);
    kvlm.push("author", stamp.clone().into_bytes());
    kvlm.push("committer", stamp.into_bytes());

    let mut body = message.to_string();
    if !body.ends_with('\n') {
        body.push('\n');
    }
    kvlm.set_message(body.into_bytes());

    let commit = Commit { kvlm };
    let summary = commit.summary();
    let sha = repo.write_object(&GitObject::Commit(commit))?;
    update_head(repo, &sha)?;

    let head = head_state(repo)?;
    tracing::info!("Committed {} on {:?}", sha, head);
    Ok(CommitOutcome { sha, head, summary })
}

/// `Name <email> <unix seconds> <+HHMM>`, as in `author`, `committer` and `tagger`.
pub fn signature(identity: &Identity, when: DateTime<FixedOffset>) -> String {
    format!("{} {} {}", identity, when.timestamp(), when.format("%z"))
}

fn parent_of(path: &str) -> &str {
    path.rfind('/').map(|idx| &path[..idx]).unwrap_or("")
}

fn base_name(path: &str) -> &str {
    path.rfind('/').map(|idx| &path[idx + 1..]).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::staging::add;
    use crate::domain::model::ObjectKind;
    use std::fs;
    use tempfile::TempDir;

    fn repo() -> (TempDir, Repository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::create(temp_dir.path(), "master").unwrap();
        (temp_dir, repo)
    }

    fn identity() -> Identity {
        Identity {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
        }
    }

    fn fixed_time() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-01-02T03:04:05+08:00").unwrap()
    }

    #[test]
    fn test_empty_index_is_empty_tree() {
        let (_dir, repo) = repo();
        let sha = tree_from_index(&repo, &Index::default()).unwrap();
        assert_eq!(sha, "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
    }

    #[test]
    fn test_nested_directories_become_subtrees() {
        let (_dir, repo) = repo();
        let worktree = repo.worktree().to_path_buf();
        fs::create_dir_all(worktree.join("src/core")).unwrap();
        fs::write(worktree.join("README"), "readme\n").unwrap();
        fs::write(worktree.join("src/core/lib.rs"), "lib\n").unwrap();
        add(
            &repo,
            &[worktree.join("README"), worktree.join("src/core/lib.rs")],
        )
        .unwrap();

        let root = tree_from_index(&repo, &read_index(&repo).unwrap()).unwrap();
        let leaves = match repo.require_object(&root).unwrap() {
            GitObject::Tree(leaves) => leaves,
            other => panic!("expected tree, got {:?}", other.kind()),
        };
        let names: Vec<&str> = leaves.iter().map(|l| l.path.as_str()).collect();
        assert_eq!(names, vec!["README", "src"]);
        assert!(leaves[1].is_tree());

        let src = match repo.require_object(&leaves[1].sha).unwrap() {
            GitObject::Tree(leaves) => leaves,
            other => panic!("expected tree, got {:?}", other.kind()),
        };
        assert_eq!(src.len(), 1);
        assert_eq!(src[0].path, "core");
    }

    #[test]
    fn test_commit_chain_and_signature() {
        let (_dir, repo) = repo();
        let file = repo.worktree().join("a.txt");
        fs::write(&file, "a\n").unwrap();
        add(&repo, &[file.clone()]).unwrap();

        let first = commit_at(&repo, &identity(), "first", fixed_time()).unwrap();
        assert_eq!(first.head, HeadState::Branch("master".to_string()));
        assert_eq!(first.summary, "first");

        fs::write(&file, "b\n").unwrap();
        add(&repo, &[file]).unwrap();
        let second = commit_at(&repo, &identity(), "second\n", fixed_time()).unwrap();

        let commit = match repo.require_object(&second.sha).unwrap() {
            GitObject::Commit(commit) => commit,
            other => panic!("expected commit, got {:?}", other.kind()),
        };
        assert_eq!(commit.parents(), vec![first.sha.clone()]);
        assert_eq!(
            commit.author().as_deref(),
            Some("Jane Doe <jane@example.com> 1704135845 +0800")
        );
        assert_eq!(commit.message(), "second\n");
        assert_eq!(
            ref_resolve(&repo, "refs/heads/master").unwrap(),
            Some(second.sha)
        );
    }

    #[test]
    fn test_first_commit_has_no_parent() {
        let (_dir, repo) = repo();
        let outcome = commit_at(&repo, &identity(), "empty", fixed_time()).unwrap();

        match repo.require_object(&outcome.sha).unwrap() {
            GitObject::Commit(commit) => {
                assert!(commit.parents().is_empty());
                assert_eq!(
                    commit.tree().as_deref(),
                    Some("4b825dc642cb6eb9a060e54bf8d69288fbee4904")
                );
            }
            other => panic!("expected commit, got {:?}", other.kind()),
        }
        assert_eq!(repo.require_object(&outcome.sha).unwrap().kind(), ObjectKind::Commit);
    }

    #[test]
    fn test_settings_identity_wins() {
        let (_dir, repo) = repo();
        let settings =
            Settings::from_toml_str("[user]\nname = \"Cfg\"\nemail = \"cfg@example.com\"\n")
                .unwrap();
        let identity = Identity::resolve_with(&repo, &settings, &[]);
        assert_eq!(identity.to_string(), "Cfg <cfg@example.com>");
    }

    #[test]
    fn test_unparseable_global_config_is_skipped() {
        let (dir, repo) = repo();
        let broken = dir.path().join("broken-config");
        fs::write(&broken, "[user]\n\tname = Broken\n\tthis is not = valid\n").unwrap();
        let global = dir.path().join("gitconfig");
        fs::write(
            &global,
            "[alias]\n\tlg = log --graph \\\n\t  --oneline\n[user]\n\tname = Global\n\temail = g@example.com\n",
        )
        .unwrap();

        let identity = Identity::resolve_with(
            &repo,
            &Settings::default(),
            &[broken, dir.path().join("missing"), global],
        );
        assert_eq!(identity.to_string(), "Global <g@example.com>");
    }

    #[test]
    fn test_identity_falls_back_to_unknown() {
        let (_dir, repo) = repo();
        let identity = Identity::resolve_with(&repo, &Settings::default(), &[]);
        assert_eq!(identity.to_string(), "Unknown <unknown@example.com>");
    }
}
