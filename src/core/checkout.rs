use crate::core::refs::object_find_required;
use crate::core::repository::{Repository, GIT_DIR};
use crate::domain::model::{GitObject, ObjectKind};
use crate::domain::tree::TreeLeaf;
use crate::utils::error::{Result, TwitError};
use std::fs;
use std::path::Path;

/// Writes the tree of `name` (a commit, tag or tree) into `dest`.
///
/// `dest` must be missing or an empty directory. Returns the number of files written.
pub fn checkout(repo: &Repository, name: &str, dest: &Path) -> Result<usize> {
    let tree_sha = object_find_required(repo, name, ObjectKind::Tree)?;

    if dest.exists() {
        if !dest.is_dir() {
            return Err(TwitError::NotADirectory {
                path: dest.to_path_buf(),
            });
        }
        if fs::read_dir(dest)?.next().is_some() {
            return Err(TwitError::DirectoryNotEmpty {
                path: dest.to_path_buf(),
            });
        }
    } else {
        fs::create_dir_all(dest)?;
    }

    let leaves = read_tree(repo, &tree_sha)?;
    let written = checkout_tree(repo, &leaves, dest)?;
    tracing::info!("Checked out {} files from {} into {}", written, name, dest.display());
    Ok(written)
}

fn checkout_tree(repo: &Repository, leaves: &[TreeLeaf], dest: &Path) -> Result<usize> {
    let mut written = 0;
    for leaf in leaves {
        let target = dest.join(checked_leaf_path(leaf)?);
        match repo.require_object(&leaf.sha)? {
            GitObject::Tree(children) => {
                fs::create_dir(&target)?;
                written += checkout_tree(repo, &children, &target)?;
            }
            GitObject::Blob(data) => {
                fs::write(&target, data)?;
                written += 1;
            }
            other => {
                tracing::warn!("Skipping {} entry {}", other.kind(), leaf.path);
            }
        }
    }
    Ok(written)
}

/// A leaf name must stay inside the directory it is written to.
fn checked_leaf_path(leaf: &TreeLeaf) -> Result<&str> {
    let name = leaf.path.as_str();
    let escapes = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
        || Path::new(name).is_absolute()
        || name.eq_ignore_ascii_case(GIT_DIR);
    if escapes {
        return Err(TwitError::MalformedObject {
            sha: leaf.sha.clone(),
            reason: format!("tree leaf {:?} is not a plain file name", name),
        });
    }
    Ok(name)
}

pub(crate) fn read_tree(repo: &Repository, sha: &str) -> Result<Vec<TreeLeaf>> {
    match repo.require_object(sha)? {
        GitObject::Tree(leaves) => Ok(leaves),
        other => Err(TwitError::ObjectTypeMismatch {
            sha: sha.to_string(),
            expected: ObjectKind::Tree.to_string(),
            actual: other.kind().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::commit::{commit, Identity};
    use crate::core::staging::add;
    use tempfile::TempDir;

    fn committed_repo() -> (TempDir, Repository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::create(temp_dir.path(), "master").unwrap();
        let worktree = repo.worktree().to_path_buf();
        fs::create_dir(worktree.join("docs")).unwrap();
        fs::write(worktree.join("a.txt"), "a\n").unwrap();
        fs::write(worktree.join("docs/guide.md"), "# guide\n").unwrap();
        add(&repo, &[worktree.join("a.txt"), worktree.join("docs/guide.md")]).unwrap();
        let identity = Identity {
            name: "T".to_string(),
            email: "t@example.com".to_string(),
        };
        commit(&repo, &identity, "init").unwrap();
        (temp_dir, repo)
    }

    #[test]
    fn test_checkout_into_new_directory() {
        let (_dir, repo) = committed_repo();
        let out = TempDir::new().unwrap();
        let dest = out.path().join("copy");

        let written = checkout(&repo, "HEAD", &dest).unwrap();
        assert_eq!(written, 2);
        assert_eq!(fs::read_to_string(dest.join("a.txt")).unwrap(), "a\n");
        assert_eq!(
            fs::read_to_string(dest.join("docs").join("guide.md")).unwrap(),
            "# guide\n"
        );
    }

    #[test]
    fn test_checkout_refuses_non_empty_directory() {
        let (_dir, repo) = committed_repo();
        let out = TempDir::new().unwrap();
        fs::write(out.path().join("existing"), "x").unwrap();

        assert!(matches!(
            checkout(&repo, "HEAD", out.path()),
            Err(TwitError::DirectoryNotEmpty { .. })
        ));
    }

    fn tree_with_leaf(repo: &Repository, name: &str) -> String {
        let blob = repo
            .write_object(&GitObject::Blob(b"escaped\n".to_vec()))
            .unwrap();
        repo.write_object(&GitObject::Tree(vec![TreeLeaf::new("100644", name, blob)]))
            .unwrap()
    }

    #[test]
    fn test_checkout_rejects_leaf_names_leaving_destination() {
        let (_dir, repo) = committed_repo();
        let out = TempDir::new().unwrap();

        for (case, name) in ["../escaped.txt", "..", ".", "", ".git"].iter().enumerate() {
            let tree = tree_with_leaf(&repo, name);
            let dest = out.path().join(format!("copy{}", case));
            assert!(
                matches!(
                    checkout(&repo, &tree, &dest),
                    Err(TwitError::MalformedObject { .. })
                ),
                "leaf {:?}",
                name
            );
        }
        assert!(!out.path().join("escaped.txt").exists());

        let absolute = out.path().join("absolute.txt");
        let tree = tree_with_leaf(&repo, absolute.to_str().unwrap());
        assert!(checkout(&repo, &tree, &out.path().join("copy-abs")).is_err());
        assert!(!absolute.exists());
    }

    #[test]
    fn test_checkout_refuses_file_destination() {
        let (_dir, repo) = committed_repo();
        let out = TempDir::new().unwrap();
        let file = out.path().join("file");
        fs::write(&file, "x").unwrap();

        assert!(matches!(
            checkout(&repo, "HEAD", &file),
            Err(TwitError::NotADirectory { .. })
        ));
    }
}
