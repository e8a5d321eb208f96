use anyhow::Result;
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;
use twit::core::checkout::checkout;
use twit::core::commit::{commit, Identity};
use twit::core::history::{commit_graph, list_tree};
use twit::core::index_io::read_index;
use twit::core::refs::{head_state, object_find, ref_resolve, HeadState};
use twit::core::staging::{add, rm};
use twit::{GitObject, ObjectKind, Repository};

fn identity() -> Identity {
    Identity {
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
    }
}

/// 測試完整流程：init → add → commit → 修改 → commit → checkout
#[test]
fn test_init_add_commit_checkout() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let repo = Repository::create(&temp_dir.path().join("work"), "main")?;
    let worktree = repo.worktree().to_path_buf();

    fs::create_dir_all(worktree.join("src/bin"))?;
    fs::write(worktree.join("README.md"), "# demo\n")?;
    fs::write(worktree.join("src/lib.rs"), "pub fn a() {}\n")?;
    fs::write(worktree.join("src/bin/main.rs"), "fn main() {}\n")?;

    add(
        &repo,
        &[
            worktree.join("README.md"),
            worktree.join("src/lib.rs"),
            worktree.join("src/bin/main.rs"),
        ],
    )?;
    let first = commit(&repo, &identity(), "initial import")?;
    assert_eq!(first.head, HeadState::Branch("main".to_string()));

    let names: Vec<String> = read_index(&repo)?.entries.into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["README.md", "src/bin/main.rs", "src/lib.rs"]);

    fs::write(worktree.join("README.md"), "# demo v2\n")?;
    add(&repo, &[worktree.join("README.md")])?;
    rm(&repo, &[worktree.join("src/lib.rs")], true, false)?;
    assert!(!worktree.join("src/lib.rs").exists());
    let second = commit(&repo, &identity(), "second")?;

    assert_eq!(ref_resolve(&repo, "refs/heads/main")?, Some(second.sha.clone()));
    let graph = commit_graph(&repo, "main")?;
    let shas: Vec<&str> = graph.iter().map(|n| n.sha.as_str()).collect();
    assert_eq!(shas, vec![second.sha.as_str(), first.sha.as_str()]);

    let listed: Vec<String> = list_tree(&repo, "HEAD", true)?
        .into_iter()
        .map(|l| l.path)
        .collect();
    assert_eq!(listed, vec!["README.md", "src/bin/main.rs"]);

    let out = temp_dir.path().join("old");
    checkout(&repo, &first.sha, &out)?;
    assert_eq!(fs::read_to_string(out.join("README.md"))?, "# demo\n");
    assert_eq!(fs::read_to_string(out.join("src/lib.rs"))?, "pub fn a() {}\n");
    assert_eq!(fs::read_to_string(out.join("src/bin/main.rs"))?, "fn main() {}\n");

    Ok(())
}

/// 重新開啟儲存庫後，物件與參照依然可讀
#[test]
fn test_reopen_and_resolve_short_names() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let created = Repository::create(temp_dir.path(), "master")?;
    fs::write(created.worktree().join("f.txt"), "content\n")?;
    add(&created, &[created.worktree().join("f.txt")])?;
    let outcome = commit(&created, &identity(), "only")?;

    let repo = Repository::find(&temp_dir.path().join("."))?;
    assert_eq!(
        object_find(&repo, &outcome.sha[..6], None, true)?,
        Some(outcome.sha.clone())
    );

    let tree = object_find(&repo, "master", Some(ObjectKind::Tree), true)?
        .expect("commit peels to its tree");
    match repo.require_object(&tree)? {
        GitObject::Tree(leaves) => {
            assert_eq!(leaves.len(), 1);
            assert_eq!(leaves[0].mode, "100644");
            assert_eq!(leaves[0].path, "f.txt");
        }
        other => panic!("expected a tree, got {}", other.kind()),
    }
    Ok(())
}

/// 分離 HEAD 狀態下提交會直接更新 HEAD
#[test]
fn test_commit_on_detached_head() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let repo = Repository::create(temp_dir.path(), "master")?;
    let base = commit(&repo, &identity(), "base")?;
    fs::write(repo.gitdir().join("HEAD"), format!("{}\n", base.sha))?;

    let next = commit(&repo, &identity(), "detached work")?;
    assert_eq!(head_state(&repo)?, HeadState::Detached(next.sha.clone()));
    assert_eq!(ref_resolve(&repo, "refs/heads/master")?, Some(base.sha));
    Ok(())
}
