//! Collects the ignore rules that apply to a repository.

use crate::config::settings::config_home;
use crate::core::index_io::read_index;
use crate::core::repository::Repository;
use crate::domain::ignore::{parse_rules, IgnoreRule, IgnoreRules};
use crate::domain::model::GitObject;
use crate::utils::error::Result;
use std::fs;
use std::path::Path;

const GITIGNORE: &str = ".gitignore";

/// `.git/info/exclude`, the global `git/ignore` file and every `.gitignore` in the index.
pub fn read_ignore_rules(repo: &Repository) -> Result<IgnoreRules> {
    let mut rules = IgnoreRules::default();

    let exclude = repo.repo_path(&["info", "exclude"]);
    if let Some(set) = read_rule_file(&exclude)? {
        rules.absolute.push(set);
    }

    if let Some(home) = config_home() {
        if let Some(set) = read_rule_file(&home.join("git").join("ignore"))? {
            rules.absolute.push(set);
        }
    }

    // 只讀取已加入索引的 .gitignore
    let index = read_index(repo)?;
    for entry in &index.entries {
        let is_gitignore = entry.name == GITIGNORE || entry.name.ends_with("/.gitignore");
        if !is_gitignore {
            continue;
        }

        let dir = entry
            .name
            .rsplit_once('/')
            .map(|(dir, _)| dir.to_string())
            .unwrap_or_default();

        match repo.read_object(&entry.sha)? {
            Some(GitObject::Blob(data)) => {
                let content = String::from_utf8_lossy(&data);
                tracing::debug!("Loaded ignore rules from {}", entry.name);
                rules.scoped.insert(dir, parse_rules(content.lines()));
            }
            _ => tracing::warn!("Index entry {} does not point to a blob", entry.name),
        }
    }

    Ok(rules)
}

fn read_rule_file(path: &Path) -> Result<Option<Vec<IgnoreRule>>> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    tracing::debug!("Loaded ignore rules from {}", path.display());
    Ok(Some(parse_rules(content.lines())))
}
