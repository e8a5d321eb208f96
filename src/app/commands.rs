//! Runs a parsed command against a repository and renders its output.

use crate::adapters::MemoryObjectStore;
use crate::config::cli::Commands;
use crate::config::settings::Settings;
use crate::core::checkout::checkout;
use crate::core::commit::{commit, Identity};
use crate::core::history::{commit_graph, list_tree, ListedLeaf, LogNode};
use crate::core::ignore_io::read_ignore_rules;
use crate::core::index_io::read_index;
use crate::core::objects::hash_object;
use crate::core::refs::{flatten_refs, object_find, object_find_required, ref_list, HeadState};
use crate::core::repository::Repository;
use crate::core::staging::{add, rm, worktree_name};
use crate::core::status::{status, Change, StatusReport};
use crate::core::tag::{create_tag, list_tags, Annotation};
use crate::domain::index::Index;
use crate::utils::error::Result;
use chrono::{DateTime, Local};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Where a command runs and with which settings.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub cwd: PathBuf,
    pub settings: Settings,
    /// Repository discovery does not look in or above this directory.
    pub ceiling: Option<PathBuf>,
}

impl CommandContext {
    pub fn new(cwd: PathBuf, settings: Settings) -> Self {
        Self {
            cwd,
            settings,
            ceiling: None,
        }
    }

    pub fn with_ceiling(mut self, ceiling: Option<PathBuf>) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// Relative paths are taken from `cwd`.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    fn repository(&self) -> Result<Repository> {
        Repository::find_below(&self.cwd, self.ceiling.as_deref())
    }
}

pub fn run(command: &Commands, ctx: &CommandContext, out: &mut dyn Write) -> Result<()> {
    tracing::debug!("Running {:?} in {}", command, ctx.cwd.display());

    match command {
        Commands::Init { path } => {
            let repo = Repository::create(&ctx.resolve(path), ctx.settings.default_branch())?;
            writeln!(
                out,
                "Initialized empty twit repository in {}",
                repo.gitdir().display()
            )?;
        }

        Commands::CatFile { kind, object } => {
            let repo = ctx.repository()?;
            let sha = object_find_required(&repo, object, *kind)?;
            let payload = repo.require_object(&sha)?.serialize()?;
            out.write_all(&payload)?;
        }

        Commands::HashObject { write, kind, path } => {
            let data = fs::read(ctx.resolve(path))?;
            let sha = if *write {
                let repo = ctx.repository()?;
                hash_object(&data, *kind, Some(repo.objects()))?
            } else {
                hash_object::<MemoryObjectStore>(&data, *kind, None)?
            };
            writeln!(out, "{}", sha)?;
        }

        Commands::Log { commit } => {
            let repo = ctx.repository()?;
            out.write_all(render_log(&commit_graph(&repo, commit)?).as_bytes())?;
        }

        Commands::LsTree { recursive, tree } => {
            let repo = ctx.repository()?;
            out.write_all(render_tree(&list_tree(&repo, tree, *recursive)?).as_bytes())?;
        }

        Commands::Checkout { commit, path } => {
            let repo = ctx.repository()?;
            checkout(&repo, commit, &ctx.resolve(path))?;
        }

        Commands::ShowRef => {
            let repo = ctx.repository()?;
            for (name, sha) in flatten_refs(&ref_list(&repo)?, "refs") {
                writeln!(out, "{} {}", sha, name)?;
            }
        }

        Commands::Tag {
            annotate,
            message,
            name,
            object,
        } => {
            let repo = ctx.repository()?;
            match name {
                None => {
                    for tag in list_tags(&repo)? {
                        writeln!(out, "{}", tag)?;
                    }
                }
                Some(name) if *annotate => {
                    let tagger = Identity::resolve(&repo, &ctx.settings);
                    let annotation = Annotation {
                        tagger: &tagger,
                        message: message.as_deref().unwrap_or(name),
                        when: Local::now().fixed_offset(),
                    };
                    create_tag(&repo, name, object, Some(annotation))?;
                }
                Some(name) => {
                    create_tag(&repo, name, object, None)?;
                }
            }
        }

        Commands::RevParse { kind, name } => {
            let repo = ctx.repository()?;
            let sha = match kind {
                Some(kind) => object_find_required(&repo, name, *kind)?,
                None => object_find(&repo, name, None, true)?.unwrap_or_default(),
            };
            writeln!(out, "{}", sha)?;
        }

        Commands::LsFiles { verbose } => {
            let repo = ctx.repository()?;
            out.write_all(render_index(&read_index(&repo)?, *verbose).as_bytes())?;
        }

        Commands::CheckIgnore { paths } => {
            let repo = ctx.repository()?;
            let rules = read_ignore_rules(&repo)?;
            for path in paths {
                let name = worktree_name(&repo, &ctx.resolve(Path::new(path)))?;
                if rules.check(&name)? {
                    writeln!(out, "{}", path)?;
                }
            }
        }

        Commands::Status => {
            let repo = ctx.repository()?;
            out.write_all(render_status(&status(&repo)?).as_bytes())?;
        }

        Commands::Rm { paths } => {
            let repo = ctx.repository()?;
            let paths: Vec<PathBuf> = paths.iter().map(|p| ctx.resolve(p)).collect();
            rm(&repo, &paths, true, false)?;
        }

        Commands::Add { paths } => {
            let repo = ctx.repository()?;
            let paths: Vec<PathBuf> = paths.iter().map(|p| ctx.resolve(p)).collect();
            add(&repo, &paths)?;
        }

        Commands::Commit { message } => {
            let repo = ctx.repository()?;
            let identity = Identity::resolve(&repo, &ctx.settings);
            let outcome = commit(&repo, &identity, message)?;
            let branch = match &outcome.head {
                HeadState::Branch(name) => name.clone(),
                HeadState::Detached(_) => "detached HEAD".to_string(),
            };
            writeln!(out, "[{} {}] {}", branch, short(&outcome.sha), outcome.summary)?;
        }
    }

    Ok(())
}

fn short(sha: &str) -> &str {
    &sha[..7.min(sha.len())]
}

/// Graphviz digraph of the commit graph.
pub fn render_log(nodes: &[LogNode]) -> String {
    let mut out = String::from("digraph twitlog{\n  node[shape=rect]\n");
    for node in nodes {
        let label = node.summary.replace('\\', "\\\\").replace('"', "\\\"");
        out.push_str(&format!(
            "  c_{} [label=\"{}: {}\"]\n",
            node.sha,
            short(&node.sha),
            label
        ));
        for parent in &node.parents {
            out.push_str(&format!("  c_{} -> c_{};\n", node.sha, parent));
        }
    }
    out.push_str("}\n");
    out
}

pub fn render_tree(leaves: &[ListedLeaf]) -> String {
    leaves
        .iter()
        .map(|listed| {
            let kind = listed
                .leaf
                .kind()
                .map(|k| k.object_type())
                .unwrap_or("unknown");
            format!(
                "{} {} {}\t{}\n",
                listed.leaf.mode, kind, listed.leaf.sha, listed.path
            )
        })
        .collect()
}

pub fn render_index(index: &Index, verbose: bool) -> String {
    let mut out = String::new();
    if verbose {
        out.push_str(&format!(
            "Index file format v{}, containing {} entries.\n",
            index.version,
            index.entries.len()
        ));
    }

    for entry in &index.entries {
        out.push_str(&format!("{}\n", entry.name));
        if !verbose {
            continue;
        }
        out.push_str(&format!(
            "  {} with perms: {:o}\n",
            entry.type_description(),
            entry.mode_perms
        ));
        out.push_str(&format!("  on blob: {}\n", entry.sha));
        out.push_str(&format!(
            "  created: {}.{}, modified: {}.{}\n",
            local_time(entry.ctime.0),
            entry.ctime.1,
            local_time(entry.mtime.0),
            entry.mtime.1
        ));
        out.push_str(&format!("  device: {}, inode: {}\n", entry.dev, entry.ino));
        out.push_str(&format!("  user: {} group: {}\n", entry.uid, entry.gid));
        out.push_str(&format!(
            "  flags: stage={} assume_valid={}\n",
            entry.flag_stage, entry.flag_assume_valid
        ));
    }
    out
}

fn local_time(seconds: u32) -> String {
    DateTime::from_timestamp(i64::from(seconds), 0)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| seconds.to_string())
}

pub fn render_status(report: &StatusReport) -> String {
    let mut out = match &report.head {
        HeadState::Branch(name) => format!("On branch {}.\n", name),
        HeadState::Detached(sha) => format!("HEAD detached at {}\n", short(sha)),
    };

    out.push_str("Changes to be committed:\n");
    push_changes(&mut out, &report.staged);
    out.push('\n');

    out.push_str("Changes not staged for commit:\n");
    push_changes(&mut out, &report.unstaged);
    out.push('\n');

    out.push_str("Untracked files:\n");
    for path in &report.untracked {
        out.push_str(&format!("  {}\n", path));
    }
    out
}

fn push_changes(out: &mut String, changes: &[Change]) {
    for change in changes {
        out.push_str(&format!("  {:<10}{}\n", format!("{}:", change.kind), change.path));
    }
}
