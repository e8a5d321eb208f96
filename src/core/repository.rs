use crate::adapters::LooseObjectStore;
use crate::config::repo_config::RepoConfig;
use crate::domain::model::GitObject;
use crate::utils::error::{Result, TwitError};
use std::fs;
use std::path::{Path, PathBuf};

pub const GIT_DIR: &str = ".git";
const DESCRIPTION: &str = "Unnamed repository; edit this file 'description' to name the repository.\n";

#[derive(Debug, Clone)]
pub struct Repository {
    worktree: PathBuf,
    gitdir: PathBuf,
    config: RepoConfig,
    objects: LooseObjectStore,
}

impl Repository {
    /// Opens the repository whose worktree is `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let worktree = absolutize(path)?;
        let gitdir = worktree.join(GIT_DIR);

        if !gitdir.is_dir() {
            return Err(TwitError::NotARepository { path: worktree });
        }

        let config_file = gitdir.join("config");
        if !config_file.is_file() {
            return Err(TwitError::MissingConfig { path: config_file });
        }
        let config = RepoConfig::from_file(&config_file)?;

        match config.get("core.repositoryformatversion") {
            Some("0") => {}
            other => {
                return Err(TwitError::UnsupportedFormatVersion {
                    version: other.unwrap_or("<missing>").to_string(),
                })
            }
        }

        tracing::debug!("Opened repository at {}", worktree.display());
        Ok(Self::assemble(worktree, gitdir, config))
    }

    /// Creates a new repository at `path`, creating the directory if needed.
    pub fn create(path: &Path, default_branch: &str) -> Result<Self> {
        if path.exists() {
            if !path.is_dir() {
                return Err(TwitError::NotADirectory {
                    path: path.to_path_buf(),
                });
            }
            let gitdir = path.join(GIT_DIR);
            if gitdir.exists() && fs::read_dir(&gitdir)?.next().is_some() {
                return Err(TwitError::RepositoryNotEmpty {
                    path: path.to_path_buf(),
                });
            }
        } else {
            fs::create_dir_all(path)?;
        }

        let worktree = absolutize(path)?;
        let gitdir = worktree.join(GIT_DIR);
        let repo = Self::assemble(worktree, gitdir, RepoConfig::repository_defaults());

        repo.repo_dir(true, &["branches"])?;
        repo.repo_dir(true, &["objects"])?;
        repo.repo_dir(true, &["refs", "tags"])?;
        repo.repo_dir(true, &["refs", "heads"])?;

        fs::write(repo.repo_file(false, &["description"])?, DESCRIPTION)?;
        fs::write(
            repo.repo_file(false, &["HEAD"])?,
            format!("ref: refs/heads/{}\n", default_branch),
        )?;
        fs::write(repo.repo_file(false, &["config"])?, repo.config.to_ini_string())?;

        tracing::info!("Initialized repository in {}", repo.gitdir.display());
        Ok(repo)
    }

    /// Walks up from `start` until a directory containing `.git/` is found.
    pub fn find(start: &Path) -> Result<Self> {
        Self::find_below(start, None)
    }

    /// [`Repository::find`] that neither searches `ceiling` nor anything above it.
    pub fn find_below(start: &Path, ceiling: Option<&Path>) -> Result<Self> {
        let start = absolutize(start)?;
        let ceiling = ceiling.map(absolutize).transpose()?;
        let mut current = start.as_path();
        loop {
            if ceiling.as_deref() == Some(current) {
                tracing::debug!("Stopped repository search at {}", current.display());
                return Err(TwitError::NotARepository { path: start });
            }
            if current.join(GIT_DIR).is_dir() {
                return Self::open(current);
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => return Err(TwitError::NotARepository { path: start }),
            }
        }
    }

    fn assemble(worktree: PathBuf, gitdir: PathBuf, config: RepoConfig) -> Self {
        let objects = LooseObjectStore::new(gitdir.join("objects"));
        Self {
            worktree,
            gitdir,
            config,
            objects,
        }
    }

    pub fn worktree(&self) -> &Path {
        &self.worktree
    }

    pub fn gitdir(&self) -> &Path {
        &self.gitdir
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn objects(&self) -> &LooseObjectStore {
        &self.objects
    }

    /// Path inside `.git`.
    pub fn repo_path(&self, parts: &[&str]) -> PathBuf {
        parts
            .iter()
            .fold(self.gitdir.clone(), |path, part| path.join(part))
    }

    /// Path to a file inside `.git`, optionally creating its parent directories.
    pub fn repo_file(&self, mkdir: bool, parts: &[&str]) -> Result<PathBuf> {
        if mkdir && parts.len() > 1 {
            self.repo_dir(true, &parts[..parts.len() - 1])?;
        }
        Ok(self.repo_path(parts))
    }

    /// Directory inside `.git`; `None` when it is absent and `mkdir` is false.
    pub fn repo_dir(&self, mkdir: bool, parts: &[&str]) -> Result<Option<PathBuf>> {
        let path = self.repo_path(parts);

        if path.exists() {
            if !path.is_dir() {
                return Err(TwitError::NotADirectory { path });
            }
            return Ok(Some(path));
        }

        if mkdir {
            fs::create_dir_all(&path)?;
            return Ok(Some(path));
        }
        Ok(None)
    }

    pub fn read_object(&self, sha: &str) -> Result<Option<GitObject>> {
        crate::core::objects::read_object(&self.objects, sha)
    }

    pub fn require_object(&self, sha: &str) -> Result<GitObject> {
        crate::core::objects::require_object(&self.objects, sha)
    }

    pub fn write_object(&self, object: &GitObject) -> Result<String> {
        crate::core::objects::write_object(&self.objects, object)
    }

    /// Worktree-relative, `/`-separated form of an absolute path inside the worktree.
    pub fn relative_path(&self, absolute: &Path) -> Option<String> {
        let relative = absolute.strip_prefix(&self.worktree).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            return None;
        }
        Some(parts.join("/"))
    }

    /// Absolute path of a worktree-relative name.
    pub fn worktree_path(&self, name: &str) -> PathBuf {
        name.split('/')
            .fold(self.worktree.clone(), |path, part| path.join(part))
    }
}

/// Canonical form when the path exists, otherwise joined onto the current directory.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    if let Ok(canonical) = path.canonicalize() {
        return Ok(canonical);
    }
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
