use crate::utils::error::{Result, TwitError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BRANCH: &str = "master";
pub const CONFIG_ENV: &str = "TWIT_CONFIG";
const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Tool settings from `$XDG_CONFIG_HOME/twit/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub user: Option<UserSettings>,
    pub core: Option<CoreSettings>,
    pub log: Option<LogSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserSettings {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreSettings {
    pub default_branch: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogSettings {
    pub level: Option<String>,
}

impl Settings {
    /// 從 TOML 檔案載入設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析設定
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| TwitError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 依序尋找設定檔：TWIT_CONFIG，然後 XDG 設定目錄；都沒有就用預設值
    pub fn load() -> Result<Self> {
        match Self::locate() {
            Some(path) if path.is_file() => {
                tracing::debug!("Loading settings from {}", path.display());
                Self::from_file(path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        config_home().map(|dir| dir.join("twit").join("config.toml"))
    }

    /// 替換環境變數 (例如 ${GIT_AUTHOR_EMAIL})
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user.as_ref()?.name.as_deref()
    }

    pub fn user_email(&self) -> Option<&str> {
        self.user.as_ref()?.email.as_deref()
    }

    /// 取得預設分支名稱
    pub fn default_branch(&self) -> &str {
        self.core
            .as_ref()
            .and_then(|c| c.default_branch.as_deref())
            .unwrap_or(DEFAULT_BRANCH)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.log.as_ref()?.level.as_deref()
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        if let Some(name) = self.user_name() {
            validation::validate_non_empty_string("user.name", name)?;
        }
        if let Some(email) = self.user_email() {
            validation::validate_email("user.email", email)?;
        }
        validation::validate_ref_name(self.default_branch()).map_err(|_| {
            TwitError::InvalidConfigValueError {
                field: "core.default_branch".to_string(),
                value: self.default_branch().to_string(),
                reason: "Not a valid branch name".to_string(),
            }
        })?;
        if let Some(level) = self.log_level() {
            validation::validate_one_of("log.level", level, LOG_LEVELS)?;
        }
        Ok(())
    }
}

/// `$XDG_CONFIG_HOME`, falling back to `~/.config`.
pub fn config_home() -> Option<PathBuf> {
    match std::env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::home_dir().map(|home| home.join(".config")),
    }
}
