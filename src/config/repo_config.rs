use crate::utils::error::{Result, TwitError};
use regex::Regex;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::OnceLock;

/// Git-style INI configuration (`.git/config`, `~/.gitconfig`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoConfig {
    sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Section {
    name: String,
    subsection: Option<String>,
    entries: Vec<(String, String)>,
}

impl Section {
    fn matches(&self, name: &str, subsection: Option<&str>) -> bool {
        self.name == name && self.subsection.as_deref() == subsection
    }
}

fn section_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\[\s*([A-Za-z0-9.-]+)(?:\s+"((?:[^"\\]|\\.)*)")?\s*\]$"#)
            .expect("static regex")
    })
}

fn entry_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z][A-Za-z0-9-]*)\s*(?:=\s*(.*))?$").expect("static regex"))
}

impl RepoConfig {
    /// Defaults written by `init`.
    pub fn repository_defaults() -> Self {
        let mut config = Self::default();
        config.set("core", None, "repositoryformatversion", "0");
        config.set("core", None, "filemode", "false");
        config.set("core", None, "bare", "false");
        config
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| match e {
            TwitError::ConfigValidationError { message, .. } => TwitError::ConfigValidationError {
                field: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Missing files read as an empty config.
    pub fn from_optional_file(path: &Path) -> Result<Self> {
        if path.is_file() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut config = Self::default();

        for (number, logical) in logical_lines(content) {
            let line = logical.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(caps) = section_regex().captures(line) {
                config.sections.push(Section {
                    name: caps[1].to_ascii_lowercase(),
                    subsection: caps.get(2).map(|m| unescape(m.as_str())),
                    entries: Vec::new(),
                });
                continue;
            }

            let caps = entry_regex()
                .captures(line)
                .ok_or_else(|| TwitError::ConfigValidationError {
                    field: "config".to_string(),
                    message: format!("line {}: cannot parse {:?}", number + 1, line),
                })?;
            let section = config
                .sections
                .last_mut()
                .ok_or_else(|| TwitError::ConfigValidationError {
                    field: "config".to_string(),
                    message: format!("line {}: key outside of a section", number + 1),
                })?;

            let key = caps[1].to_ascii_lowercase();
            // a bare key means true
            let value = caps
                .get(2)
                .map(|m| unquote(m.as_str().trim()))
                .unwrap_or_else(|| "true".to_string());
            section.entries.push((key, value));
        }

        Ok(config)
    }

    /// Last value wins, as in git. `name` is `section.key` or `section.sub.key`.
    pub fn get(&self, name: &str) -> Option<&str> {
        let (section, subsection, key) = split_name(name)?;
        self.sections
            .iter()
            .filter(|s| s.matches(&section, subsection.as_deref()))
            .flat_map(|s| s.entries.iter())
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
            .last()
    }

    pub fn set(&mut self, section: &str, subsection: Option<&str>, key: &str, value: &str) {
        let section_name = section.to_ascii_lowercase();
        let key = key.to_ascii_lowercase();

        let index = match self
            .sections
            .iter()
            .position(|s| s.matches(&section_name, subsection))
        {
            Some(index) => index,
            None => {
                self.sections.push(Section {
                    name: section_name,
                    subsection: subsection.map(str::to_string),
                    entries: Vec::new(),
                });
                self.sections.len() - 1
            }
        };

        let entries = &mut self.sections[index].entries;
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => entries.push((key, value.to_string())),
        }
    }

    pub fn to_ini_string(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            match &section.subsection {
                Some(sub) => {
                    let escaped = sub.replace('\\', "\\\\").replace('"', "\\\"");
                    let _ = writeln!(out, "[{} \"{}\"]", section.name, escaped);
                }
                None => {
                    let _ = writeln!(out, "[{}]", section.name);
                }
            }
            for (key, value) in &section.entries {
                let _ = writeln!(out, "\t{} = {}", key, quote_if_needed(value));
            }
        }
        out
    }
}

fn split_name(name: &str) -> Option<(String, Option<String>, String)> {
    let first = name.find('.')?;
    let last = name.rfind('.')?;
    let section = name[..first].to_ascii_lowercase();
    let key = name[last + 1..].to_ascii_lowercase();
    let subsection = (first != last).then(|| name[first + 1..last].to_string());
    Some((section, subsection, key))
}

/// Comment-stripped lines with `\`-continued lines joined, each with the
/// zero-based number of the line it started on.
fn logical_lines(content: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (number, raw_line) in content.lines().enumerate() {
        let (start, mut joined) = pending.take().unwrap_or((number, String::new()));
        joined.push_str(raw_line);

        let stripped = strip_comment(&joined).to_string();
        let trailing = stripped.len() - stripped.trim_end_matches('\\').len();
        if trailing % 2 == 1 {
            pending = Some((start, stripped[..stripped.len() - 1].to_string()));
        } else {
            lines.push((start, stripped));
        }
    }
    if let Some(last) = pending {
        lines.push(last);
    }
    lines
}

/// Drops `#`/`;` comments that are not inside double quotes.
fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    let mut escaped = false;
    for (idx, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            '#' | ';' if !in_quotes => return &line[..idx],
            _ => {}
        }
    }
    line
}

fn unquote(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {}
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            },
            c => out.push(c),
        }
    }
    out
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn quote_if_needed(value: &str) -> String {
    let needs_quotes = value.starts_with(' ')
        || value.ends_with(' ')
        || value.contains(['#', ';', '"', '\\', '\n', '\t']);
    if !needs_quotes {
        return value.to_string();
    }
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t");
    format!("\"{}\"", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_defaults_serialize_like_git() {
        let config = RepoConfig::repository_defaults();
        assert_eq!(
            config.to_ini_string(),
            "[core]\n\trepositoryformatversion = 0\n\tfilemode = false\n\tbare = false\n"
        );
    }

    #[test]
    fn test_parse_sections_and_subsections() {
        let content = r#"
# global settings
[core]
    repositoryformatversion = 0
    bare
[User]
    Name = Jane Doe ; trailing comment
    email = "jane@example.com"
[remote "origin"]
    url = https://example.com/repo.git
"#;
        let config = RepoConfig::parse(content).unwrap();

        assert_eq!(config.get("core.repositoryformatversion"), Some("0"));
        assert_eq!(config.get("core.bare"), Some("true"));
        assert_eq!(config.get("user.name"), Some("Jane Doe"));
        assert_eq!(config.get("USER.EMAIL"), Some("jane@example.com"));
        assert_eq!(
            config.get("remote.origin.url"),
            Some("https://example.com/repo.git")
        );
        assert_eq!(config.get("remote.url"), None);
    }

    #[test]
    fn test_last_value_wins() {
        let config = RepoConfig::parse("[user]\nname = A\n[user]\nname = B\n").unwrap();
        assert_eq!(config.get("user.name"), Some("B"));
    }

    #[test]
    fn test_rejects_keys_outside_sections() {
        assert!(RepoConfig::parse("name = orphan\n").is_err());
        assert!(RepoConfig::parse("[core]\n= nokey\n").is_err());
    }

    #[test]
    fn test_backslash_continues_value() {
        let content = "[alias]\n\tlg = log --graph \\\n\t  --oneline\n[user]\n\tname = Jane\n";
        let config = RepoConfig::parse(content).unwrap();
        assert_eq!(config.get("alias.lg"), Some("log --graph \t  --oneline"));
        assert_eq!(config.get("user.name"), Some("Jane"));
    }

    #[test]
    fn test_escaped_backslash_does_not_continue() {
        let config = RepoConfig::parse("[core]\n\tpath = C:\\\\\n\tbare\n").unwrap();
        assert_eq!(config.get("core.path"), Some("C:\\"));
        assert_eq!(config.get("core.bare"), Some("true"));
    }

    #[test]
    fn test_set_and_reparse() {
        let mut config = RepoConfig::default();
        config.set("user", None, "name", "Jane # Doe");
        config.set("branch", Some("main"), "remote", "origin");

        let reparsed = RepoConfig::parse(&config.to_ini_string()).unwrap();
        assert_eq!(reparsed.get("user.name"), Some("Jane # Doe"));
        assert_eq!(reparsed.get("branch.main.remote"), Some("origin"));
    }
}
