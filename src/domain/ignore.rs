//! gitignore rules.
//!
//! Scoped rule sets come from `.gitignore` files tracked in the index and only
//! apply below their directory. Absolute rule sets (`.git/info/exclude`, the
//! global ignore file) apply everywhere at a lower priority.

use crate::utils::error::{Result, TwitError};
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct IgnoreRule {
    pub pattern: String,
    /// `!pattern`: re-include what an earlier rule excluded.
    pub negated: bool,
    pub dir_only: bool,
    pub anchored: bool,
    regex: Regex,
}

impl IgnoreRule {
    pub fn parse(line: &str) -> Option<Self> {
        let line = trim_trailing_spaces(line.trim_end_matches(['\r', '\n']));
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let (negated, mut pattern) = match line.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, line.strip_prefix('\\').unwrap_or(line)),
        };

        let dir_only = pattern.ends_with('/') && pattern.len() > 1;
        if dir_only {
            pattern = &pattern[..pattern.len() - 1];
        }
        let anchored = pattern.contains('/');
        let pattern = pattern.strip_prefix('/').unwrap_or(pattern);
        if pattern.is_empty() {
            return None;
        }

        match Regex::new(&glob_to_regex(pattern)) {
            Ok(regex) => Some(Self {
                pattern: pattern.to_string(),
                negated,
                dir_only,
                anchored,
                regex,
            }),
            Err(e) => {
                tracing::warn!("Skipping unusable ignore pattern {:?}: {}", line, e);
                None
            }
        }
    }

    /// `path` is relative to the directory declaring the rule.
    pub fn matches(&self, path: &str) -> bool {
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        let count = components.len();

        (1..=count).any(|depth| {
            let is_dir = depth < count;
            if self.dir_only && !is_dir {
                return false;
            }
            if self.anchored {
                self.regex.is_match(&components[..depth].join("/"))
            } else {
                self.regex.is_match(components[depth - 1])
            }
        })
    }
}

pub fn parse_rules<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<IgnoreRule> {
    lines.into_iter().filter_map(IgnoreRule::parse).collect()
}

/// Last matching rule wins; `None` when nothing matched.
fn check_ruleset(rules: &[IgnoreRule], path: &str) -> Option<bool> {
    rules
        .iter()
        .rev()
        .find(|rule| rule.matches(path))
        .map(|rule| !rule.negated)
}

#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    pub absolute: Vec<Vec<IgnoreRule>>,
    /// Keyed by the directory holding the `.gitignore`, `""` for the root.
    pub scoped: HashMap<String, Vec<IgnoreRule>>,
}

impl IgnoreRules {
    pub fn check(&self, path: &str) -> Result<bool> {
        if path.starts_with('/') || PathBuf::from(path).is_absolute() {
            return Err(TwitError::PathOutsideWorktree {
                path: PathBuf::from(path),
            });
        }

        if let Some(result) = self.check_scoped(path) {
            return Ok(result);
        }
        Ok(self
            .absolute
            .iter()
            .find_map(|rules| check_ruleset(rules, path))
            .unwrap_or(false))
    }

    fn check_scoped(&self, path: &str) -> Option<bool> {
        let mut dir = parent_dir(path);
        loop {
            if let Some(rules) = self.scoped.get(dir) {
                let relative = if dir.is_empty() {
                    path
                } else {
                    &path[dir.len() + 1..]
                };
                if let Some(result) = check_ruleset(rules, relative) {
                    return Some(result);
                }
            }
            if dir.is_empty() {
                return None;
            }
            dir = parent_dir(dir);
        }
    }
}

fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|idx| &path[..idx]).unwrap_or("")
}

fn trim_trailing_spaces(line: &str) -> &str {
    let trimmed = line.trim_end_matches(' ');
    // "\ " keeps one escaped space
    if trimmed.ends_with('\\') && trimmed.len() < line.len() {
        &line[..trimmed.len() + 1]
    } else {
        trimmed
    }
}

/// Translates a glob into an anchored regular expression.
pub fn glob_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut regex = String::from("^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                if chars.get(i + 1) == Some(&'/') {
                    i += 1;
                    regex.push_str("(?:.*/)?");
                } else {
                    regex.push_str(".*");
                }
            }
            '*' => regex.push_str("[^/]*"),
            '?' => regex.push_str("[^/]"),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    regex.push('[');
                    let mut j = i + 1;
                    if matches!(chars.get(j), Some('!') | Some('^')) {
                        regex.push('^');
                        j += 1;
                    }
                    for &c in &chars[j..end] {
                        if matches!(c, '\\' | '[' | '&' | '~') {
                            regex.push('\\');
                        }
                        regex.push(c);
                    }
                    regex.push(']');
                    i = end;
                }
                None => regex.push_str(r"\["),
            },
            '\\' => {
                if let Some(&next) = chars.get(i + 1) {
                    regex.push_str(&regex::escape(&next.to_string()));
                    i += 1;
                }
            }
            c => regex.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    regex.push('$');
    regex
}

/// Index of the `]` closing the class opened at `start`.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if matches!(chars.get(j), Some('!') | Some('^')) {
        j += 1;
    }
    // a leading ']' is a literal member
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    (j..chars.len()).find(|&k| chars[k] == ']')
}
