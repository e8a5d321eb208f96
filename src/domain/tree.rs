//! Tree payloads: `[mode] SP [path] NUL [20-byte sha]`, repeated.

use crate::domain::kvlm::find_byte;
use crate::utils::error::{Result, TwitError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLeaf {
    /// Six octal digits, e.g. `100644` or `040000`.
    pub mode: String,
    pub path: String,
    pub sha: String,
}

/// What a tree leaf points at, derived from its mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Tree,
    Blob,
    Symlink,
    Submodule,
}

impl LeafKind {
    pub fn object_type(self) -> &'static str {
        match self {
            LeafKind::Tree => "tree",
            LeafKind::Blob | LeafKind::Symlink => "blob",
            LeafKind::Submodule => "commit",
        }
    }
}

impl TreeLeaf {
    pub fn new(mode: impl Into<String>, path: impl Into<String>, sha: impl Into<String>) -> Self {
        let mut mode = mode.into();
        if mode.len() == 5 {
            mode.insert(0, '0');
        }
        Self {
            mode,
            path: path.into(),
            sha: sha.into(),
        }
    }

    pub fn kind(&self) -> Option<LeafKind> {
        match self.mode.get(..2)? {
            "04" => Some(LeafKind::Tree),
            "10" => Some(LeafKind::Blob),
            "12" => Some(LeafKind::Symlink),
            "16" => Some(LeafKind::Submodule),
            _ => None,
        }
    }

    pub fn is_tree(&self) -> bool {
        self.kind() == Some(LeafKind::Tree)
    }

    fn sort_key(&self) -> String {
        if self.is_tree() {
            format!("{}/", self.path)
        } else {
            self.path.clone()
        }
    }
}

pub fn parse(raw: &[u8]) -> Result<Vec<TreeLeaf>> {
    let mut leaves = Vec::new();
    let mut pos = 0;

    while pos < raw.len() {
        let (leaf, next) = parse_one(raw, pos)?;
        leaves.push(leaf);
        pos = next;
    }
    Ok(leaves)
}

fn parse_one(raw: &[u8], start: usize) -> Result<(TreeLeaf, usize)> {
    let malformed = |reason: &str| TwitError::MalformedObject {
        sha: String::new(),
        reason: format!("tree entry at byte {}: {}", start, reason),
    };

    let space = find_byte(raw, b' ', start).ok_or_else(|| malformed("missing mode"))?;
    let mode_bytes = &raw[start..space];
    if !(5..=6).contains(&mode_bytes.len()) {
        return Err(malformed("bad mode length"));
    }
    if !mode_bytes.iter().all(|b| (b'0'..=b'7').contains(b)) {
        return Err(malformed("mode is not octal"));
    }
    let mode = String::from_utf8_lossy(mode_bytes).into_owned();

    let nul = find_byte(raw, 0, space).ok_or_else(|| malformed("missing path terminator"))?;
    let path = String::from_utf8_lossy(&raw[space + 1..nul]).into_owned();

    let sha_bytes = raw
        .get(nul + 1..nul + 21)
        .ok_or_else(|| malformed("truncated sha"))?;

    Ok((TreeLeaf::new(mode, path, hex::encode(sha_bytes)), nul + 21))
}

/// Sorts in place, then writes the canonical payload.
pub fn serialize(leaves: &mut [TreeLeaf]) -> Result<Vec<u8>> {
    leaves.sort_by_key(|leaf| leaf.sort_key());

    let mut out = Vec::new();
    for leaf in leaves.iter() {
        // git writes directory modes without the leading zero
        out.extend_from_slice(leaf.mode.trim_start_matches('0').as_bytes());
        out.push(b' ');
        out.extend_from_slice(leaf.path.as_bytes());
        out.push(0);

        let sha = hex::decode(&leaf.sha).map_err(|e| TwitError::MalformedObject {
            sha: leaf.sha.clone(),
            reason: format!("invalid sha in tree leaf {}: {}", leaf.path, e),
        })?;
        if sha.len() != 20 {
            return Err(TwitError::MalformedObject {
                sha: leaf.sha.clone(),
                reason: format!("sha in tree leaf {} is not 20 bytes", leaf.path),
            });
        }
        out.extend_from_slice(&sha);
    }
    Ok(out)
}
