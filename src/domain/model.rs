use crate::domain::kvlm::Kvlm;
use crate::domain::tree::{self, TreeLeaf};
use crate::utils::error::{Result, TwitError};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Blob,
    Commit,
    Tree,
    Tag,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Commit => "commit",
            ObjectKind::Tree => "tree",
            ObjectKind::Tag => "tag",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = TwitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "blob" => Ok(ObjectKind::Blob),
            "commit" => Ok(ObjectKind::Commit),
            "tree" => Ok(ObjectKind::Tree),
            "tag" => Ok(ObjectKind::Tag),
            other => Err(TwitError::UnknownObjectType {
                kind: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub kvlm: Kvlm,
}

impl Commit {
    pub fn tree(&self) -> Option<String> {
        self.kvlm.get_str("tree")
    }

    pub fn parents(&self) -> Vec<String> {
        self.kvlm
            .get_all("parent")
            .iter()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .collect()
    }

    pub fn author(&self) -> Option<String> {
        self.kvlm.get_str("author")
    }

    pub fn committer(&self) -> Option<String> {
        self.kvlm.get_str("committer")
    }

    pub fn message(&self) -> String {
        String::from_utf8_lossy(self.kvlm.message()).into_owned()
    }

    /// First line of the message, trimmed.
    pub fn summary(&self) -> String {
        self.message()
            .trim()
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    }
}

/// Annotated tag. Same payload layout as a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub kvlm: Kvlm,
}

impl Tag {
    pub fn object(&self) -> Option<String> {
        self.kvlm.get_str("object")
    }

    pub fn target_kind(&self) -> Option<String> {
        self.kvlm.get_str("type")
    }

    pub fn name(&self) -> Option<String> {
        self.kvlm.get_str("tag")
    }

    pub fn tagger(&self) -> Option<String> {
        self.kvlm.get_str("tagger")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitObject {
    Blob(Vec<u8>),
    Commit(Commit),
    Tree(Vec<TreeLeaf>),
    Tag(Tag),
}

impl GitObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            GitObject::Blob(_) => ObjectKind::Blob,
            GitObject::Commit(_) => ObjectKind::Commit,
            GitObject::Tree(_) => ObjectKind::Tree,
            GitObject::Tag(_) => ObjectKind::Tag,
        }
    }

    pub fn deserialize(kind: ObjectKind, data: &[u8]) -> Result<Self> {
        Ok(match kind {
            ObjectKind::Blob => GitObject::Blob(data.to_vec()),
            ObjectKind::Commit => GitObject::Commit(Commit {
                kvlm: Kvlm::parse(data)?,
            }),
            ObjectKind::Tree => GitObject::Tree(tree::parse(data)?),
            ObjectKind::Tag => GitObject::Tag(Tag {
                kvlm: Kvlm::parse(data)?,
            }),
        })
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        match self {
            GitObject::Blob(data) => Ok(data.clone()),
            GitObject::Commit(commit) => Ok(commit.kvlm.serialize()),
            GitObject::Tree(leaves) => {
                let mut leaves = leaves.clone();
                tree::serialize(&mut leaves)
            }
            GitObject::Tag(tag) => Ok(tag.kvlm.serialize()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_kind_from_str() {
        assert_eq!("tree".parse::<ObjectKind>().unwrap(), ObjectKind::Tree);
        assert!(matches!(
            "note".parse::<ObjectKind>(),
            Err(TwitError::UnknownObjectType { .. })
        ));
    }

    #[test]
    fn test_commit_accessors() {
        let raw = b"tree aaaa\nparent p1\nparent p2\nauthor A <a@x> 1 +0000\n\n  Subject line\n\nBody\n";
        let GitObject::Commit(commit) = GitObject::deserialize(ObjectKind::Commit, raw).unwrap()
        else {
            panic!("expected a commit");
        };
        assert_eq!(commit.tree().as_deref(), Some("aaaa"));
        assert_eq!(commit.parents(), vec!["p1", "p2"]);
        assert_eq!(commit.summary(), "Subject line");
        assert_eq!(commit.committer(), None);
    }
}
