use crate::domain::kvlm::find_byte;
use crate::domain::model::{GitObject, ObjectKind};
use crate::domain::ports::ObjectStore;
use crate::utils::error::{Result, TwitError};
use sha1::{Digest, Sha1};

/// `<kind> <size>\0<payload>`
pub fn frame(kind: ObjectKind, payload: &[u8]) -> Vec<u8> {
    let mut framed = format!("{} {}\0", kind, payload.len()).into_bytes();
    framed.extend_from_slice(payload);
    framed
}

pub fn sha_of(framed: &[u8]) -> String {
    hex::encode(Sha1::digest(framed))
}

/// Splits framed bytes into kind and payload, checking the declared size.
pub fn unframe<'a>(sha: &str, raw: &'a [u8]) -> Result<(ObjectKind, &'a [u8])> {
    let malformed = |reason: String| TwitError::MalformedObject {
        sha: sha.to_string(),
        reason,
    };

    let space = find_byte(raw, b' ', 0).ok_or_else(|| malformed("missing header".to_string()))?;
    let nul = find_byte(raw, 0, space)
        .ok_or_else(|| malformed("unterminated header".to_string()))?;

    let kind_name = String::from_utf8_lossy(&raw[..space]);
    let kind: ObjectKind = kind_name.parse()?;

    let size: usize = std::str::from_utf8(&raw[space + 1..nul])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| malformed("bad size".to_string()))?;

    let payload = &raw[nul + 1..];
    if size != payload.len() {
        return Err(malformed(format!(
            "bad length (declared {}, found {})",
            size,
            payload.len()
        )));
    }
    Ok((kind, payload))
}

pub fn read_object<S: ObjectStore + ?Sized>(store: &S, sha: &str) -> Result<Option<GitObject>> {
    let Some(raw) = store.read_raw(sha)? else {
        return Ok(None);
    };
    let (kind, payload) = unframe(sha, &raw)?;
    GitObject::deserialize(kind, payload)
        .map(Some)
        .map_err(|e| match e {
            TwitError::MalformedObject { reason, .. } => TwitError::MalformedObject {
                sha: sha.to_string(),
                reason,
            },
            other => other,
        })
}

/// Like [`read_object`] but a missing object is an error.
pub fn require_object<S: ObjectStore + ?Sized>(store: &S, sha: &str) -> Result<GitObject> {
    read_object(store, sha)?.ok_or_else(|| TwitError::ObjectNotFound {
        name: sha.to_string(),
    })
}

pub fn write_object<S: ObjectStore + ?Sized>(store: &S, object: &GitObject) -> Result<String> {
    write_payload(Some(store), object.kind(), &object.serialize()?)
}

/// Hashes `payload` as `kind`; stores it when a store is given.
pub fn write_payload<S: ObjectStore + ?Sized>(
    store: Option<&S>,
    kind: ObjectKind,
    payload: &[u8],
) -> Result<String> {
    let framed = frame(kind, payload);
    let sha = sha_of(&framed);
    if let Some(store) = store {
        store.write_raw(&sha, &framed)?;
    }
    Ok(sha)
}

/// Hashes raw file content as an object of `kind`. Non-blob payloads must parse.
pub fn hash_object<S: ObjectStore + ?Sized>(
    data: &[u8],
    kind: ObjectKind,
    store: Option<&S>,
) -> Result<String> {
    if kind != ObjectKind::Blob {
        GitObject::deserialize(kind, data)?;
    }
    write_payload(store, kind, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryObjectStore;
    use crate::domain::kvlm::Kvlm;
    use crate::domain::model::Commit;

    #[test]
    fn test_blob_hash_matches_git() {
        // git hash-object on "hello\n"
        let sha = hash_object::<MemoryObjectStore>(b"hello\n", ObjectKind::Blob, None).unwrap();
        assert_eq!(sha, "ce013625030ba8dba906f756967f9e9ca394464a");

        let empty = hash_object::<MemoryObjectStore>(b"", ObjectKind::Blob, None).unwrap();
        assert_eq!(empty, "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
    }

    #[test]
    fn test_empty_tree_hash_matches_git() {
        let store = MemoryObjectStore::new();
        let sha = write_object(&store, &GitObject::Tree(Vec::new())).unwrap();
        assert_eq!(sha, "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
    }

    #[test]
    fn test_write_and_read_commit() {
        let store = MemoryObjectStore::new();
        let mut kvlm = Kvlm::new();
        kvlm.push("tree", b"4b825dc642cb6eb9a060e54bf8d69288fbee4904".to_vec());
        kvlm.push("author", b"A <a@example.com> 0 +0000".to_vec());
        kvlm.set_message(b"init\n".to_vec());
        let commit = GitObject::Commit(Commit { kvlm });

        let sha = write_object(&store, &commit).unwrap();
        assert_eq!(read_object(&store, &sha).unwrap(), Some(commit));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_hash_without_store_writes_nothing() {
        let store = MemoryObjectStore::new();
        hash_object::<MemoryObjectStore>(b"data", ObjectKind::Blob, None).unwrap();
        assert!(store.is_empty());
        assert!(read_object(&store, "ce013625030ba8dba906f756967f9e9ca394464a")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_bad_length_is_malformed() {
        let store = MemoryObjectStore::new();
        store.write_raw("abcd", b"blob 10\0short").unwrap();
        assert!(matches!(
            read_object(&store, "abcd"),
            Err(TwitError::MalformedObject { .. })
        ));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let store = MemoryObjectStore::new();
        store.write_raw("abcd", b"note 2\0hi").unwrap();
        assert!(matches!(
            read_object(&store, "abcd"),
            Err(TwitError::UnknownObjectType { .. })
        ));
    }

    #[test]
    fn test_hash_object_validates_trees() {
        let result = hash_object::<MemoryObjectStore>(b"garbage", ObjectKind::Tree, None);
        assert!(result.is_err());
    }
}
