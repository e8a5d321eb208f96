use crate::core::commit::{signature, Identity};
use crate::core::refs::{flatten_refs, object_find, ref_create, ref_list, RefNode};
use crate::core::repository::Repository;
use crate::domain::kvlm::Kvlm;
use crate::domain::model::{GitObject, Tag};
use crate::utils::error::{Result, TwitError};
use crate::utils::validation::validate_ref_name;
use chrono::{DateTime, FixedOffset};

/// Tag names under `refs/tags`, sorted.
pub fn list_tags(repo: &Repository) -> Result<Vec<String>> {
    let refs = ref_list(repo)?;
    match refs.get("tags") {
        Some(RefNode::Dir(tags)) => Ok(flatten_refs(tags, "")
            .into_iter()
            .map(|(name, _)| name)
            .collect()),
        _ => Ok(Vec::new()),
    }
}

/// The annotation of an annotated tag.
#[derive(Debug, Clone)]
pub struct Annotation<'a> {
    pub tagger: &'a Identity,
    pub message: &'a str,
    pub when: DateTime<FixedOffset>,
}

/// Creates `refs/tags/<name>` pointing at `target`, or at a new tag object when annotated.
///
/// Returns the sha the ref now holds.
pub fn create_tag(
    repo: &Repository,
    name: &str,
    target: &str,
    annotation: Option<Annotation<'_>>,
) -> Result<String> {
    validate_ref_name(name)?;

    let target_sha = object_find(repo, target, None, true)?.ok_or_else(|| {
        TwitError::ObjectNotFound {
            name: target.to_string(),
        }
    })?;

    let sha = match annotation {
        None => target_sha,
        Some(annotation) => {
            let kind = repo.require_object(&target_sha)?.kind();
            let mut kvlm = Kvlm::new();
            kvlm.push("object", target_sha.into_bytes());
            kvlm.push("type", kind.as_str().as_bytes().to_vec());
            kvlm.push("tag", name.as_bytes().to_vec());
            kvlm.push(
                "tagger",
                signature(annotation.tagger, annotation.when).into_bytes(),
            );
            let mut message = annotation.message.to_string();
            if !message.ends_with('\n') {
                message.push('\n');
            }
            kvlm.set_message(message.into_bytes());
            repo.write_object(&GitObject::Tag(Tag { kvlm }))?
        }
    };

    if repo.repo_path(&["refs", "tags", name]).exists() {
        tracing::warn!("Overwriting existing tag {}", name);
    }
    ref_create(repo, &format!("refs/tags/{}", name), &sha)?;
    tracing::info!("Tagged {} as {}", target, name);
    Ok(sha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::commit::commit;
    use crate::core::refs::ref_resolve;
    use crate::domain::model::ObjectKind;
    use tempfile::TempDir;

    fn identity() -> Identity {
        Identity {
            name: "T".to_string(),
            email: "t@example.com".to_string(),
        }
    }

    #[test]
    fn test_lightweight_and_annotated_tags() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::create(temp_dir.path(), "master").unwrap();
        let head = commit(&repo, &identity(), "base").unwrap();

        let light = create_tag(&repo, "v1", "HEAD", None).unwrap();
        assert_eq!(light, head.sha);

        let tagger = identity();
        let annotated = create_tag(
            &repo,
            "v2",
            "HEAD",
            Some(Annotation {
                tagger: &tagger,
                message: "release two",
                when: DateTime::parse_from_rfc3339("2024-05-06T07:08:09+00:00").unwrap(),
            }),
        )
        .unwrap();
        assert_eq!(ref_resolve(&repo, "refs/tags/v2").unwrap(), Some(annotated.clone()));

        match repo.require_object(&annotated).unwrap() {
            GitObject::Tag(tag) => {
                assert_eq!(tag.object(), Some(head.sha.clone()));
                assert_eq!(tag.target_kind().as_deref(), Some(ObjectKind::Commit.as_str()));
                assert_eq!(tag.name().as_deref(), Some("v2"));
            }
            other => panic!("expected tag, got {:?}", other.kind()),
        }

        assert_eq!(list_tags(&repo).unwrap(), vec!["v1", "v2"]);
    }

    #[test]
    fn test_invalid_tag_name() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::create(temp_dir.path(), "master").unwrap();
        commit(&repo, &identity(), "base").unwrap();

        assert!(matches!(
            create_tag(&repo, "bad name", "HEAD", None),
            Err(TwitError::InvalidRefName { .. })
        ));
    }
}
