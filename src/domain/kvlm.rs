//! Key-value list with message: the payload format shared by commits and tags.
//!
//! ```text
//! tree 29ff16c9c14e2652b22f8b78bb08a5a07930c147
//! parent 206941306e8a8af65b66eaaaea388a7ae24d49a0
//! author Jane <jane@example.com> 1527025023 +0200
//!
//! Message body
//! ```

use crate::utils::error::{Result, TwitError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Kvlm {
    fields: Vec<(String, Vec<Vec<u8>>)>,
    message: Vec<u8>,
}

impl Kvlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(raw: &[u8]) -> Result<Self> {
        let mut kvlm = Kvlm::new();
        let mut pos = 0;

        loop {
            let space = find_byte(raw, b' ', pos);
            let newline = find_byte(raw, b'\n', pos);

            // A blank line (or no more keys) starts the message.
            let space = match (space, newline) {
                (Some(s), Some(n)) if s < n => s,
                (Some(s), None) => s,
                _ => {
                    if pos < raw.len() {
                        if raw[pos] != b'\n' {
                            return Err(TwitError::MalformedObject {
                                sha: String::new(),
                                reason: "header line without a value".to_string(),
                            });
                        }
                        kvlm.message = raw[pos + 1..].to_vec();
                    }
                    return Ok(kvlm);
                }
            };

            let key = String::from_utf8_lossy(&raw[pos..space]).into_owned();

            // Continuation lines start with a single space.
            let mut end = newline.unwrap_or(raw.len());
            while end + 1 < raw.len() && raw[end + 1] == b' ' {
                end = find_byte(raw, b'\n', end + 1).unwrap_or(raw.len());
            }

            let value = unfold(&raw[space + 1..end]);
            kvlm.push(&key, value);

            pos = (end + 1).min(raw.len());
            if end >= raw.len() {
                return Ok(kvlm);
            }
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();

        for (key, values) in &self.fields {
            for value in values {
                out.extend_from_slice(key.as_bytes());
                out.push(b' ');
                for &b in value {
                    out.push(b);
                    if b == b'\n' {
                        out.push(b' ');
                    }
                }
                out.push(b'\n');
            }
        }

        out.push(b'\n');
        out.extend_from_slice(&self.message);
        out
    }

    /// First value of `key`.
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.get_all(key).first().map(Vec::as_slice)
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(|value| String::from_utf8_lossy(value).into_owned())
    }

    pub fn get_all(&self, key: &str) -> &[Vec<u8>] {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    /// Appends a value, keeping the first-seen key order.
    pub fn push(&mut self, key: &str, value: Vec<u8>) {
        match self.fields.iter_mut().find(|(k, _)| k == key) {
            Some((_, values)) => values.push(value),
            None => self.fields.push((key.to_string(), vec![value])),
        }
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }

    pub fn set_message(&mut self, message: Vec<u8>) {
        self.message = message;
    }
}

fn unfold(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    let mut i = 0;
    while i < value.len() {
        out.push(value[i]);
        if value[i] == b'\n' && value.get(i + 1) == Some(&b' ') {
            i += 1;
        }
        i += 1;
    }
    out
}

pub(crate) fn find_byte(raw: &[u8], target: u8, start: usize) -> Option<usize> {
    raw.get(start..)?
        .iter()
        .position(|&b| b == target)
        .map(|offset| start + offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMIT: &[u8] = concat!(
        "tree 29ff16c9c14e2652b22f8b78bb08a5a07930c147\n",
        "parent 206941306e8a8af65b66eaaaea388a7ae24d49a0\n",
        "author Thibault Polge <thibault@thb.lt> 1527025023 +0200\n",
        "committer Thibault Polge <thibault@thb.lt> 1527025044 +0200\n",
        "gpgsig -----BEGIN PGP SIGNATURE-----\n",
        " \n",
        " iQIzBAABCAAdFiEExwXquOM8bWb4Q2zVGxM2FxoLkGQFAlsEjZQACgkQGxM2FxoL\n",
        " =lgTX\n",
        " -----END PGP SIGNATURE-----\n",
        "\n",
        "Create first draft\n",
    )
    .as_bytes();

    #[test]
    fn test_parse_commit_fields() {
        let kvlm = Kvlm::parse(COMMIT).unwrap();

        assert_eq!(
            kvlm.get_str("tree").as_deref(),
            Some("29ff16c9c14e2652b22f8b78bb08a5a07930c147")
        );
        assert_eq!(kvlm.get_all("parent").len(), 1);
        assert!(kvlm.get("committer").is_some());
        let sig = kvlm.get_str("gpgsig").unwrap();
        assert!(sig.starts_with("-----BEGIN PGP SIGNATURE-----\n\niQIz"));
        assert!(sig.ends_with("\n-----END PGP SIGNATURE-----"));
        assert_eq!(kvlm.message(), b"Create first draft\n");
    }

    #[test]
    fn test_serialize_reproduces_input() {
        let kvlm = Kvlm::parse(COMMIT).unwrap();
        assert_eq!(kvlm.serialize(), COMMIT);
    }

    #[test]
    fn test_repeated_keys_accumulate() {
        let raw = b"parent aaaa\nparent bbbb\n\nmerge\n";
        let kvlm = Kvlm::parse(raw).unwrap();
        assert_eq!(kvlm.get_all("parent"), &[b"aaaa".to_vec(), b"bbbb".to_vec()]);
        assert_eq!(kvlm.get("parent"), Some(&b"aaaa"[..]));
        assert_eq!(kvlm.serialize(), raw);
    }

    #[test]
    fn test_pushed_values_serialize_in_order() {
        let mut kvlm = Kvlm::new();
        kvlm.push("tree", b"t".to_vec());
        kvlm.push("parent", b"one".to_vec());
        kvlm.push("author", b"a".to_vec());
        kvlm.push("parent", b"two".to_vec());
        kvlm.set_message(b"msg\n".to_vec());
        assert_eq!(
            kvlm.serialize(),
            b"tree t\nparent one\nparent two\nauthor a\n\nmsg\n"
        );
    }

    #[test]
    fn test_empty_payload() {
        let kvlm = Kvlm::parse(b"").unwrap();
        assert!(kvlm.get("tree").is_none());
        assert!(kvlm.message().is_empty());
    }
}
