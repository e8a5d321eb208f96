//! The staging area file (`.git/index`), version 2.

use crate::utils::error::{Result, TwitError};
use sha1::{Digest, Sha1};

pub const MODE_TYPE_REGULAR: u32 = 0b1000;
pub const MODE_TYPE_SYMLINK: u32 = 0b1010;
pub const MODE_TYPE_GITLINK: u32 = 0b1110;

const SIGNATURE: &[u8; 4] = b"DIRC";
const HEADER_LEN: usize = 12;
const ENTRY_FIXED_LEN: usize = 62;
const CHECKSUM_LEN: usize = 20;
const NAME_MASK: u16 = 0x0FFF;

/// (seconds, nanoseconds)
pub type Timestamp = (u32, u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub ctime: Timestamp,
    pub mtime: Timestamp,
    pub dev: u32,
    pub ino: u32,
    /// 4-bit object type: regular file, symlink or gitlink.
    pub mode_type: u32,
    pub mode_perms: u32,
    pub uid: u32,
    pub gid: u32,
    pub fsize: u32,
    pub sha: String,
    pub flag_assume_valid: bool,
    pub flag_stage: u16,
    /// Path relative to the worktree, `/`-separated.
    pub name: String,
}

impl IndexEntry {
    pub fn mode(&self) -> u32 {
        (self.mode_type << 12) | self.mode_perms
    }

    /// Tree-style mode string, e.g. `100644`.
    pub fn mode_string(&self) -> String {
        format!("{:o}{:04o}", self.mode_type, self.mode_perms)
    }

    pub fn type_description(&self) -> &'static str {
        match self.mode_type {
            MODE_TYPE_REGULAR => "regular file",
            MODE_TYPE_SYMLINK => "symlink",
            MODE_TYPE_GITLINK => "git link",
            _ => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub version: u32,
    pub entries: Vec<IndexEntry>,
}

impl Default for Index {
    fn default() -> Self {
        Self {
            version: 2,
            entries: Vec::new(),
        }
    }
}

impl Index {
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let mut reader = Reader { raw, pos: 0 };

        if reader.take(4)? != SIGNATURE {
            return Err(invalid("bad signature"));
        }
        let version = reader.u32()?;
        if version != 2 {
            return Err(invalid(&format!("unsupported version {}", version)));
        }
        let count = reader.u32()?;

        // the header count is untrusted; each entry takes at least ENTRY_FIXED_LEN bytes
        let mut entries = Vec::with_capacity((count as usize).min(raw.len() / ENTRY_FIXED_LEN));
        for _ in 0..count {
            entries.push(read_entry(&mut reader)?);
        }

        // Extensions are skipped; the checksum covers everything before it.
        if raw.len() >= reader.pos + CHECKSUM_LEN {
            let body = &raw[..raw.len() - CHECKSUM_LEN];
            let expected = &raw[raw.len() - CHECKSUM_LEN..];
            if Sha1::digest(body).as_slice() != expected {
                return Err(invalid("checksum mismatch"));
            }
        }

        Ok(Index { version, entries })
    }

    /// Entries are sorted by name before writing.
    pub fn serialize(&mut self) -> Vec<u8> {
        self.sort();

        let mut out = Vec::with_capacity(
            HEADER_LEN + self.entries.len() * (ENTRY_FIXED_LEN + 18) + CHECKSUM_LEN,
        );
        out.extend_from_slice(SIGNATURE);
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());

        for entry in &self.entries {
            write_entry(&mut out, entry);
        }

        let checksum = Sha1::digest(&out);
        out.extend_from_slice(&checksum);
        out
    }

    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
    }

    pub fn get(&self, name: &str) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

fn read_entry(reader: &mut Reader<'_>) -> Result<IndexEntry> {
    let start = reader.pos;

    let ctime = (reader.u32()?, reader.u32()?);
    let mtime = (reader.u32()?, reader.u32()?);
    let dev = reader.u32()?;
    let ino = reader.u32()?;
    let mode = reader.u32()?;
    let uid = reader.u32()?;
    let gid = reader.u32()?;
    let fsize = reader.u32()?;
    let sha = hex::encode(reader.take(20)?);
    let flags = reader.u16()?;

    let name_len = flags & NAME_MASK;
    let name_bytes = if name_len < NAME_MASK {
        let bytes = reader.take(name_len as usize)?;
        if reader.take(1)? != [0] {
            return Err(invalid("entry name is not NUL-terminated"));
        }
        bytes
    } else {
        let rest = &reader.raw[reader.pos..];
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| invalid("unterminated long entry name"))?;
        let bytes = reader.take(end)?;
        reader.take(1)?;
        bytes
    };
    let name = String::from_utf8(name_bytes.to_vec())
        .map_err(|_| invalid("entry name is not valid UTF-8"))?;

    let consumed = reader.pos - start;
    reader.take(padding(consumed))?;

    Ok(IndexEntry {
        ctime,
        mtime,
        dev,
        ino,
        mode_type: (mode >> 12) & 0b1111,
        mode_perms: mode & 0o777,
        uid,
        gid,
        fsize,
        sha,
        flag_assume_valid: flags & 0x8000 != 0,
        flag_stage: (flags >> 12) & 0b11,
        name,
    })
}

fn write_entry(out: &mut Vec<u8>, entry: &IndexEntry) {
    let start = out.len();

    for value in [
        entry.ctime.0,
        entry.ctime.1,
        entry.mtime.0,
        entry.mtime.1,
        entry.dev,
        entry.ino,
        entry.mode(),
        entry.uid,
        entry.gid,
        entry.fsize,
    ] {
        out.extend_from_slice(&value.to_be_bytes());
    }

    // validated when the entry was built; a bad sha would already have failed hashing
    let sha = hex::decode(&entry.sha).unwrap_or_else(|_| vec![0; 20]);
    out.extend_from_slice(&sha);

    let name = entry.name.as_bytes();
    let name_len = name.len().min(NAME_MASK as usize) as u16;
    let assume_valid = if entry.flag_assume_valid { 0x8000 } else { 0 };
    let flags = assume_valid | ((entry.flag_stage & 0b11) << 12) | name_len;
    out.extend_from_slice(&flags.to_be_bytes());

    out.extend_from_slice(name);
    out.push(0);

    let written = out.len() - start;
    out.resize(out.len() + padding(written), 0);
}

/// Bytes needed to bring an entry of `len` bytes to a multiple of 8.
fn padding(len: usize) -> usize {
    (8 - len % 8) % 8
}

fn invalid(reason: &str) -> TwitError {
    TwitError::InvalidIndex {
        reason: reason.to_string(),
    }
}

struct Reader<'a> {
    raw: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let bytes = self
            .raw
            .get(self.pos..self.pos + n)
            .ok_or_else(|| invalid("unexpected end of file"))?;
        self.pos += n;
        Ok(bytes)
    }

    fn u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn u16(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }
}
