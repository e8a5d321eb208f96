use crate::domain::ports::ObjectStore;
use crate::utils::error::Result;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

/// One zlib-compressed file per object under `objects/<2 hex>/<38 hex>`.
#[derive(Debug, Clone)]
pub struct LooseObjectStore {
    base_path: PathBuf,
}

impl LooseObjectStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn object_path(&self, sha: &str) -> PathBuf {
        let (dir, file) = sha.split_at(2.min(sha.len()));
        self.base_path.join(dir).join(file)
    }
}

impl ObjectStore for LooseObjectStore {
    fn read_raw(&self, sha: &str) -> Result<Option<Vec<u8>>> {
        let path = self.object_path(sha);
        if !path.is_file() {
            return Ok(None);
        }

        let compressed = fs::read(&path)?;
        let mut raw = Vec::new();
        ZlibDecoder::new(compressed.as_slice()).read_to_end(&mut raw)?;
        tracing::debug!("Read object {} ({} bytes)", sha, raw.len());
        Ok(Some(raw))
    }

    fn write_raw(&self, sha: &str, framed: &[u8]) -> Result<()> {
        let path = self.object_path(sha);
        if path.exists() {
            tracing::debug!("Object {} already stored", sha);
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(framed)?;
        fs::write(&path, encoder.finish()?)?;
        tracing::debug!("Wrote object {}", sha);
        Ok(())
    }

    fn find_by_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        if prefix.len() < 2 {
            return Ok(Vec::new());
        }
        let (dir, rest) = prefix.split_at(2);
        let dir_path = self.base_path.join(dir);
        if !dir_path.is_dir() {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        for entry in fs::read_dir(&dir_path)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.starts_with(rest) {
                found.push(format!("{}{}", dir, name));
            }
        }
        found.sort();
        Ok(found)
    }
}
