//! Filesystem-backed asset store and document binding.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

use super::{AssetId, AssetStore, DocumentBinding, StoreError};
use crate::debug;

/// Artifacts as files in one directory, addressed as `assets/<file>`.
#[derive(Debug, Clone)]
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File backing `id`. Identities that would leave the directory are rejected.
    pub fn path_of(&self, id: &AssetId) -> Result<PathBuf, StoreError> {
        let relative = Path::new(id.file_name());
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(relative))
    }

    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
        move |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// First 12 hex chars of the content hash, used in file names.
fn filename_hash(content: &[u8]) -> String {
    let hash = blake3::hash(content);
    hash.to_hex()[..12].to_string()
}

impl AssetStore for FsStore {
    fn upload(&self, bytes: &[u8], name: &str) -> Result<AssetId, StoreError> {
        fs::create_dir_all(&self.dir).map_err(Self::io(&self.dir))?;

        let stem = Path::new(name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "image".to_owned());
        let hash = filename_hash(bytes);

        // Identical content uploaded twice still gets two identities.
        let mut attempt = 0;
        loop {
            let file = match attempt {
                0 => format!("{stem}-{hash}.svg"),
                n => format!("{stem}-{hash}-{n}.svg"),
            };
            attempt += 1;

            let path = self.dir.join(&file);
            let mut handle = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(handle) => handle,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(Self::io(&path)(e)),
            };
            handle.write_all(bytes).map_err(Self::io(&path))?;
            debug!("store"; "uploaded {}", path.display());
            return Ok(AssetId(format!("assets/{file}")));
        }
    }

    fn replace(&self, id: &AssetId, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_of(id)?;
        if !path.is_file() {
            return Err(StoreError::NotFound(id.clone()));
        }

        let dir = path.parent().unwrap_or(&self.dir);
        let mut temp = NamedTempFile::new_in(dir).map_err(Self::io(dir))?;
        temp.write_all(bytes).map_err(Self::io(temp.path()))?;
        temp.persist(&path).map_err(|e| Self::io(&path)(e.error))?;
        debug!("store"; "replaced {}", path.display());
        Ok(())
    }

    fn fetch(&self, id: &AssetId) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_of(id)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io(&path)(e)),
        }
    }
}

/// Writes a markdown image reference into the file named by the location.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileBinding;

impl FileBinding {
    pub fn reference(id: &AssetId) -> String {
        format!("![]({id})\n")
    }
}

impl DocumentBinding for FileBinding {
    fn update_reference(&self, location: &Path, id: &AssetId) -> anyhow::Result<()> {
        use anyhow::Context;

        if let Some(parent) = location.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create `{}`", parent.display()))?;
        }
        fs::write(location, Self::reference(id))
            .with_context(|| format!("Failed to write `{}`", location.display()))
    }
}
