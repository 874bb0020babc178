use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use sha2::{Digest, Sha512};

use crate::error::{Result, UpdaterError};

pub const MOD_EXTENSION: &str = ".jar";
pub const HASH_ALGORITHM: &str = "sha512";
const CHUNK_SIZE: usize = 8192;

/// Lowercase hex SHA-512 digest of a file, streamed in fixed-size chunks.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file =
        fs::File::open(path).map_err(|e| UpdaterError::io("hash open error", path, e))?;
    let mut hasher = Sha512::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let read = file
            .read(&mut buf)
            .map_err(|e| UpdaterError::io("hash read error", path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// All mod archives directly inside `folder`, sorted by name. A missing folder has none.
pub fn list_mod_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(UpdaterError::io("failed to read mods folder", folder, err)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| UpdaterError::io("failed to read dir entry", folder, e))?;
        let name = entry.file_name();
        if !name.to_string_lossy().ends_with(MOD_EXTENSION) {
            continue;
        }
        if entry.file_type().is_ok_and(|t| t.is_file()) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Content hash -> file path, in the order files were hashed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashIndex {
    entries: Vec<(String, PathBuf)>,
    positions: HashMap<String, usize>,
}

impl HashIndex {
    /// Insert a file; a repeated hash replaces the earlier path in place.
    pub fn insert(&mut self, hash: String, path: PathBuf) {
        match self.positions.get(&hash) {
            Some(&idx) => self.entries[idx].1 = path,
            None => {
                self.positions.insert(hash.clone(), self.entries.len());
                self.entries.push((hash, path));
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries
            .iter()
            .map(|(hash, path)| (hash.as_str(), path.as_path()))
    }

    pub fn hashes(&self) -> Vec<String> {
        self.entries.iter().map(|(hash, _)| hash.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Hash every file; files that cannot be read are logged and left out.
pub fn build_hash_index<F>(files: &[PathBuf], mut progress: F) -> HashIndex
where
    F: FnMut(&Path),
{
    let mut index = HashIndex::default();
    for path in files {
        match hash_file(path) {
            Ok(hash) => {
                debug!("hashing: {} -> {}…", path.display(), &hash[..16]);
                index.insert(hash, path.clone());
            }
            Err(err) => warn!("hashing: skipping {}: {err}", path.display()),
        }
        progress(path);
    }
    index
}
