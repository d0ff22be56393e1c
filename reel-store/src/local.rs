use crate::{check_store_name, PathSet, Store, StoreError, StorePath};
use sha2::{Digest, Sha256};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Number of digest bytes kept in a store path's hash part.
const HASH_PART_BYTES: usize = 16;

/**
A store kept in a local directory.

Files are added under `<dir>/<hash>-<name>`, where `<hash>` is derived from a
SHA-256 digest of the content and the store directory itself.
*/
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir).map_err(|err| StoreError::io(dir, err))?;
        Ok(LocalStore {
            dir: dir.to_path_buf(),
        })
    }

    fn make_store_path(&self, kind: &str, name: &str, digest: &[u8]) -> StorePath {
        let fingerprint = format!(
            "{}:sha256:{}:{}:{}",
            kind,
            hex::encode(digest),
            self.dir.display(),
            name
        );
        let hash = Sha256::digest(fingerprint.as_bytes());
        StorePath::new(self.dir.join(format!(
            "{}-{}",
            hex::encode(&hash[..HASH_PART_BYTES]),
            name
        )))
    }

    fn hash_tree(&self, path: &Path) -> Result<Vec<u8>, StoreError> {
        let mut hasher = Sha256::new();
        dump_tree(path, &mut hasher)?;
        Ok(hasher.finalize().to_vec())
    }
}

/**
Feed a deterministic serialisation of the tree at `path` to `hasher`.

Directory entries are visited in byte order of their names. Only the content,
the executable bit and symlink targets contribute, so timestamps and ownership
never change the result.
*/
fn dump_tree(path: &Path, hasher: &mut Sha256) -> Result<(), StoreError> {
    let meta = fs::symlink_metadata(path).map_err(|err| StoreError::io(path, err))?;
    let file_type = meta.file_type();
    if file_type.is_symlink() {
        let target = fs::read_link(path).map_err(|err| StoreError::io(path, err))?;
        hasher.update(b"symlink\0");
        hasher.update(target.to_string_lossy().as_bytes());
        hasher.update(b"\0");
    } else if file_type.is_dir() {
        let mut entries = fs::read_dir(path)
            .map_err(|err| StoreError::io(path, err))?
            .map(|entry| entry.map(|entry| entry.file_name()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| StoreError::io(path, err))?;
        entries.sort();
        hasher.update(b"dir\0");
        for name in entries {
            hasher.update(b"entry\0");
            hasher.update(name.to_string_lossy().as_bytes());
            hasher.update(b"\0");
            dump_tree(&path.join(&name), hasher)?;
        }
        hasher.update(b"end\0");
    } else {
        let contents = fs::read(path).map_err(|err| StoreError::io(path, err))?;
        hasher.update(b"file\0");
        hasher.update(if is_executable(&meta) { b"x" } else { b"-" });
        hasher.update((contents.len() as u64).to_le_bytes());
        hasher.update(&contents);
    }
    Ok(())
}

#[cfg(unix)]
fn is_executable(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &fs::Metadata) -> bool {
    false
}

fn copy_tree(from: &Path, to: &Path) -> Result<(), StoreError> {
    let meta = fs::symlink_metadata(from).map_err(|err| StoreError::io(from, err))?;
    let file_type = meta.file_type();
    if file_type.is_symlink() {
        let target = fs::read_link(from).map_err(|err| StoreError::io(from, err))?;
        make_symlink(&target, to)
    } else if file_type.is_dir() {
        fs::create_dir(to).map_err(|err| StoreError::io(to, err))?;
        for entry in fs::read_dir(from).map_err(|err| StoreError::io(from, err))? {
            let entry = entry.map_err(|err| StoreError::io(from, err))?;
            copy_tree(&entry.path(), &to.join(entry.file_name()))?;
        }
        Ok(())
    } else {
        fs::copy(from, to)
            .map(|_| ())
            .map_err(|err| StoreError::io(to, err))
    }
}

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> Result<(), StoreError> {
    std::os::unix::fs::symlink(target, link).map_err(|err| StoreError::io(link, err))
}

#[cfg(not(unix))]
fn make_symlink(target: &Path, link: &Path) -> Result<(), StoreError> {
    fs::copy(target, link)
        .map(|_| ())
        .map_err(|err| StoreError::io(link, err))
}

fn remove_tree(path: &Path) -> Result<(), StoreError> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(_) => return Ok(()),
    };
    if meta.is_dir() {
        fs::remove_dir_all(path).map_err(|err| StoreError::io(path, err))
    } else {
        fs::remove_file(path).map_err(|err| StoreError::io(path, err))
    }
}

impl Store for LocalStore {
    fn store_dir(&self) -> &Path {
        &self.dir
    }

    fn is_valid_path(&self, path: &Path) -> bool {
        path.parent() == Some(self.dir.as_path()) && fs::symlink_metadata(path).is_ok()
    }

    fn compute_store_path(&self, name: &str, source: &Path) -> Result<StorePath, StoreError> {
        check_store_name(name)?;
        let digest = self.hash_tree(source)?;
        Ok(self.make_store_path("source", name, &digest))
    }

    fn add_to_store(
        &self,
        name: &str,
        source: &Path,
        repair: bool,
    ) -> Result<StorePath, StoreError> {
        let store_path = self.compute_store_path(name, source)?;
        let dest = store_path.as_path();
        let exists = fs::symlink_metadata(dest).is_ok();
        if exists && !repair {
            return Ok(store_path);
        }
        if exists {
            remove_tree(dest)?;
        }
        debug!(source = %source.display(), dest = %store_path, "copying into the store");
        copy_tree(source, dest)?;
        Ok(store_path)
    }

    fn add_text_to_store(
        &self,
        name: &str,
        text: &[u8],
        references: &PathSet,
    ) -> Result<StorePath, StoreError> {
        check_store_name(name)?;
        let kind = references
            .iter()
            .fold(String::from("text"), |mut kind, reference| {
                kind.push(':');
                kind.push_str(reference);
                kind
            });
        let store_path = self.make_store_path(&kind, name, &Sha256::digest(text));
        let dest = store_path.as_path();
        if fs::symlink_metadata(dest).is_err() {
            debug!(dest = %store_path, "writing text into the store");
            fs::write(dest, text).map_err(|err| StoreError::io(dest, err))?;
        }
        Ok(store_path)
    }
}
