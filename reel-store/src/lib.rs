#![deny(unused_crate_dependencies)]


mod local;

pub use local::LocalStore;
use std::{
    collections::BTreeSet,
    fmt::{self, Display},
    io,
    path::{Path, PathBuf},
};

/// The set of store paths a string's content depends on.
pub type PathSet = BTreeSet<String>;

/// An absolute path inside a store directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorePath(PathBuf);

impl StorePath {
    pub fn new(path: PathBuf) -> Self {
        StorePath(path)
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// The part of the base name after the hash, e.g. `src` in `<hash>-src`.
    pub fn name(&self) -> &str {
        self.0
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.split_once('-'))
            .map_or("", |(_, name)| name)
    }
}

impl Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("cannot access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("path '{0}' is not in the store")]
    NotInStore(String),
    #[error("path '{0}' is not a valid store path")]
    InvalidPath(String),
    #[error("invalid name '{0}' for a store path")]
    BadName(String),
}

impl StoreError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/**
A content-addressed artifact store.

Paths handed out by a store are derived from the content they hold, so adding
the same content twice yields the same path.
*/
pub trait Store {
    fn store_dir(&self) -> &Path;

    fn is_in_store(&self, path: &Path) -> bool {
        path.starts_with(self.store_dir()) && path != self.store_dir()
    }

    fn is_valid_path(&self, path: &Path) -> bool;

    /// The store path `add_to_store` would return, without copying anything.
    fn compute_store_path(&self, name: &str, source: &Path) -> Result<StorePath, StoreError>;

    fn add_to_store(&self, name: &str, source: &Path, repair: bool)
        -> Result<StorePath, StoreError>;

    fn add_text_to_store(
        &self,
        name: &str,
        text: &[u8],
        references: &PathSet,
    ) -> Result<StorePath, StoreError>;

    /// Make sure every path in `context` is available.
    fn realise(&self, context: &PathSet) -> Result<(), StoreError> {
        match context
            .iter()
            .find(|path| !self.is_valid_path(Path::new(path.as_str())))
        {
            None => Ok(()),
            Some(path) => Err(StoreError::InvalidPath(path.clone())),
        }
    }
}

pub fn check_store_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "+-._?=".contains(c));
    if valid {
        Ok(())
    } else {
        Err(StoreError::BadName(name.to_string()))
    }
}
