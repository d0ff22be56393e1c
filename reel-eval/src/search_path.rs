use crate::{
    error::{EvalError, EvalResult},
    EvalState,
};
use reel_syntax::Pos;
use reel_store::Store;
use std::{
    env, fs,
    path::{Component, Path, PathBuf},
};
use tracing::debug;

/// The file a directory import refers to.
pub const DEFAULT_FILE: &str = "default.reel";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPathEntry {
    /// Empty for entries that match every name.
    pub prefix: String,
    pub location: PathBuf,
}

/// An ordered list of `(prefix, location)` pairs. The first matching entry wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    entries: Vec<SearchPathEntry>,
}

impl SearchPath {
    pub fn new() -> Self {
        SearchPath {
            entries: Vec::new(),
        }
    }

    /// Add an entry of the form `prefix=location` or `location`. A relative
    /// location is taken relative to the current directory.
    pub fn add(&mut self, entry: &str) {
        let (prefix, location) = match entry.split_once('=') {
            Some((prefix, location)) => (prefix, location),
            None => ("", entry),
        };
        debug!(prefix, location, "adding search path entry");
        let location = Path::new(location);
        let location = if location.is_absolute() {
            location.to_path_buf()
        } else {
            canon_path(location)
        };
        self.entries.push(SearchPathEntry {
            prefix: String::from(prefix),
            location,
        });
    }

    pub fn push(&mut self, entry: SearchPathEntry) {
        self.entries.push(entry)
    }

    pub fn entries(&self) -> &[SearchPathEntry] {
        &self.entries
    }

    /**
    Resolve a name like `lib/strings.reel` against the entries.

    An entry with prefix `lib` matches the name `lib` and names starting with
    `lib/`; the remainder is appended to the entry's location. An entry without
    a prefix matches every name. Only existing files count as matches.
    */
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        self.entries.iter().find_map(|entry| {
            let suffix = if entry.prefix.is_empty() {
                name
            } else {
                let rest = name.strip_prefix(entry.prefix.as_str())?;
                if !rest.is_empty() && !rest.starts_with('/') {
                    return None;
                }
                rest.trim_start_matches('/')
            };
            let candidate = if suffix.is_empty() {
                entry.location.clone()
            } else {
                entry.location.join(suffix)
            };
            if candidate.exists() {
                Some(canon_path(&candidate))
            } else {
                None
            }
        })
    }
}

/**
Lexically normalise a path: drop `.`, resolve `..`, collapse separators.
Relative paths are made absolute against the current directory first. Symlinks
are not followed.
*/
pub fn canon_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::from("/");
    if path.is_relative() {
        if let Ok(cwd) = env::current_dir() {
            result = canon_path(&cwd);
        }
    }
    for component in path.components() {
        match component {
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                result.pop();
            }
            Component::Normal(part) => result.push(part),
        }
    }
    result
}

/// If `path` is a directory, the `default.reel` inside it.
pub fn resolve_expr_path(path: &Path) -> PathBuf {
    let path = canon_path(path);
    if path.is_dir() {
        path.join(DEFAULT_FILE)
    } else {
        path
    }
}

impl EvalState {
    pub fn add_to_search_path(&mut self, entry: &str) {
        self.search_path.add(entry)
    }

    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    /// Look a name up in the evaluator's search path.
    pub fn find_file(&self, name: &str, pos: &Pos) -> EvalResult<PathBuf> {
        find_in(&self.search_path, name, pos)
    }

    /**
    In restricted mode, only paths under a search path location or inside the
    store may be accessed. Returns the canonical form of `path`.

    An existing path is checked twice: as written, and again with its symlinks
    resolved, in which case the resolved path is returned.
    */
    pub fn check_source_path(&self, path: &Path, pos: &Pos) -> EvalResult<PathBuf> {
        let path = canon_path(path);
        if !self.config.restricted {
            return Ok(path);
        }
        if !self.is_allowed_path(&path, canon_path) {
            return Err(forbidden(&path, pos));
        }
        match fs::canonicalize(&path) {
            Err(_) => Ok(path),
            Ok(resolved) => {
                if self.is_allowed_path(&resolved, resolve_symlinks) {
                    Ok(resolved)
                } else {
                    Err(forbidden(&resolved, pos))
                }
            }
        }
    }

    fn is_allowed_path(&self, path: &Path, normalise: fn(&Path) -> PathBuf) -> bool {
        let store_dir = normalise(self.store.store_dir());
        self.search_path
            .entries()
            .iter()
            .any(|entry| path.starts_with(normalise(&entry.location)))
            || (path.starts_with(&store_dir) && path != store_dir)
            || self.store.is_in_store(path)
    }
}

/// The path with its symlinks resolved, or its lexical form if it does not exist.
fn resolve_symlinks(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| canon_path(path))
}

fn forbidden(path: &Path, pos: &Pos) -> EvalError {
    EvalError::InvalidPath {
        path: path.display().to_string(),
        reason: "access to this path is forbidden in restricted mode",
        pos: pos.clone(),
    }
}

pub(crate) fn find_in(search_path: &SearchPath, name: &str, pos: &Pos) -> EvalResult<PathBuf> {
    search_path
        .find(name)
        .ok_or_else(|| EvalError::NotFound {
            path: String::from(name),
            pos: pos.clone(),
        })
}
