use crate::{
    error::{EvalError, EvalResult},
    search_path::canon_path,
    value::{Repr, Value, ValueType},
    EvalState,
};
use reel_store::{PathSet, Store};
use reel_syntax::Pos;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// The store name for a source path: its base name, with characters the store
/// does not accept replaced.
pub(crate) fn store_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || "+-._?=".contains(c) {
                c
            } else {
                '_'
            }
        })
        .collect();
    match name.strip_prefix('.') {
        Some(rest) if !rest.is_empty() => format!("_{}", rest),
        _ if name.is_empty() || name == "." => String::from("source"),
        _ => name,
    }
}

impl EvalState {
    /**
    Convert a value to a string.

    Strings, paths, and sets with `__toString` or `outPath` are always
    accepted. With `coerce_more`, so are booleans (`"1"` or `""`), integers,
    null (`""`) and lists (elements joined with spaces). Paths are copied to the
    store when `copy_to_store` is set, and the store path becomes part of the
    context.
    */
    pub fn coerce_to_string(
        &mut self,
        pos: &Pos,
        value: &Value,
        context: &mut PathSet,
        coerce_more: bool,
        copy_to_store: bool,
    ) -> EvalResult<String> {
        self.force_value(value, pos)?;
        match value.get() {
            Repr::String(s) => {
                context.extend(s.context.iter().cloned());
                Ok(String::from(s.text.as_ref()))
            }
            Repr::Path(path) => {
                if copy_to_store {
                    self.copy_path_to_store(context, &path, pos)
                } else {
                    Ok(path.display().to_string())
                }
            }
            Repr::Attrs(attrs) => {
                if let Some(attr) = attrs.get(self.names.to_string) {
                    let to_string = attr.value.clone();
                    let result = self.call_function(&to_string, value.clone(), pos)?;
                    return self.coerce_to_string(pos, &result, context, coerce_more, copy_to_store);
                }
                match attrs.get(self.names.out_path) {
                    Some(attr) => {
                        let out_path = attr.value.clone();
                        self.coerce_to_string(pos, &out_path, context, coerce_more, copy_to_store)
                    }
                    None => Err(EvalError::TypeMismatch {
                        expected: ValueType::String,
                        actual: ValueType::Attrs,
                        pos: pos.clone(),
                    }),
                }
            }
            Repr::Bool(b) if coerce_more => Ok(String::from(if b { "1" } else { "" })),
            Repr::Int(n) if coerce_more => Ok(n.to_string()),
            Repr::Null if coerce_more => Ok(String::new()),
            Repr::List(items) if coerce_more => {
                let mut result = String::new();
                for (ix, item) in items.iter().enumerate() {
                    let s = self.coerce_to_string(pos, item, context, coerce_more, copy_to_store)?;
                    result.push_str(&s);
                    // Empty lists don't add a separator.
                    let is_empty_list = matches!(item.get(), Repr::List(l) if l.is_empty());
                    if ix + 1 < items.len() && !is_empty_list {
                        result.push(' ');
                    }
                }
                Ok(result)
            }
            _ => Err(EvalError::TypeMismatch {
                expected: ValueType::String,
                actual: value.value_type(),
                pos: pos.clone(),
            }),
        }
    }

    /**
    Copy a source path into the store, once per run.

    In playback, sources recorded under their original location are answered
    from the recording's source map without hashing anything.
    */
    pub fn copy_path_to_store(
        &mut self,
        context: &mut PathSet,
        path: &Path,
        pos: &Pos,
    ) -> EvalResult<String> {
        let store_path = if let Some(recorded) = self.playback_source(path) {
            trace!(path = %path.display(), "using recorded store path");
            recorded
        } else if let Some(store_path) = self.src_to_store.get(path) {
            store_path.clone()
        } else {
            let source = self.check_source_path(path, pos)?;
            let store_path =
                self.store
                    .add_to_store(&store_name(&source), &source, self.config.repair)?;
            debug!(path = %path.display(), store_path = %store_path, "copied source to the store");
            self.src_to_store
                .insert(path.to_path_buf(), store_path.clone());
            store_path
        };
        let store_path = store_path.to_string();
        context.insert(store_path.clone());
        Ok(store_path)
    }

    pub fn copy_path_to_store_if_not_already_there(
        &mut self,
        context: &mut PathSet,
        path: &Path,
        pos: &Pos,
    ) -> EvalResult<String> {
        if self.store.is_in_store(path) {
            let path = path.display().to_string();
            context.insert(path.clone());
            Ok(path)
        } else {
            self.copy_path_to_store(context, path, pos)
        }
    }

    /// Convert a value to an absolute, canonical path. Nothing is copied.
    pub fn coerce_to_path(
        &mut self,
        pos: &Pos,
        value: &Value,
        context: &mut PathSet,
    ) -> EvalResult<PathBuf> {
        let path = self.coerce_to_string(pos, value, context, false, false)?;
        if !path.starts_with('/') {
            return Err(EvalError::InvalidPath {
                path,
                reason: "string does not represent an absolute path",
                pos: pos.clone(),
            });
        }
        Ok(canon_path(Path::new(&path)))
    }

    /// Make sure the store paths a string depends on exist before it is used.
    pub fn realise_context(&self, context: &PathSet) -> EvalResult<()> {
        Ok(self.store.realise(context)?)
    }

    /**
    Deep equality. Lists and sets are compared element-wise, derivations by
    their `outPath`, strings without regard to context. Functions are never
    equal to anything.
    */
    pub fn eq_values(&mut self, v1: &Value, v2: &Value) -> EvalResult<bool> {
        let pos = Pos::none();
        self.force_value(v1, &pos)?;
        self.force_value(v2, &pos)?;
        if v1.ptr_eq(v2) {
            return Ok(!v1.is_function());
        }
        match (v1.get(), v2.get()) {
            (Repr::Int(a), Repr::Int(b)) => Ok(a == b),
            (Repr::Bool(a), Repr::Bool(b)) => Ok(a == b),
            (Repr::Null, Repr::Null) => Ok(true),
            (Repr::String(a), Repr::String(b)) => Ok(a.text == b.text),
            (Repr::Path(a), Repr::Path(b)) => Ok(a == b),
            (Repr::List(a), Repr::List(b)) => {
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    if !self.eq_values(x, y)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Repr::Attrs(a), Repr::Attrs(b)) => {
                if self.is_derivation(v1)? && self.is_derivation(v2)? {
                    if let (Some(x), Some(y)) =
                        (a.get(self.names.out_path), b.get(self.names.out_path))
                    {
                        let (x, y) = (x.value.clone(), y.value.clone());
                        return self.eq_values(&x, &y);
                    }
                }
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    if x.name != y.name || !self.eq_values(&x.value, &y.value)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod test {
    use super::store_name;
    use std::path::Path;

    #[test]
    fn store_name_test_1() {
        assert_eq!("src", store_name(Path::new("/home/user/src")));
        assert_eq!("my_file.txt", store_name(Path::new("/a/my file.txt")));
        assert_eq!("_hidden", store_name(Path::new("/a/.hidden")));
        assert_eq!("source", store_name(Path::new("/")));
    }
}
