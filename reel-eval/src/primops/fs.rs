use super::Builtin;
use crate::{
    apply::synthetic_attr,
    coerce::store_name,
    error::{EvalError, EvalResult},
    replay::KeyArgs,
    search_path::{find_in, SearchPath, SearchPathEntry},
    value::{Bindings, Value},
    EvalState,
};
use reel_store::PathSet;
use reel_syntax::Pos;
use std::{
    env,
    fs,
    path::{Path, PathBuf},
    process::Command,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::debug;

pub fn builtins() -> Vec<Builtin> {
    vec![
        // import : path -> a
        Builtin::pure("import", 1, import),
        // findFile : list -> string -> path
        Builtin::pure("__findFile", 2, find_file),
        // getEnv : string -> string
        Builtin::impure("__getEnv", 1, KeyArgs::All, get_env),
        // readFile : path -> string
        Builtin::impure("__readFile", 1, KeyArgs::All, read_file),
        // pathExists : path -> bool
        Builtin::impure("__pathExists", 1, KeyArgs::All, path_exists),
        // readDir : path -> set
        Builtin::impure("__readDir", 1, KeyArgs::All, read_dir),
        // currentTime : int
        Builtin::impure("__currentTime", 0, KeyArgs::All, current_time),
        // fetchurl : string -> string
        Builtin::impure("__fetchurl", 1, KeyArgs::Only(&[0]), fetchurl),
        // exec : list -> string
        Builtin::unsupported("__exec", 1, exec),
    ]
}

/// A path argument that may be read: absolute, canonical, its context built
/// and, in restricted mode, inside an allowed location.
fn readable_path(state: &mut EvalState, value: &Value, pos: &Pos) -> EvalResult<PathBuf> {
    let mut context = PathSet::new();
    let path = state.coerce_to_path(pos, value, &mut context)?;
    state.realise_context(&context)?;
    let path = state.substitute_path(&path);
    state.check_source_path(&path, pos)
}

fn import(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let mut context = PathSet::new();
    let path = state.coerce_to_path(pos, &args[0], &mut context)?;
    state.realise_context(&context)?;
    state.eval_file(&path)
}

/// Look `name` up in a list of `{ prefix, path }` sets.
fn find_file(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let entries = state.force_list(&args[0], pos)?;
    let mut search_path = SearchPath::new();
    for entry in entries.iter() {
        let prefix = match state.force_attrs(entry, pos)?.get(state.names.prefix) {
            None => String::new(),
            Some(attr) => {
                let prefix = attr.value.clone();
                String::from(state.force_string_no_ctx(&prefix, pos)?.as_ref())
            }
        };
        let location = state.get_attr(entry, state.names.path, pos)?;
        let mut context = PathSet::new();
        let location = state.coerce_to_string(pos, &location, &mut context, false, false)?;
        state.realise_context(&context)?;
        search_path.push(SearchPathEntry {
            prefix,
            location: PathBuf::from(location),
        });
    }
    let name = state.force_string_no_ctx(&args[1], pos)?;
    let path = find_in(&search_path, &name, pos)?;
    let path = state.check_source_path(&path, pos)?;
    Ok(Value::mk_path(&path))
}

/// Unset variables read as the empty string.
fn get_env(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let name = state.force_string_no_ctx(&args[0], pos)?;
    if state.config.restricted {
        return Err(EvalError::Restricted {
            what: String::from("access to environment variables"),
            pos: pos.clone(),
        });
    }
    let value = env::var(name.as_ref()).unwrap_or_default();
    Ok(Value::mk_string(&value))
}

fn read_file(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let path = readable_path(state, &args[0], pos)?;
    let contents = fs::read_to_string(&path).map_err(|err| EvalError::io(&path, err))?;
    Ok(Value::mk_string(&contents))
}

fn path_exists(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let path = readable_path(state, &args[0], pos)?;
    Ok(Value::mk_bool(path.exists()))
}

/// Maps each entry of a directory to `"regular"`, `"directory"`, `"symlink"` or
/// `"unknown"`.
fn read_dir(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let path = readable_path(state, &args[0], pos)?;
    let entries = fs::read_dir(&path).map_err(|err| EvalError::io(&path, err))?;
    let mut attrs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| EvalError::io(&path, err))?;
        let file_type = entry
            .file_type()
            .map_err(|err| EvalError::io(entry.path(), err))?;
        let kind = if file_type.is_symlink() {
            "symlink"
        } else if file_type.is_dir() {
            "directory"
        } else if file_type.is_file() {
            "regular"
        } else {
            "unknown"
        };
        let name = state.symbols.intern(&entry.file_name().to_string_lossy());
        attrs.push(synthetic_attr(name, Value::mk_string(kind)));
    }
    state.stats.attrsets += 1;
    state.stats.attrs_in_attrsets += attrs.len() as u64;
    Ok(Value::mk_attrs(Bindings::from_attrs(attrs)))
}

/// Seconds since the Unix epoch, read once per evaluation.
fn current_time(_: &mut EvalState, _: &[Value], pos: &Pos) -> EvalResult<Value> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| EvalError::generic(format!("cannot read the clock: {}", err), pos))?;
    Ok(Value::mk_int(now.as_secs() as i64))
}

/// Download a URL into the store. The result is the store path.
fn fetchurl(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let url = state.force_string_no_ctx(&args[0], pos)?;
    if state.config.restricted {
        return Err(EvalError::Restricted {
            what: String::from("downloading files"),
            pos: pos.clone(),
        });
    }
    let fetcher = state.fetcher.clone();
    let contents = fetcher.fetch(&url).map_err(|message| EvalError::Fetch {
        url: String::from(url.as_ref()),
        message,
        pos: pos.clone(),
    })?;
    let name = store_name(Path::new(url.as_ref()));
    let store_path = state
        .store
        .add_text_to_store(&name, &contents, &PathSet::new())?;
    debug!(url = %url, store_path = %store_path, "fetched url");
    let store_path = store_path.to_string();
    let context = PathSet::from([store_path.clone()]);
    Ok(Value::mk_string_with_context(&store_path, context))
}

/// Run a program and return what it printed.
fn exec(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    if state.config.restricted {
        return Err(EvalError::Restricted {
            what: String::from("running external programs"),
            pos: pos.clone(),
        });
    }
    let items = state.force_list(&args[0], pos)?;
    let mut context = PathSet::new();
    let mut argv = Vec::with_capacity(items.len());
    for item in items.iter() {
        argv.push(state.coerce_to_string(pos, item, &mut context, false, false)?);
    }
    state.realise_context(&context)?;
    let (program, rest) = argv
        .split_first()
        .ok_or_else(|| EvalError::generic("'exec' called with an empty list", pos))?;
    let output = Command::new(program)
        .args(rest)
        .output()
        .map_err(|err| EvalError::io(program, err))?;
    if !output.status.success() {
        return Err(EvalError::generic(
            format!("program '{}' failed with {}", program, output.status),
            pos,
        ));
    }
    Ok(Value::mk_string(&String::from_utf8_lossy(&output.stdout)))
}
