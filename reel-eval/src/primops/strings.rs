use super::Builtin;
use crate::{
    error::{EvalError, EvalResult},
    value::{Repr, Value},
    EvalState,
};
use regex::Regex;
use reel_store::PathSet;
use reel_syntax::Pos;
use std::rc::Rc;

pub fn builtins() -> Vec<Builtin> {
    vec![
        // stringLength : string -> int
        Builtin::pure("__stringLength", 1, string_length),
        // substring : int -> int -> string -> string
        Builtin::pure("__substring", 3, substring),
        // toString : a -> string
        Builtin::pure("toString", 1, to_string),
        // match : string -> string -> null | list
        Builtin::pure("__match", 2, match_regex),
        // baseNameOf : string -> string
        Builtin::pure("baseNameOf", 1, base_name_of),
        // dirOf : path -> path
        Builtin::pure("dirOf", 1, dir_of),
        // toPath : string -> string
        Builtin::pure("__toPath", 1, to_path),
    ]
}

fn string_length(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let mut context = PathSet::new();
    let s = state.coerce_to_string(pos, &args[0], &mut context, false, true)?;
    Ok(Value::mk_int(s.len() as i64))
}

/// Byte offsets, clamped to the string. The result keeps the context.
fn substring(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let start = state.force_int(&args[0], pos)?;
    let len = state.force_int(&args[1], pos)?;
    let mut context = PathSet::new();
    let s = state.coerce_to_string(pos, &args[2], &mut context, false, true)?;
    if start < 0 {
        return Err(EvalError::generic("negative start position in 'substring'", pos));
    }
    let start = (start as usize).min(s.len());
    let end = if len < 0 {
        s.len()
    } else {
        start.saturating_add(len as usize).min(s.len())
    };
    let text = s
        .get(start..end)
        .ok_or_else(|| EvalError::generic("'substring' split a character", pos))?;
    Ok(Value::mk_string_with_context(text, context))
}

fn to_string(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let mut context = PathSet::new();
    let s = state.coerce_to_string(pos, &args[0], &mut context, true, false)?;
    Ok(Value::mk_string_with_context(&s, context))
}

fn cached_regex(state: &mut EvalState, re: &str, pos: &Pos) -> EvalResult<Rc<Regex>> {
    if let Some(regex) = state.regex_cache.get(re) {
        return Ok(regex.clone());
    }
    let regex = Regex::new(&format!("^(?:{})$", re)).map_err(|err| {
        EvalError::generic(format!("invalid regular expression '{}': {}", re, err), pos)
    })?;
    let regex = Rc::new(regex);
    state.regex_cache.insert(String::from(re), regex.clone());
    Ok(regex)
}

/**
Match a string against a regular expression covering all of it. Returns null
when there is no match, otherwise the list of capture groups, with null for
groups that didn't participate.
*/
fn match_regex(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let re = state.force_string_no_ctx(&args[0], pos)?;
    let regex = cached_regex(state, &re, pos)?;
    let mut context = PathSet::new();
    let s = state.force_string(&args[1], &mut context, pos)?;
    match regex.captures(&s) {
        None => Ok(Value::mk_null()),
        Some(captures) => {
            let groups = captures
                .iter()
                .skip(1)
                .map(|group| match group {
                    None => Value::mk_null(),
                    Some(group) => Value::mk_string(group.as_str()),
                })
                .collect();
            Ok(Value::mk_list(groups))
        }
    }
}

fn base_name_of(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let mut context = PathSet::new();
    let s = state.coerce_to_string(pos, &args[0], &mut context, false, false)?;
    let trimmed = s.strip_suffix('/').unwrap_or(&s);
    let base = match trimmed.rfind('/') {
        None => trimmed,
        Some(ix) => &trimmed[ix + 1..],
    };
    Ok(Value::mk_string_with_context(base, context))
}

/// The directory part. Paths stay paths; anything else becomes a string.
fn dir_of(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    state.force_value(&args[0], pos)?;
    if let Repr::Path(path) = args[0].get() {
        let dir = path.parent().unwrap_or(&path).to_path_buf();
        return Ok(Value::mk_path(&dir));
    }
    let mut context = PathSet::new();
    let s = state.coerce_to_string(pos, &args[0], &mut context, false, false)?;
    let dir = match s.rfind('/') {
        None => ".",
        Some(0) => "/",
        Some(ix) => &s[..ix],
    };
    Ok(Value::mk_string_with_context(dir, context))
}

fn to_path(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let mut context = PathSet::new();
    let path = state.coerce_to_path(pos, &args[0], &mut context)?;
    Ok(Value::mk_string_with_context(
        &path.display().to_string(),
        context,
    ))
}
