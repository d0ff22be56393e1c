use super::Builtin;
use crate::{
    error::{EvalError, EvalResult},
    value::Value,
    EvalState,
};
use reel_syntax::Pos;

pub fn builtins() -> Vec<Builtin> {
    vec![
        // length : list -> int
        Builtin::pure("__length", 1, length),
        // head : list -> a
        Builtin::pure("__head", 1, head),
        // tail : list -> list
        Builtin::pure("__tail", 1, tail),
        // elemAt : list -> int -> a
        Builtin::pure("__elemAt", 2, elem_at),
        // map : (a -> b) -> list -> list
        Builtin::pure("map", 2, map),
        // filter : (a -> bool) -> list -> list
        Builtin::pure("__filter", 2, filter),
        // genList : (int -> a) -> int -> list
        Builtin::pure("__genList", 2, gen_list),
        // foldl' : (b -> a -> b) -> b -> list -> b
        Builtin::pure("__foldl'", 3, foldl_strict),
        // concatLists : list -> list
        Builtin::pure("__concatLists", 1, concat_lists),
        // elem : a -> list -> bool
        Builtin::pure("__elem", 2, elem),
    ]
}

fn length(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let items = state.force_list(&args[0], pos)?;
    Ok(Value::mk_int(items.len() as i64))
}

fn head(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let items = state.force_list(&args[0], pos)?;
    match items.first() {
        Some(item) => Ok(item.clone()),
        None => Err(EvalError::generic("'head' called on an empty list", pos)),
    }
}

fn tail(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let items = state.force_list(&args[0], pos)?;
    if items.is_empty() {
        return Err(EvalError::generic("'tail' called on an empty list", pos));
    }
    state.stats.list_elems += (items.len() - 1) as u64;
    Ok(Value::mk_list(items[1..].to_vec()))
}

fn elem_at(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let items = state.force_list(&args[0], pos)?;
    let n = state.force_int(&args[1], pos)?;
    usize::try_from(n)
        .ok()
        .and_then(|ix| items.get(ix))
        .cloned()
        .ok_or_else(|| EvalError::generic(format!("list index {} is out of bounds", n), pos))
}

/// Elements of the result are applications that have not happened yet.
fn map(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let items = state.force_list(&args[1], pos)?;
    state.stats.list_elems += items.len() as u64;
    let mapped = items
        .iter()
        .map(|item| Value::mk_app(args[0].clone(), item.clone()))
        .collect();
    Ok(Value::mk_list(mapped))
}

fn filter(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    state.force_function(&args[0], pos)?;
    let items = state.force_list(&args[1], pos)?;
    let mut kept = Vec::with_capacity(items.len());
    for item in items.iter() {
        let keep = state.call_function(&args[0], item.clone(), pos)?;
        if state.force_bool(&keep, pos)? {
            kept.push(item.clone());
        }
    }
    if kept.len() == items.len() {
        return Ok(args[1].clone());
    }
    state.stats.list_elems += kept.len() as u64;
    Ok(Value::mk_list(kept))
}

fn gen_list(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let n = state.force_int(&args[1], pos)?;
    let too_large = || EvalError::generic(format!("cannot create list of size {}", n), pos);
    let len = usize::try_from(n).map_err(|_| too_large())?;
    let mut items = Vec::new();
    items.try_reserve_exact(len).map_err(|_| too_large())?;
    state.stats.list_elems += len as u64;
    items.extend((0..n).map(|ix| Value::mk_app(args[0].clone(), Value::mk_int(ix))));
    Ok(Value::mk_list(items))
}

fn foldl_strict(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let items = state.force_list(&args[2], pos)?;
    let mut acc = args[1].clone();
    for item in items.iter() {
        acc = state.call_function_n(&args[0], &[acc, item.clone()], pos)?;
    }
    state.force_value(&acc, pos)?;
    Ok(acc)
}

fn concat_lists(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let lists = state.force_list(&args[0], pos)?;
    state.concat_lists(&lists, pos)
}

fn elem(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let items = state.force_list(&args[1], pos)?;
    for item in items.iter() {
        if state.eq_values(&args[0], item)? {
            return Ok(Value::mk_bool(true));
        }
    }
    Ok(Value::mk_bool(false))
}
