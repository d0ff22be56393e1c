use super::Builtin;
use crate::{
    apply::synthetic_attr,
    error::{EvalError, EvalResult},
    value::{Attr, Bindings, Repr, Value, ValueType},
    EvalState,
};
use reel_syntax::{Pos, Symbol};
use std::rc::Rc;

pub fn builtins() -> Vec<Builtin> {
    vec![
        // attrNames : set -> list
        Builtin::pure("__attrNames", 1, attr_names),
        // attrValues : set -> list
        Builtin::pure("__attrValues", 1, attr_values),
        // getAttr : string -> set -> a
        Builtin::pure("__getAttr", 2, get_attr),
        // hasAttr : string -> set -> bool
        Builtin::pure("__hasAttr", 2, has_attr),
        // removeAttrs : set -> list -> set
        Builtin::pure("removeAttrs", 2, remove_attrs),
        // listToAttrs : list -> set
        Builtin::pure("__listToAttrs", 1, list_to_attrs),
        // intersectAttrs : set -> set -> set
        Builtin::pure("__intersectAttrs", 2, intersect_attrs),
        // functionArgs : lambda -> set
        Builtin::pure("__functionArgs", 1, function_args),
    ]
}

/// The attributes of a set, ordered by name.
fn sorted_by_name(state: &EvalState, attrs: &Bindings) -> Vec<Attr> {
    let mut sorted: Vec<Attr> = attrs.iter().cloned().collect();
    sorted.sort_by(|a, b| state.symbols.name(a.name).cmp(state.symbols.name(b.name)));
    sorted
}

fn attr_name(state: &mut EvalState, value: &Value, pos: &Pos) -> EvalResult<Symbol> {
    let name = state.force_string_no_ctx(value, pos)?;
    Ok(state.symbols.intern(&name))
}

fn attr_names(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let attrs = state.force_attrs(&args[0], pos)?;
    let names = sorted_by_name(state, &attrs)
        .iter()
        .map(|attr| Value::mk_string(state.symbols.name(attr.name)))
        .collect();
    Ok(Value::mk_list(names))
}

fn attr_values(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let attrs = state.force_attrs(&args[0], pos)?;
    let values = sorted_by_name(state, &attrs)
        .into_iter()
        .map(|attr| attr.value)
        .collect();
    Ok(Value::mk_list(values))
}

fn get_attr(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let name = attr_name(state, &args[0], pos)?;
    state.get_attr(&args[1], name, pos)
}

fn has_attr(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let name = attr_name(state, &args[0], pos)?;
    let attrs = state.force_attrs(&args[1], pos)?;
    Ok(Value::mk_bool(attrs.has(name)))
}

fn remove_attrs(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let attrs = state.force_attrs(&args[0], pos)?;
    let names = state.force_list(&args[1], pos)?;
    let mut removed = Vec::with_capacity(names.len());
    for name in names.iter() {
        removed.push(attr_name(state, name, pos)?);
    }
    let kept: Vec<Attr> = attrs
        .iter()
        .filter(|attr| !removed.contains(&attr.name))
        .cloned()
        .collect();
    state.stats.attrsets += 1;
    state.stats.attrs_in_attrsets += kept.len() as u64;
    Ok(Value::mk_attrs(Bindings::from_attrs(kept)))
}

/// `[{ name = "a"; value = 1; }]` becomes `{ a = 1; }`. The first occurrence of a
/// name wins.
fn list_to_attrs(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let items = state.force_list(&args[0], pos)?;
    let mut attrs = Vec::with_capacity(items.len());
    for item in items.iter() {
        let name = state.get_attr(item, state.names.name, pos)?;
        let name = attr_name(state, &name, pos)?;
        let value = state.get_attr(item, state.names.value, pos)?;
        attrs.push(synthetic_attr(name, value));
    }
    state.stats.attrsets += 1;
    state.stats.attrs_in_attrsets += attrs.len() as u64;
    Ok(Value::mk_attrs(Bindings::from_attrs(attrs)))
}

/// The attributes of the second set whose names occur in the first.
fn intersect_attrs(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let left = state.force_attrs(&args[0], pos)?;
    let right = state.force_attrs(&args[1], pos)?;
    let kept: Vec<Attr> = right
        .iter()
        .filter(|attr| left.has(attr.name))
        .cloned()
        .collect();
    Ok(Value::mk_attrs(Bindings::from_attrs(kept)))
}

/// Maps each formal of a pattern lambda to whether it has a default.
fn function_args(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    state.force_value(&args[0], pos)?;
    match args[0].get() {
        Repr::Lambda { fun, .. } => {
            let formals = match &fun.formals {
                None => return Ok(Value::mk_attrs(Bindings::new())),
                Some(formals) => formals,
            };
            let attrs = formals
                .formals
                .iter()
                .map(|formal| Attr {
                    name: formal.name,
                    value: Value::mk_bool(formal.default.is_some()),
                    pos: formal.pos.clone(),
                })
                .collect();
            Ok(Value::new(Repr::Attrs(Rc::new(Bindings::from_attrs(attrs)))))
        }
        Repr::PrimOp(_) | Repr::PrimOpApp { .. } => Ok(Value::mk_attrs(Bindings::new())),
        _ => Err(EvalError::TypeMismatch {
            expected: ValueType::Lambda,
            actual: args[0].value_type(),
            pos: pos.clone(),
        }),
    }
}
