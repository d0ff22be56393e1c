use super::Builtin;
use crate::{
    error::{EvalError, EvalResult},
    value::{Repr, Value, ValueType},
    EvalState,
};
use reel_store::PathSet;
use reel_syntax::Pos;
use tracing::info;

pub fn builtins() -> Vec<Builtin> {
    vec![
        // typeOf : a -> string
        Builtin::pure("__typeOf", 1, type_of),
        // isNull : a -> bool
        Builtin::pure("isNull", 1, is_null),
        // isInt : a -> bool
        Builtin::pure("__isInt", 1, is_int),
        // isBool : a -> bool
        Builtin::pure("__isBool", 1, is_bool),
        // isString : a -> bool
        Builtin::pure("__isString", 1, is_string),
        // isPath : a -> bool
        Builtin::pure("__isPath", 1, is_path),
        // isList : a -> bool
        Builtin::pure("__isList", 1, is_list),
        // isAttrs : a -> bool
        Builtin::pure("__isAttrs", 1, is_attrs),
        // isFunction : a -> bool
        Builtin::pure("__isFunction", 1, is_function),
        // seq : a -> b -> b
        Builtin::pure("__seq", 2, seq),
        // deepSeq : a -> b -> b
        Builtin::pure("__deepSeq", 2, deep_seq),
        // throw : string -> a
        Builtin::pure("throw", 1, throw),
        // abort : string -> a
        Builtin::pure("abort", 1, abort),
        // trace : a -> b -> b
        Builtin::pure("__trace", 2, trace),
    ]
}

fn type_of(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    state.force_value(&args[0], pos)?;
    Ok(Value::mk_string(args[0].value_type().type_of()))
}

fn has_type(
    state: &mut EvalState,
    value: &Value,
    pos: &Pos,
    types: &[ValueType],
) -> EvalResult<Value> {
    state.force_value(value, pos)?;
    Ok(Value::mk_bool(types.contains(&value.value_type())))
}

fn is_null(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    has_type(state, &args[0], pos, &[ValueType::Null])
}

fn is_int(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    has_type(state, &args[0], pos, &[ValueType::Int])
}

fn is_bool(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    has_type(state, &args[0], pos, &[ValueType::Bool])
}

fn is_string(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    has_type(state, &args[0], pos, &[ValueType::String])
}

fn is_path(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    has_type(state, &args[0], pos, &[ValueType::Path])
}

fn is_list(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    has_type(state, &args[0], pos, &[ValueType::List])
}

fn is_attrs(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    has_type(state, &args[0], pos, &[ValueType::Attrs])
}

fn is_function(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    has_type(
        state,
        &args[0],
        pos,
        &[ValueType::Lambda, ValueType::PrimOp, ValueType::PrimOpApp],
    )
}

fn seq(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    state.force_value(&args[0], pos)?;
    Ok(args[1].clone())
}

fn deep_seq(state: &mut EvalState, args: &[Value], _: &Pos) -> EvalResult<Value> {
    state.force_value_deep(&args[0])?;
    Ok(args[1].clone())
}

fn throw(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let mut context = PathSet::new();
    let message = state.coerce_to_string(pos, &args[0], &mut context, false, false)?;
    Err(EvalError::Thrown {
        message,
        pos: pos.clone(),
    })
}

fn abort(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let mut context = PathSet::new();
    let message = state.coerce_to_string(pos, &args[0], &mut context, false, false)?;
    Err(EvalError::Aborted {
        message,
        pos: pos.clone(),
    })
}

/// Log the first argument, then return the second.
fn trace(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    state.force_value(&args[0], pos)?;
    match args[0].get() {
        Repr::String(s) => info!(%pos, "trace: {}", s.text),
        _ => info!(%pos, "trace: {:?}", args[0]),
    }
    Ok(args[1].clone())
}
