use super::Builtin;
use crate::{
    error::{EvalError, EvalResult},
    value::{Repr, Value, ValueType},
    EvalState,
};
use reel_store::PathSet;
use reel_syntax::Pos;

pub fn builtins() -> Vec<Builtin> {
    vec![
        // add : int -> int -> int
        Builtin::pure("__add", 2, add),
        // sub : int -> int -> int
        Builtin::pure("__sub", 2, sub),
        // mul : int -> int -> int
        Builtin::pure("__mul", 2, mul),
        // div : int -> int -> int
        Builtin::pure("__div", 2, div),
        // lessThan : a -> a -> bool
        Builtin::pure("__lessThan", 2, less_than),
    ]
}

fn overflow(pos: &Pos) -> EvalError {
    EvalError::generic("integer overflow", pos)
}

fn add(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let a = state.force_int(&args[0], pos)?;
    let b = state.force_int(&args[1], pos)?;
    Ok(Value::mk_int(a.checked_add(b).ok_or_else(|| overflow(pos))?))
}

fn sub(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let a = state.force_int(&args[0], pos)?;
    let b = state.force_int(&args[1], pos)?;
    Ok(Value::mk_int(a.checked_sub(b).ok_or_else(|| overflow(pos))?))
}

fn mul(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let a = state.force_int(&args[0], pos)?;
    let b = state.force_int(&args[1], pos)?;
    Ok(Value::mk_int(a.checked_mul(b).ok_or_else(|| overflow(pos))?))
}

fn div(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    let a = state.force_int(&args[0], pos)?;
    let b = state.force_int(&args[1], pos)?;
    if b == 0 {
        return Err(EvalError::generic("division by zero", pos));
    }
    Ok(Value::mk_int(a.checked_div(b).ok_or_else(|| overflow(pos))?))
}

/// Integers compare numerically; strings and paths compare as text.
fn less_than(state: &mut EvalState, args: &[Value], pos: &Pos) -> EvalResult<Value> {
    state.force_value(&args[0], pos)?;
    state.force_value(&args[1], pos)?;
    let result = match (args[0].get(), args[1].get()) {
        (Repr::Int(a), Repr::Int(b)) => a < b,
        (Repr::Path(a), Repr::Path(b)) => a < b,
        (Repr::String(_), Repr::String(_)) => {
            let mut context = PathSet::new();
            let a = state.force_string(&args[0], &mut context, pos)?;
            let b = state.force_string(&args[1], &mut context, pos)?;
            a < b
        }
        (Repr::Int(_), _) | (Repr::String(_), _) | (Repr::Path(_), _) => {
            return Err(EvalError::TypeMismatch {
                expected: args[0].value_type(),
                actual: args[1].value_type(),
                pos: pos.clone(),
            })
        }
        _ => {
            return Err(EvalError::TypeMismatch {
                expected: ValueType::Int,
                actual: args[0].value_type(),
                pos: pos.clone(),
            })
        }
    };
    Ok(Value::mk_bool(result))
}
