#[cfg(test)]
mod test;

mod arith;
mod attrs;
mod control;
mod fs;
mod lists;
mod strings;

use crate::{
    apply::synthetic_attr,
    error::EvalResult,
    eval::BASE_ENV_SIZE,
    replay::{replay_wrapper, unsupported_in_replay, ImpurePrimOp, KeyArgs},
    value::{Bindings, PrimOp, PrimOpFn, Repr, Value},
    EvalState,
};
use reel_syntax::Pos;
use std::rc::Rc;
use tracing::trace;

/// The version of the language the built-ins implement.
pub const LANG_VERSION: i64 = 1;

/// A built-in written as a plain function.
pub type NativeFn = fn(&mut EvalState, &[Value], &Pos) -> EvalResult<Value>;

/**
A built-in function, as installed into the base environment.

Names starting with `__` are only reachable as globals under that name; inside
`builtins` they lose the prefix. Other names are global as they are.
*/
pub enum Builtin {
    Pure {
        name: &'static str,
        arity: usize,
        fun: PrimOpFn,
    },
    Impure(ImpurePrimOp),
    /// Impure, and without a meaning that can be recorded.
    Unsupported {
        name: &'static str,
        arity: usize,
        fun: PrimOpFn,
    },
}

impl Builtin {
    pub fn pure(name: &'static str, arity: usize, fun: NativeFn) -> Self {
        Builtin::Pure {
            name,
            arity,
            fun: Rc::new(fun),
        }
    }

    pub fn impure(name: &'static str, arity: usize, key_args: KeyArgs, fun: NativeFn) -> Self {
        Builtin::Impure(ImpurePrimOp {
            name,
            arity,
            key_args,
            fun: Rc::new(fun),
        })
    }

    pub fn unsupported(name: &'static str, arity: usize, fun: NativeFn) -> Self {
        Builtin::Unsupported {
            name,
            arity,
            fun: Rc::new(fun),
        }
    }
}

fn builtins() -> Vec<Builtin> {
    let mut result = Vec::new();
    result.extend(arith::builtins());
    result.extend(lists::builtins());
    result.extend(attrs::builtins());
    result.extend(strings::builtins());
    result.extend(control::builtins());
    result.extend(fs::builtins());
    result
}

/// The base environment and the `builtins` set, with every built-in wrapped
/// for the evaluator's mode.
pub(crate) fn create_base_env(state: &mut EvalState) {
    add_constant(state, "true", Value::mk_bool(true));
    add_constant(state, "false", Value::mk_bool(false));
    add_constant(state, "null", Value::mk_null());
    add_constant(state, "__langVersion", Value::mk_int(LANG_VERSION));

    let store_dir = state.store.store_dir().display().to_string();
    add_constant(state, "__storeDir", Value::mk_string(&store_dir));

    let search_path: Vec<Value> = state
        .search_path
        .entries()
        .to_vec()
        .into_iter()
        .map(|entry| {
            let prefix = Value::mk_string(&entry.prefix);
            let path = Value::mk_string(&entry.location.display().to_string());
            state.mk_attrs(vec![
                (state.names.prefix, prefix),
                (state.names.path, path),
            ])
        })
        .collect();
    add_constant(state, "__searchPath", Value::mk_list(search_path));

    let mode = state.config.mode;
    for builtin in builtins() {
        match builtin {
            Builtin::Pure { name, arity, fun } => add_primop(state, name, arity, fun),
            Builtin::Impure(op) => {
                let (name, arity) = (op.name, op.arity);
                let op = ImpurePrimOp {
                    name: name.trim_start_matches("__"),
                    ..op
                };
                add_primop(state, name, arity, replay_wrapper(mode, op))
            }
            Builtin::Unsupported { name, arity, fun } => {
                let fun = unsupported_in_replay(mode, name.trim_start_matches("__"), fun);
                add_primop(state, name, arity, fun)
            }
        }
    }

    // `builtins` refers to the finished set, including itself.
    let builtins = state.builtins.clone();
    add_constant(state, "builtins", builtins);
    let attrs = std::mem::take(&mut state.builtin_attrs);
    state.builtins.set(Repr::Attrs(Rc::new(Bindings::from_attrs(attrs))));
    trace!(slots = state.base_env_displ, "created base environment");
}

fn add_to_base_env(state: &mut EvalState, name: &str, value: Value) {
    assert!(
        state.base_env_displ < BASE_ENV_SIZE,
        "too many built-ins for the base environment"
    );
    let symbol = state.symbols.intern(name);
    state
        .static_base_env
        .vars
        .insert(symbol, state.base_env_displ);
    state.base_env.set(state.base_env_displ, value);
    state.base_env_displ += 1;
}

fn add_constant(state: &mut EvalState, name: &str, value: Value) {
    add_to_base_env(state, name, value.clone());
    let short = state.symbols.intern(name.trim_start_matches("__"));
    state.builtin_attrs.push(synthetic_attr(short, value));
}

/// Built-ins of arity 0 are installed as calls that happen when first forced.
fn add_primop(state: &mut EvalState, name: &'static str, arity: usize, fun: PrimOpFn) {
    let short = name.trim_start_matches("__");
    let op = Rc::new(PrimOp {
        name: Rc::from(short),
        arity,
        fun,
    });
    let value = if arity == 0 {
        Value::new(Repr::PrimOpApp {
            op,
            args: Rc::from(Vec::new()),
        })
    } else {
        Value::new(Repr::PrimOp(op))
    };
    add_constant(state, name, value)
}
