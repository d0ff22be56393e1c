use crate::{
    env::Env,
    error::{EvalError, EvalResult},
    value::{Bindings, PrimOp, Repr, Value, ValueType},
    EvalState,
};
use fnv::FnvHashSet;
use reel_store::PathSet;
use reel_syntax::{Expr, Pos};
use std::rc::Rc;

enum Pending {
    Thunk(Env, Rc<Expr>),
    App(Value, Value),
    Call(Rc<PrimOp>, Rc<[Value]>),
}

impl EvalState {
    /**
    Bring `value` to weak head normal form, overwriting the slot with the result.

    While a thunk is being evaluated its slot holds a blackhole; reaching the
    blackhole again means the value depends on itself. If evaluation fails the
    slot is restored, so forcing it again repeats the failure instead of
    reporting a spurious infinite recursion.
    */
    pub fn force_value(&mut self, value: &Value, pos: &Pos) -> EvalResult<()> {
        let pending = match value.get() {
            Repr::Thunk { env, expr } => Pending::Thunk(env, expr),
            Repr::App { fun, arg } => Pending::App(fun, arg),
            Repr::PrimOpApp { op, args } if args.len() == op.arity => Pending::Call(op, args),
            Repr::Blackhole => return Err(EvalError::InfiniteRecursion { pos: pos.clone() }),
            _ => return Ok(()),
        };
        let original = value.get();
        value.set(Repr::Blackhole);
        let result = match pending {
            Pending::Thunk(env, expr) => self.eval(&env, &expr),
            Pending::App(fun, arg) => self.call_function(&fun, arg, pos).and_then(|result| {
                self.force_value(&result, pos)?;
                Ok(result)
            }),
            Pending::Call(op, args) => self.call_primop_now(&op, &args, pos),
        };
        match result {
            Ok(result) => {
                value.set(result.get());
                Ok(())
            }
            Err(err) => {
                value.set(original);
                Err(err)
            }
        }
    }

    /// Force `value`, then every list element and attribute value inside it.
    pub fn force_value_deep(&mut self, value: &Value) -> EvalResult<()> {
        let mut seen = FnvHashSet::default();
        self.force_value_deep_seen(value, &mut seen)
    }

    fn force_value_deep_seen(
        &mut self,
        value: &Value,
        seen: &mut FnvHashSet<usize>,
    ) -> EvalResult<()> {
        if !seen.insert(value.addr()) {
            return Ok(());
        }
        self.force_value(value, &Pos::none())?;
        match value.get() {
            Repr::Attrs(attrs) => {
                for attr in attrs.iter() {
                    self.force_value_deep_seen(&attr.value, seen)?;
                }
                Ok(())
            }
            Repr::List(items) => {
                for item in items.iter() {
                    self.force_value_deep_seen(item, seen)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn type_error(&self, expected: ValueType, value: &Value, pos: &Pos) -> EvalError {
        EvalError::TypeMismatch {
            expected,
            actual: value.value_type(),
            pos: pos.clone(),
        }
    }

    pub fn force_int(&mut self, value: &Value, pos: &Pos) -> EvalResult<i64> {
        self.force_value(value, pos)?;
        match value.get() {
            Repr::Int(n) => Ok(n),
            _ => Err(self.type_error(ValueType::Int, value, pos)),
        }
    }

    pub fn force_bool(&mut self, value: &Value, pos: &Pos) -> EvalResult<bool> {
        self.force_value(value, pos)?;
        match value.get() {
            Repr::Bool(b) => Ok(b),
            _ => Err(self.type_error(ValueType::Bool, value, pos)),
        }
    }

    pub fn force_attrs(&mut self, value: &Value, pos: &Pos) -> EvalResult<Rc<Bindings>> {
        self.force_value(value, pos)?;
        match value.get() {
            Repr::Attrs(attrs) => Ok(attrs),
            _ => Err(self.type_error(ValueType::Attrs, value, pos)),
        }
    }

    pub fn force_list(&mut self, value: &Value, pos: &Pos) -> EvalResult<Rc<[Value]>> {
        self.force_value(value, pos)?;
        match value.get() {
            Repr::List(items) => Ok(items),
            _ => Err(self.type_error(ValueType::List, value, pos)),
        }
    }

    /// Force `value` and check that it can be called.
    pub fn force_function(&mut self, value: &Value, pos: &Pos) -> EvalResult<()> {
        self.force_value(value, pos)?;
        if value.is_function() || self.is_functor(value)? {
            Ok(())
        } else {
            Err(self.type_error(ValueType::Lambda, value, pos))
        }
    }

    /// Force `value` to a string, adding its context to `context`.
    pub fn force_string(
        &mut self,
        value: &Value,
        context: &mut PathSet,
        pos: &Pos,
    ) -> EvalResult<Rc<str>> {
        self.force_value(value, pos)?;
        match value.get() {
            Repr::String(s) => {
                context.extend(s.context.iter().cloned());
                Ok(s.text.clone())
            }
            _ => Err(self.type_error(ValueType::String, value, pos)),
        }
    }

    /// Force `value` to a string that must not refer to the store.
    pub fn force_string_no_ctx(&mut self, value: &Value, pos: &Pos) -> EvalResult<Rc<str>> {
        let mut context = PathSet::new();
        let text = self.force_string(value, &mut context, pos)?;
        match context.iter().next() {
            None => Ok(text),
            Some(path) => Err(EvalError::generic(
                format!(
                    "the string '{}' is not allowed to refer to a store path (such as '{}')",
                    text, path
                ),
                pos,
            )),
        }
    }
}
