use crate::{
    env::Env,
    error::{EvalError, EvalResult},
    stats::EvalStats,
    value::{Attr, Bindings, PrimOp, Repr, Value, ValueType},
    EvalState,
};
use reel_syntax::{ExprLambda, Pos};
use std::rc::Rc;

impl EvalState {
    /**
    Apply `fun` to `arg`.

    Calling a closure binds its parameters in a fresh frame and returns the body
    unevaluated. Calling a built-in collects the argument; once `arity`
    arguments have been collected the native implementation runs.
    */
    pub fn call_function(&mut self, fun: &Value, arg: Value, pos: &Pos) -> EvalResult<Value> {
        self.force_value(fun, pos)?;
        match fun.get() {
            Repr::PrimOp(op) => self.call_primop(&op, &[], arg, pos),
            Repr::PrimOpApp { op, args } => self.call_primop(&op, &args, arg, pos),
            Repr::Lambda { env, fun } => self.call_lambda(&env, &fun, arg, pos),
            Repr::Attrs(attrs) if attrs.has(self.names.functor) => {
                // `f arg` with `f = { __functor = self: arg: ...; }` is `f.__functor f arg`.
                let functor = attrs
                    .get(self.names.functor)
                    .map(|attr| attr.value.clone())
                    .unwrap_or_else(Value::mk_null);
                let partial = self.call_function(&functor, fun.clone(), pos)?;
                self.call_function(&partial, arg, pos)
            }
            _ => Err(EvalError::TypeMismatch {
                expected: ValueType::Lambda,
                actual: fun.value_type(),
                pos: pos.clone(),
            }),
        }
    }

    fn call_primop(
        &mut self,
        op: &Rc<PrimOp>,
        applied: &[Value],
        arg: Value,
        pos: &Pos,
    ) -> EvalResult<Value> {
        let mut args = Vec::with_capacity(applied.len() + 1);
        args.extend_from_slice(applied);
        args.push(arg);
        if args.len() < op.arity {
            return Ok(self.alloc_value(Repr::PrimOpApp {
                op: op.clone(),
                args: Rc::from(args),
            }));
        }
        self.call_primop_now(op, &args, pos)
    }

    /// Run a built-in on a complete argument list.
    pub(crate) fn call_primop_now(
        &mut self,
        op: &Rc<PrimOp>,
        args: &[Value],
        pos: &Pos,
    ) -> EvalResult<Value> {
        self.stats.primop_calls += 1;
        if self.config.count_calls {
            EvalStats::count(&mut self.stats.primop_call_counts, op.name.to_string());
        }
        let fun = op.fun.clone();
        let result = fun(self, args, pos)?;
        self.force_value(&result, pos)?;
        Ok(result)
    }

    fn call_lambda(
        &mut self,
        env: &Env,
        lambda: &Rc<ExprLambda>,
        arg: Value,
        pos: &Pos,
    ) -> EvalResult<Value> {
        self.stats.function_calls += 1;
        if self.config.count_calls {
            let key = match lambda.name {
                Some(name) => format!("{} at {}", self.symbols.name(name), lambda.pos),
                None => lambda.pos.to_string(),
            };
            EvalStats::count(&mut self.stats.function_call_counts, key);
        }

        let new_env = self.alloc_env(env, lambda.frame_size());
        let formals = match &lambda.formals {
            None => {
                new_env.set(0, arg);
                return self.maybe_thunk(&new_env, &lambda.body);
            }
            Some(formals) => formals,
        };

        let mut displ = 0;
        if lambda.arg.is_some() {
            new_env.set(displ, arg.clone());
            displ += 1;
        }
        let attrs = self.force_attrs(&arg, pos)?;
        let mut used = 0;
        for formal in formals.formals.iter() {
            let value = match (attrs.get(formal.name), &formal.default) {
                (Some(attr), _) => {
                    used += 1;
                    attr.value.clone()
                }
                (None, Some(default)) => self.mk_thunk(&new_env, default),
                (None, None) => {
                    return Err(EvalError::MissingArgument {
                        name: String::from(self.symbols.name(formal.name)),
                        pos: lambda.pos.clone(),
                    })
                }
            };
            new_env.set(displ, value);
            displ += 1;
        }

        if !formals.ellipsis && used != attrs.len() {
            if let Some(attr) = attrs.iter().find(|attr| !formals.has(attr.name)) {
                return Err(EvalError::UnexpectedArgument {
                    name: String::from(self.symbols.name(attr.name)),
                    pos: lambda.pos.clone(),
                });
            }
        }

        self.maybe_thunk(&new_env, &lambda.body)
    }

    /**
    Call an entry point with externally supplied arguments.

    If `fun` is a function taking an attribute set pattern, it is called with
    the formals found in `args`; formals that are missing there fall back to
    their defaults. Any other value is returned as it is.
    */
    pub fn auto_call_function(&mut self, args: &Bindings, fun: &Value) -> EvalResult<Value> {
        let pos = Pos::none();
        self.force_value(fun, &pos)?;

        if self.is_functor(fun)? {
            let functor = self.get_attr(fun, self.names.functor, &pos)?;
            let unwrapped = self.call_function(&functor, fun.clone(), &pos)?;
            self.force_value(&unwrapped, &pos)?;
            return self.auto_call_function(args, &unwrapped);
        }

        let lambda = match fun.get() {
            Repr::Lambda { fun: lambda, .. } => lambda,
            _ => return Ok(fun.clone()),
        };
        let formals = match &lambda.formals {
            None => return Ok(fun.clone()),
            Some(formals) => formals,
        };

        let mut supplied = Vec::new();
        let mut missing = Vec::new();
        for formal in formals.formals.iter() {
            match args.get(formal.name) {
                Some(attr) => supplied.push(attr.clone()),
                None if formal.default.is_some() => {}
                None => missing.push(String::from(self.symbols.name(formal.name))),
            }
        }
        if !missing.is_empty() {
            return Err(EvalError::MissingArguments {
                names: missing,
                pos: lambda.pos.clone(),
            });
        }

        let arg = Value::mk_attrs(Bindings::from_attrs(supplied));
        let result = self.call_function(fun, arg, &pos)?;
        self.force_value(&result, &pos)?;
        Ok(result)
    }

    /// Apply `fun` to each of `args` in turn and force the result.
    pub fn call_function_n(&mut self, fun: &Value, args: &[Value], pos: &Pos) -> EvalResult<Value> {
        let mut result = fun.clone();
        for arg in args.iter() {
            result = self.call_function(&result, arg.clone(), pos)?;
        }
        self.force_value(&result, pos)?;
        Ok(result)
    }
}

/// An attribute built by the evaluator rather than written in source.
pub(crate) fn synthetic_attr(name: reel_syntax::Symbol, value: Value) -> Attr {
    Attr {
        name,
        value,
        pos: Pos::none(),
    }
}
