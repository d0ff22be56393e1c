use crate::{Expr, ExprAttrs, ExprLambda, ExprVar, Pos, Symbol};
use std::{collections::BTreeMap, rc::Rc};

/// The static counterpart of a runtime environment frame, used to assign
/// variables their frame coordinates before evaluation.
#[derive(Debug)]
pub struct StaticEnv<'a> {
    pub is_with: bool,
    pub up: Option<&'a StaticEnv<'a>>,
    pub vars: BTreeMap<Symbol, usize>,
}

impl<'a> StaticEnv<'a> {
    pub fn new(is_with: bool, up: Option<&'a StaticEnv<'a>>) -> Self {
        StaticEnv {
            is_with,
            up,
            vars: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    UndefinedVariable { name: Symbol, pos: Pos },
}

fn bind(e: &mut Rc<Expr>, env: &StaticEnv) -> Result<(), BindError> {
    Rc::make_mut(e).bind_vars(env)
}

impl ExprVar {
    fn bind_vars(&mut self, env: &StaticEnv) -> Result<(), BindError> {
        let mut with_level = None;
        let mut level = 0;
        let mut cur = Some(env);
        while let Some(cur_env) = cur {
            if cur_env.is_with {
                if with_level.is_none() {
                    with_level = Some(level);
                }
            } else if let Some(displ) = cur_env.vars.get(&self.name) {
                self.from_with = false;
                self.level = level;
                self.displ = *displ;
                return Ok(());
            }
            cur = cur_env.up;
            level += 1;
        }

        // Not statically bound, so it has to come from the nearest `with`.
        match with_level {
            None => Err(BindError::UndefinedVariable {
                name: self.name,
                pos: self.pos.clone(),
            }),
            Some(with_level) => {
                self.from_with = true;
                self.level = with_level;
                Ok(())
            }
        }
    }
}

impl ExprAttrs {
    fn bind_vars(&mut self, env: &StaticEnv) -> Result<(), BindError> {
        if self.rec {
            let mut new_env = StaticEnv::new(false, Some(env));
            for (displ, (name, def)) in self.attrs.iter_mut().enumerate() {
                new_env.vars.insert(*name, displ);
                def.displ = displ;
            }
            for (_, def) in self.attrs.iter_mut() {
                bind(&mut def.e, if def.inherited { env } else { &new_env })?;
            }
            Ok(())
        } else {
            self.attrs
                .iter_mut()
                .try_for_each(|(_, def)| bind(&mut def.e, env))
        }
    }
}

impl ExprLambda {
    fn bind_vars(&mut self, env: &StaticEnv) -> Result<(), BindError> {
        let mut new_env = StaticEnv::new(false, Some(env));
        let mut displ = 0;
        if let Some(arg) = self.arg {
            new_env.vars.insert(arg, displ);
            displ += 1;
        }
        if let Some(formals) = &mut self.formals {
            for formal in formals.formals.iter() {
                new_env.vars.insert(formal.name, displ);
                displ += 1;
            }
            for formal in formals.formals.iter_mut() {
                if let Some(default) = &mut formal.default {
                    bind(default, &new_env)?;
                }
            }
        }
        bind(&mut self.body, &new_env)
    }
}

impl Expr {
    /**
    Resolve every variable reference in the expression against `env`.

    Plain bindings get static `(level, displ)` coordinates. Names that are not
    bound by any enclosing lambda, `let` or recursive attribute set are looked
    up at runtime in the nearest enclosing `with`; if there is no such `with`
    the variable is undefined.
    */
    pub fn bind_vars(&mut self, env: &StaticEnv) -> Result<(), BindError> {
        match self {
            Expr::Int(_) | Expr::String(_) | Expr::Path(_) | Expr::CurPos(_) => Ok(()),
            Expr::Var(var) => var.bind_vars(env),
            Expr::Select { e, default, .. } => {
                bind(e, env)?;
                match default {
                    None => Ok(()),
                    Some(default) => bind(default, env),
                }
            }
            Expr::HasAttr { e, .. } => bind(e, env),
            Expr::Attrs(attrs) => attrs.bind_vars(env),
            Expr::List(items) => items.iter_mut().try_for_each(|item| bind(item, env)),
            Expr::Lambda(lambda) => Rc::make_mut(lambda).bind_vars(env),
            Expr::App { fun, arg, .. } => {
                bind(fun, env)?;
                bind(arg, env)
            }
            Expr::Let { attrs, body } => {
                let mut new_env = StaticEnv::new(false, Some(env));
                for (displ, (name, def)) in attrs.attrs.iter_mut().enumerate() {
                    new_env.vars.insert(*name, displ);
                    def.displ = displ;
                }
                for (_, def) in attrs.attrs.iter_mut() {
                    bind(&mut def.e, if def.inherited { env } else { &new_env })?;
                }
                bind(body, &new_env)
            }
            Expr::With {
                attrs,
                body,
                prev_with,
                ..
            } => {
                // Record how many frames up the next enclosing `with` is, counted
                // from the frame this `with` introduces.
                *prev_with = 0;
                let mut level = 1;
                let mut cur = Some(env);
                while let Some(cur_env) = cur {
                    if cur_env.is_with {
                        *prev_with = level;
                        break;
                    }
                    cur = cur_env.up;
                    level += 1;
                }
                bind(attrs, env)?;
                let new_env = StaticEnv::new(true, Some(env));
                bind(body, &new_env)
            }
            Expr::If {
                cond, then, else_, ..
            } => {
                bind(cond, env)?;
                bind(then, env)?;
                bind(else_, env)
            }
            Expr::Assert { cond, body, .. } => {
                bind(cond, env)?;
                bind(body, env)
            }
            Expr::Not { e, .. } => bind(e, env),
            Expr::BinOp { lhs, rhs, .. } => {
                bind(lhs, env)?;
                bind(rhs, env)
            }
            Expr::ConcatStrings { parts, .. } => {
                parts.iter_mut().try_for_each(|part| bind(part, env))
            }
        }
    }
}
