use crate::{
    env::{Env, FrameRegistry},
    error::{EvalError, EvalResult},
    fetch::{Fetcher, HttpFetcher},
    primops,
    replay::RecordingKey,
    search_path::{canon_path, resolve_expr_path, SearchPath},
    stats::EvalStats,
    value::{Attr, Bindings, Repr, Value, ValueType},
    EvalConfig,
};
use fnv::FnvHashMap;
use regex::Regex;
use reel_store::{PathSet, Store, StorePath};
use reel_syntax::{BinOp, BindError, Expr, ExprAttrs, ExprVar, Pos, StaticEnv, Symbol, SymbolTable};
use std::{
    collections::BTreeMap,
    fmt::{self, Display},
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};
use tracing::{debug, info, warn};

/// Number of slots in the base environment. Every built-in takes one.
pub const BASE_ENV_SIZE: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub pos: Pos,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pos, self.message)
    }
}

/**
Turns source text into an expression.

The evaluator does not know the surface syntax. Front ends plug their parser in
here; any function with the right signature is a parser.
*/
pub trait Parser {
    fn parse(
        &self,
        source: &str,
        path: &Path,
        symbols: &mut SymbolTable,
    ) -> Result<Expr, ParseError>;
}

impl<F> Parser for F
where
    F: Fn(&str, &Path, &mut SymbolTable) -> Result<Expr, ParseError>,
{
    fn parse(
        &self,
        source: &str,
        path: &Path,
        symbols: &mut SymbolTable,
    ) -> Result<Expr, ParseError> {
        self(source, path, symbols)
    }
}

/// Attribute names the evaluator looks for itself.
pub(crate) struct Names {
    pub out_path: Symbol,
    pub type_: Symbol,
    pub functor: Symbol,
    pub to_string: Symbol,
    pub file: Symbol,
    pub line: Symbol,
    pub column: Symbol,
    pub name: Symbol,
    pub value: Symbol,
    pub prefix: Symbol,
    pub path: Symbol,
}

impl Names {
    fn new(symbols: &mut SymbolTable) -> Self {
        Names {
            out_path: symbols.intern("outPath"),
            type_: symbols.intern("type"),
            functor: symbols.intern("__functor"),
            to_string: symbols.intern("__toString"),
            file: symbols.intern("file"),
            line: symbols.intern("line"),
            column: symbols.intern("column"),
            name: symbols.intern("name"),
            value: symbols.intern("value"),
            prefix: symbols.intern("prefix"),
            path: symbols.intern("path"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ConcatKind {
    Int,
    Path,
    String,
}

pub struct EvalState {
    pub symbols: SymbolTable,
    pub stats: EvalStats,
    pub(crate) config: EvalConfig,
    pub(crate) names: Names,
    pub(crate) store: Rc<dyn Store>,
    pub(crate) parser: Rc<dyn Parser>,
    pub(crate) fetcher: Rc<dyn Fetcher>,
    pub(crate) search_path: SearchPath,

    pub(crate) base_env: Env,
    pub(crate) static_base_env: StaticEnv<'static>,
    pub(crate) base_env_displ: usize,
    /// The `builtins` set. It contains itself.
    pub(crate) builtins: Value,
    pub(crate) builtin_attrs: Vec<Attr>,

    pub(crate) src_to_store: BTreeMap<PathBuf, StorePath>,
    /// Keyed by the path as it was in the recorded run.
    pub(crate) src_to_store_for_playback: BTreeMap<PathBuf, StorePath>,
    /// Prefix pairs `(recorded, local)`.
    pub(crate) playback_substitutions: Vec<(PathBuf, PathBuf)>,
    file_eval_cache: BTreeMap<PathBuf, Value>,
    pub(crate) recording: BTreeMap<RecordingKey, Value>,
    pub(crate) regex_cache: FnvHashMap<String, Rc<Regex>>,

    /// Dropped last: it collects on drop, and by then only references held
    /// outside the evaluator keep frames alive.
    frames: FrameRegistry,
}

impl EvalState {
    pub fn new(config: EvalConfig, store: Rc<dyn Store>, parser: Rc<dyn Parser>) -> Self {
        let mut symbols = SymbolTable::new();
        let names = Names::new(&mut symbols);
        let mut search_path = SearchPath::new();
        for entry in config.search_path.iter() {
            search_path.add(entry);
        }
        let mut frames = FrameRegistry::new();
        let base_env = Env::new(None, BASE_ENV_SIZE);
        frames.register(&base_env);

        let mut state = EvalState {
            symbols,
            stats: EvalStats::new(),
            config,
            names,
            store,
            parser,
            fetcher: Rc::new(HttpFetcher),
            search_path,
            base_env,
            static_base_env: StaticEnv::new(false, None),
            base_env_displ: 0,
            builtins: Value::mk_null(),
            builtin_attrs: Vec::new(),
            src_to_store: BTreeMap::new(),
            src_to_store_for_playback: BTreeMap::new(),
            playback_substitutions: Vec::new(),
            file_eval_cache: BTreeMap::new(),
            recording: BTreeMap::new(),
            regex_cache: FnvHashMap::default(),
            frames,
        };
        primops::create_base_env(&mut state);
        state
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn store(&self) -> &Rc<dyn Store> {
        &self.store
    }

    pub fn set_fetcher(&mut self, fetcher: Rc<dyn Fetcher>) {
        self.fetcher = fetcher;
    }

    pub fn base_env(&self) -> &Env {
        &self.base_env
    }

    pub fn static_base_env(&self) -> &StaticEnv<'static> {
        &self.static_base_env
    }

    /// Number of environment frames that are still reachable.
    pub fn live_envs(&self) -> usize {
        self.frames.live()
    }

    /**
    Reclaim environment frames that only cycles keep alive. Frames reachable
    from the evaluator (its base environment, file cache and recording) or
    from values the caller holds are left as they are.

    Returns the number of frames that were cleared.
    */
    pub fn collect_garbage(&mut self) -> usize {
        self.frames.collect()
    }

    pub(crate) fn alloc_value(&mut self, repr: Repr) -> Value {
        self.stats.values += 1;
        Value::new(repr)
    }

    pub(crate) fn alloc_env(&mut self, up: &Env, size: usize) -> Env {
        self.stats.envs += 1;
        self.stats.values_in_envs += size as u64;
        let env = Env::new(Some(up.clone()), size);
        self.frames.register(&env);
        env
    }

    fn alloc_with_env(&mut self, up: &Env, prev_with: usize, attrs: Value) -> Env {
        self.stats.envs += 1;
        self.stats.values_in_envs += 1;
        let env = Env::new_with(up.clone(), prev_with, attrs);
        self.frames.register(&env);
        env
    }

    pub(crate) fn mk_thunk(&mut self, env: &Env, e: &Rc<Expr>) -> Value {
        self.stats.thunks += 1;
        Value::mk_thunk(env.clone(), e.clone())
    }

    /**
    A value for `e` that does not evaluate it yet.

    Variables resolve to the slot they are bound to and literals are built
    directly; everything else becomes a thunk.
    */
    pub(crate) fn maybe_thunk(&mut self, env: &Env, e: &Rc<Expr>) -> EvalResult<Value> {
        match e.as_ref() {
            Expr::Var(var) if !var.from_with => {
                self.stats.thunks_avoided += 1;
                self.lookup_var(env, var)
            }
            Expr::Int(_) | Expr::String(_) | Expr::Path(_) => {
                self.stats.thunks_avoided += 1;
                self.eval(env, e)
            }
            _ => Ok(self.mk_thunk(env, e)),
        }
    }

    /// Like `maybe_thunk`, but for a definition placed in a frame whose slots
    /// are still being filled, where a slot of `env` itself may not be set yet.
    fn thunk_in_new_frame(&mut self, env: &Env, e: &Rc<Expr>) -> EvalResult<Value> {
        match e.as_ref() {
            Expr::Var(var) if !var.from_with && var.level == 0 => Ok(self.mk_thunk(env, e)),
            _ => self.maybe_thunk(env, e),
        }
    }

    fn undefined_variable(&self, var: &ExprVar) -> EvalError {
        EvalError::UndefinedVariable {
            name: String::from(self.symbols.name(var.name)),
            pos: var.pos.clone(),
        }
    }

    fn lookup_var(&mut self, env: &Env, var: &ExprVar) -> EvalResult<Value> {
        self.stats.lookups += 1;
        let mut env = match env.ancestor(var.level) {
            None => return Err(self.undefined_variable(var)),
            Some(env) => env.clone(),
        };
        if !var.from_with {
            return Ok(env.get(var.displ));
        }
        loop {
            let attrs = self.force_attrs(&env.get(0), &var.pos)?;
            if let Some(attr) = attrs.get(var.name) {
                return Ok(attr.value.clone());
            }
            if env.prev_with() == 0 {
                return Err(self.undefined_variable(var));
            }
            let next = env.ancestor(env.prev_with()).cloned();
            env = match next {
                None => return Err(self.undefined_variable(var)),
                Some(next) => next,
            };
        }
    }

    /// Evaluate `e` in `env` to weak head normal form.
    pub fn eval(&mut self, env: &Env, e: &Rc<Expr>) -> EvalResult<Value> {
        match e.as_ref() {
            Expr::Int(n) => Ok(self.alloc_value(Repr::Int(*n))),
            Expr::String(s) => Ok(Value::mk_string(s)),
            Expr::Path(p) => Ok(self.alloc_value(Repr::Path(p.clone()))),
            Expr::Var(var) => {
                let value = self.lookup_var(env, var)?;
                self.force_value(&value, &var.pos)?;
                Ok(value)
            }
            Expr::Select {
                pos,
                e,
                path,
                default,
            } => {
                let mut value = self.eval(env, e)?;
                if self.config.count_calls {
                    EvalStats::count(&mut self.stats.attr_selects, pos.to_string());
                }
                for name in path.iter() {
                    let next = match value.get() {
                        Repr::Attrs(attrs) => attrs.get(*name).map(|attr| attr.value.clone()),
                        _ if default.is_some() => None,
                        _ => {
                            return Err(EvalError::TypeMismatch {
                                expected: ValueType::Attrs,
                                actual: value.value_type(),
                                pos: pos.clone(),
                            })
                        }
                    };
                    match next {
                        Some(next) => {
                            self.force_value(&next, pos)?;
                            value = next;
                        }
                        None => {
                            return match default {
                                Some(default) => self.eval(env, default),
                                None => Err(EvalError::MissingAttribute {
                                    name: String::from(self.symbols.name(*name)),
                                    pos: pos.clone(),
                                }),
                            }
                        }
                    }
                }
                Ok(value)
            }
            Expr::HasAttr { e, path } => {
                let mut value = self.eval(env, e)?;
                for name in path.iter() {
                    self.force_value(&value, &Pos::none())?;
                    let next = match value.get() {
                        Repr::Attrs(attrs) => attrs.get(*name).map(|attr| attr.value.clone()),
                        _ => None,
                    };
                    match next {
                        None => return Ok(Value::mk_bool(false)),
                        Some(next) => value = next,
                    }
                }
                Ok(Value::mk_bool(true))
            }
            Expr::Attrs(attrs) => self.eval_attrs(env, attrs),
            Expr::List(items) => {
                self.stats.list_elems += items.len() as u64;
                let items = items
                    .iter()
                    .map(|item| self.maybe_thunk(env, item))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(self.alloc_value(Repr::List(Rc::from(items))))
            }
            Expr::Lambda(fun) => Ok(self.alloc_value(Repr::Lambda {
                env: env.clone(),
                fun: fun.clone(),
            })),
            Expr::App { pos, fun, arg } => {
                let fun = self.eval(env, fun)?;
                let arg = self.maybe_thunk(env, arg)?;
                let result = self.call_function(&fun, arg, pos)?;
                self.force_value(&result, pos)?;
                Ok(result)
            }
            Expr::Let { attrs, body } => {
                let new_env = self.alloc_env(env, attrs.attrs.len());
                for (_, def) in attrs.attrs.iter() {
                    let value = if def.inherited {
                        self.maybe_thunk(env, &def.e)?
                    } else {
                        self.thunk_in_new_frame(&new_env, &def.e)?
                    };
                    new_env.set(def.displ, value);
                }
                self.eval(&new_env, body)
            }
            Expr::With {
                attrs,
                body,
                prev_with,
                ..
            } => {
                let attrs = self.maybe_thunk(env, attrs)?;
                let new_env = self.alloc_with_env(env, *prev_with, attrs);
                self.eval(&new_env, body)
            }
            Expr::If {
                pos,
                cond,
                then,
                else_,
            } => {
                if self.eval_bool(env, cond, pos)? {
                    self.eval(env, then)
                } else {
                    self.eval(env, else_)
                }
            }
            Expr::Assert { pos, cond, body } => {
                if !self.eval_bool(env, cond, pos)? {
                    return Err(EvalError::AssertionFailed { pos: pos.clone() });
                }
                self.eval(env, body)
            }
            Expr::Not { pos, e } => {
                let b = self.eval_bool(env, e, pos)?;
                Ok(Value::mk_bool(!b))
            }
            Expr::BinOp { pos, op, lhs, rhs } => self.eval_binop(env, pos, *op, lhs, rhs),
            Expr::ConcatStrings {
                pos,
                force_string,
                parts,
            } => self.concat_strings(env, pos, *force_string, parts),
            Expr::CurPos(pos) => {
                if pos.is_none() {
                    return Ok(Value::mk_null());
                }
                let file = pos.file.as_deref().unwrap_or_default();
                Ok(self.mk_attrs(vec![
                    (self.names.file, Value::mk_string(file)),
                    (self.names.line, Value::mk_int(pos.line as i64)),
                    (self.names.column, Value::mk_int(pos.column as i64)),
                ]))
            }
        }
    }

    /// Evaluate a closed expression in the base environment.
    pub fn eval_expr(&mut self, e: &Rc<Expr>) -> EvalResult<Value> {
        let env = self.base_env.clone();
        self.eval(&env, e)
    }

    pub fn eval_bool(&mut self, env: &Env, e: &Rc<Expr>, pos: &Pos) -> EvalResult<bool> {
        let value = self.eval(env, e)?;
        self.force_bool(&value, pos)
    }

    pub(crate) fn mk_attrs(&mut self, attrs: Vec<(Symbol, Value)>) -> Value {
        self.stats.attrsets += 1;
        self.stats.attrs_in_attrsets += attrs.len() as u64;
        Value::mk_attrs(Bindings::from_attrs(
            attrs
                .into_iter()
                .map(|(name, value)| Attr {
                    name,
                    value,
                    pos: Pos::none(),
                })
                .collect(),
        ))
    }

    fn eval_attrs(&mut self, env: &Env, attrs: &ExprAttrs) -> EvalResult<Value> {
        self.stats.attrsets += 1;
        self.stats.attrs_in_attrsets += attrs.attrs.len() as u64;
        let mut result = Vec::with_capacity(attrs.attrs.len());
        if attrs.rec {
            let new_env = self.alloc_env(env, attrs.attrs.len());
            for (name, def) in attrs.attrs.iter() {
                let value = if def.inherited {
                    self.maybe_thunk(env, &def.e)?
                } else {
                    self.thunk_in_new_frame(&new_env, &def.e)?
                };
                new_env.set(def.displ, value.clone());
                result.push(Attr {
                    name: *name,
                    value,
                    pos: def.pos.clone(),
                });
            }
        } else {
            for (name, def) in attrs.attrs.iter() {
                let value = self.maybe_thunk(env, &def.e)?;
                result.push(Attr {
                    name: *name,
                    value,
                    pos: def.pos.clone(),
                });
            }
        }
        Ok(self.alloc_value(Repr::Attrs(Rc::new(Bindings::from_attrs(result)))))
    }

    fn eval_binop(
        &mut self,
        env: &Env,
        pos: &Pos,
        op: BinOp,
        lhs: &Rc<Expr>,
        rhs: &Rc<Expr>,
    ) -> EvalResult<Value> {
        match op {
            BinOp::Eq | BinOp::NEq => {
                let l = self.eval(env, lhs)?;
                let r = self.eval(env, rhs)?;
                let eq = self.eq_values(&l, &r)?;
                Ok(Value::mk_bool(if op == BinOp::Eq { eq } else { !eq }))
            }
            BinOp::And => {
                let b = self.eval_bool(env, lhs, pos)? && self.eval_bool(env, rhs, pos)?;
                Ok(Value::mk_bool(b))
            }
            BinOp::Or => {
                let b = self.eval_bool(env, lhs, pos)? || self.eval_bool(env, rhs, pos)?;
                Ok(Value::mk_bool(b))
            }
            BinOp::Impl => {
                let b = !self.eval_bool(env, lhs, pos)? || self.eval_bool(env, rhs, pos)?;
                Ok(Value::mk_bool(b))
            }
            BinOp::Update => {
                let l = self.eval(env, lhs)?;
                let r = self.eval(env, rhs)?;
                let l_attrs = self.force_attrs(&l, pos)?;
                let r_attrs = self.force_attrs(&r, pos)?;
                if l_attrs.is_empty() {
                    return Ok(r);
                }
                if r_attrs.is_empty() {
                    return Ok(l);
                }
                self.stats.op_updates += 1;
                self.stats.op_update_values_copied += (l_attrs.len() + r_attrs.len()) as u64;
                Ok(self.alloc_value(Repr::Attrs(Rc::new(l_attrs.update(&r_attrs)))))
            }
            BinOp::ConcatLists => {
                let l = self.eval(env, lhs)?;
                let r = self.eval(env, rhs)?;
                self.concat_lists(&[l, r], pos)
            }
        }
    }

    pub fn concat_lists(&mut self, lists: &[Value], pos: &Pos) -> EvalResult<Value> {
        self.stats.list_concats += 1;
        let lists = lists
            .iter()
            .map(|list| self.force_list(list, pos))
            .collect::<EvalResult<Vec<_>>>()?;
        let mut non_empty = lists.iter().filter(|list| !list.is_empty());
        if let (Some(only), None) = (non_empty.next(), non_empty.next()) {
            return Ok(self.alloc_value(Repr::List(Rc::clone(only))));
        }
        let items: Vec<Value> = lists.iter().flat_map(|list| list.iter().cloned()).collect();
        self.stats.list_elems += items.len() as u64;
        Ok(self.alloc_value(Repr::List(Rc::from(items))))
    }

    /**
    `a + b` and string interpolation.

    The first part decides the result: integers are summed, a path absorbs the
    following parts as strings (which must not refer to the store), and
    anything else produces a string whose context is the union of the parts'.
    */
    fn concat_strings(
        &mut self,
        env: &Env,
        pos: &Pos,
        force_string: bool,
        parts: &[Rc<Expr>],
    ) -> EvalResult<Value> {
        let mut context = PathSet::new();
        let mut text = String::new();
        let mut sum: i64 = 0;
        let mut kind = None;
        for part in parts.iter() {
            let value = self.eval(env, part)?;
            let part_kind = *kind.get_or_insert_with(|| match value.value_type() {
                ValueType::Int => ConcatKind::Int,
                ValueType::Path if !force_string => ConcatKind::Path,
                _ => ConcatKind::String,
            });
            match part_kind {
                ConcatKind::Int => match value.get() {
                    Repr::Int(n) => {
                        sum = sum
                            .checked_add(n)
                            .ok_or_else(|| EvalError::generic("integer overflow", pos))?
                    }
                    _ => {
                        return Err(EvalError::TypeMismatch {
                            expected: ValueType::Int,
                            actual: value.value_type(),
                            pos: pos.clone(),
                        })
                    }
                },
                ConcatKind::Path | ConcatKind::String => {
                    let copy_to_store = part_kind == ConcatKind::String;
                    let s = self.coerce_to_string(pos, &value, &mut context, false, copy_to_store)?;
                    text.push_str(&s);
                }
            }
        }
        match kind {
            Some(ConcatKind::Int) => Ok(Value::mk_int(sum)),
            Some(ConcatKind::Path) => {
                if !context.is_empty() {
                    return Err(EvalError::generic(
                        format!(
                            "a string that refers to a store path cannot be appended to a path, in '{}'",
                            text
                        ),
                        pos,
                    ));
                }
                Ok(self.alloc_value(Repr::Path(Rc::from(canon_path(Path::new(&text))))))
            }
            Some(ConcatKind::String) | None => Ok(Value::mk_string_with_context(&text, context)),
        }
    }

    pub fn is_derivation(&mut self, value: &Value) -> EvalResult<bool> {
        let attrs = match value.get() {
            Repr::Attrs(attrs) => attrs,
            _ => return Ok(false),
        };
        match attrs.get(self.names.type_) {
            None => Ok(false),
            Some(attr) => {
                let ty = attr.value.clone();
                self.force_value(&ty, &attr.pos)?;
                Ok(matches!(ty.get(), Repr::String(s) if s.text.as_ref() == "derivation"))
            }
        }
    }

    /// An attribute set that can be called because it has `__functor`.
    pub fn is_functor(&mut self, value: &Value) -> EvalResult<bool> {
        self.force_value(value, &Pos::none())?;
        Ok(matches!(value.get(), Repr::Attrs(attrs) if attrs.has(self.names.functor)))
    }

    /// Force `value` to a set and select `name` from it.
    pub fn get_attr(&mut self, value: &Value, name: Symbol, pos: &Pos) -> EvalResult<Value> {
        let attrs = self.force_attrs(value, pos)?;
        match attrs.get(name) {
            Some(attr) => Ok(attr.value.clone()),
            None => Err(EvalError::MissingAttribute {
                name: String::from(self.symbols.name(name)),
                pos: pos.clone(),
            }),
        }
    }

    pub fn get_builtin(&self, name: &str) -> Option<Value> {
        let name = self.symbols.lookup(name)?;
        match self.builtins.get() {
            Repr::Attrs(attrs) => attrs.get(name).map(|attr| attr.value.clone()),
            _ => None,
        }
    }

    /// Assign variable coordinates to an expression so that it can be evaluated
    /// in the base environment.
    pub fn bind_expr(&self, mut e: Expr) -> EvalResult<Rc<Expr>> {
        e.bind_vars(&self.static_base_env).map_err(|err| match err {
            BindError::UndefinedVariable { name, pos } => EvalError::UndefinedVariable {
                name: String::from(self.symbols.name(name)),
                pos,
            },
        })?;
        Ok(Rc::new(e))
    }

    pub fn parse_expr_from_string(&mut self, source: &str, path: &Path) -> EvalResult<Rc<Expr>> {
        let e = self
            .parser
            .parse(source, path, &mut self.symbols)
            .map_err(|err| EvalError::Parse {
                message: err.message,
                pos: err.pos,
            })?;
        self.bind_expr(e)
    }

    pub fn parse_expr_from_file(&mut self, path: &Path) -> EvalResult<Rc<Expr>> {
        let path = self.check_source_path(path, &Pos::none())?;
        let source = fs::read_to_string(&path).map_err(|err| EvalError::io(&path, err))?;
        self.parse_expr_from_string(&source, &path)
    }

    /**
    Evaluate the file at `path`, sharing the result with every other
    evaluation of the same file.

    The cache entry is a thunk installed before evaluation starts, so a file
    that imports itself hits the blackhole and fails with infinite recursion.
    A failed evaluation leaves nothing in the cache.
    */
    pub fn eval_file(&mut self, path: &Path) -> EvalResult<Value> {
        let path = self.substitute_path(&canon_path(path));
        if let Some(value) = self.file_eval_cache.get(&path) {
            return Ok(value.clone());
        }
        let resolved = resolve_expr_path(&path);
        if let Some(value) = self.file_eval_cache.get(&resolved).cloned() {
            self.file_eval_cache.insert(path, value.clone());
            return Ok(value);
        }

        debug!(path = %resolved.display(), "evaluating file");
        let e = self.parse_expr_from_file(&resolved)?;
        let env = self.base_env.clone();
        let value = self.mk_thunk(&env, &e);
        self.file_eval_cache.insert(resolved.clone(), value.clone());
        self.file_eval_cache.insert(path.clone(), value.clone());
        let file: Rc<str> = Rc::from(resolved.to_string_lossy().as_ref());
        let pos = Pos {
            file: Some(file),
            line: 1,
            column: 1,
        };
        match self.force_value(&value, &pos) {
            Ok(()) => Ok(value),
            Err(err) => {
                self.file_eval_cache.remove(&resolved);
                self.file_eval_cache.remove(&path);
                Err(err)
            }
        }
    }

    pub fn reset_file_cache(&mut self) {
        self.file_eval_cache.clear();
    }

    pub fn print_stats(&self) {
        if !self.config.show_stats {
            return;
        }
        let stats = &self.stats;
        info!(
            envs = stats.envs,
            values = stats.values,
            thunks = stats.thunks,
            thunks_avoided = stats.thunks_avoided,
            function_calls = stats.function_calls,
            primop_calls = stats.primop_calls,
            "evaluation statistics"
        );
        match stats.to_json() {
            Ok(json) => info!("{}", json),
            Err(err) => warn!(%err, "cannot serialise evaluation statistics"),
        }
    }
}

