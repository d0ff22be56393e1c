use crate::{env::Env, error::EvalResult, EvalState};
use reel_store::PathSet;
use reel_syntax::{Expr, ExprLambda, Pos, Symbol};
use std::{
    cell::RefCell,
    fmt::{self, Debug, Display},
    path::Path,
    rc::Rc,
};

/// The native implementation of a built-in. It receives exactly `arity` arguments.
pub type PrimOpFn = Rc<dyn Fn(&mut EvalState, &[Value], &Pos) -> EvalResult<Value>>;

pub struct PrimOp {
    pub name: Rc<str>,
    pub arity: usize,
    pub fun: PrimOpFn,
}

impl Debug for PrimOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimOp")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// A string together with the store paths its content depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Str {
    pub text: Rc<str>,
    pub context: PathSet,
}

#[derive(Debug, Clone)]
pub struct Attr {
    pub name: Symbol,
    pub value: Value,
    pub pos: Pos,
}

/**
The attributes of a set, kept sorted by symbol so that lookups can binary
search. Names are unique.
*/
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    attrs: Vec<Attr>,
}

impl Bindings {
    pub fn new() -> Self {
        Bindings { attrs: Vec::new() }
    }

    /// Build a set from attributes in any order. When a name occurs more than
    /// once, the first occurrence wins.
    pub fn from_attrs(mut attrs: Vec<Attr>) -> Self {
        attrs.sort_by_key(|attr| attr.name);
        attrs.dedup_by_key(|attr| attr.name);
        Bindings { attrs }
    }

    pub fn get(&self, name: Symbol) -> Option<&Attr> {
        self.attrs
            .binary_search_by_key(&name, |attr| attr.name)
            .ok()
            .map(|ix| &self.attrs[ix])
    }

    pub fn has(&self, name: Symbol) -> bool {
        self.get(name).is_some()
    }

    /// Insert or replace an attribute.
    pub fn insert(&mut self, attr: Attr) {
        match self.attrs.binary_search_by_key(&attr.name, |attr| attr.name) {
            Ok(ix) => self.attrs[ix] = attr,
            Err(ix) => self.attrs.insert(ix, attr),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attr> {
        self.attrs.iter()
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// `self // other`: attributes of `other` take precedence.
    pub fn update(&self, other: &Bindings) -> Bindings {
        let mut attrs = Vec::with_capacity(self.len() + other.len());
        let mut left = self.attrs.iter().peekable();
        let mut right = other.attrs.iter().peekable();
        loop {
            match (left.peek(), right.peek()) {
                (Some(l), Some(r)) if l.name < r.name => {
                    attrs.push((*l).clone());
                    left.next();
                }
                (Some(l), Some(r)) if l.name == r.name => {
                    attrs.push((*r).clone());
                    left.next();
                    right.next();
                }
                (_, Some(r)) => {
                    attrs.push((*r).clone());
                    right.next();
                }
                (Some(l), None) => {
                    attrs.push((*l).clone());
                    left.next();
                }
                (None, None) => break,
            }
        }
        Bindings { attrs }
    }
}

impl<'a> IntoIterator for &'a Bindings {
    type Item = &'a Attr;
    type IntoIter = std::slice::Iter<'a, Attr>;

    fn into_iter(self) -> Self::IntoIter {
        self.attrs.iter()
    }
}

#[derive(Clone)]
pub enum Repr {
    Int(i64),
    Bool(bool),
    Null,
    String(Rc<Str>),
    Path(Rc<Path>),
    List(Rc<[Value]>),
    Attrs(Rc<Bindings>),
    Lambda {
        env: Env,
        fun: Rc<ExprLambda>,
    },
    PrimOp(Rc<PrimOp>),
    /// A built-in applied to some of its arguments. A pending call has as many
    /// arguments as the arity and completes when forced.
    PrimOpApp {
        op: Rc<PrimOp>,
        args: Rc<[Value]>,
    },
    Thunk {
        env: Env,
        expr: Rc<Expr>,
    },
    /// A delayed function application.
    App {
        fun: Value,
        arg: Value,
    },
    Blackhole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Int,
    Bool,
    String,
    Path,
    Null,
    Attrs,
    List,
    Lambda,
    PrimOp,
    PrimOpApp,
    Thunk,
    App,
    Blackhole,
}

impl ValueType {
    /// The name `builtins.typeOf` reports.
    pub fn type_of(self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::Bool => "bool",
            ValueType::String => "string",
            ValueType::Path => "path",
            ValueType::Null => "null",
            ValueType::Attrs => "set",
            ValueType::List => "list",
            ValueType::Lambda | ValueType::PrimOp | ValueType::PrimOpApp => "lambda",
            ValueType::Thunk | ValueType::App | ValueType::Blackhole => "thunk",
        }
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueType::Int => "an integer",
            ValueType::Bool => "a boolean",
            ValueType::String => "a string",
            ValueType::Path => "a path",
            ValueType::Null => "null",
            ValueType::Attrs => "a set",
            ValueType::List => "a list",
            ValueType::Lambda => "a function",
            ValueType::PrimOp => "a built-in function",
            ValueType::PrimOpApp => "a partially applied built-in function",
            ValueType::Thunk => "a thunk",
            ValueType::App => "a function application",
            ValueType::Blackhole => "a black hole",
        })
    }
}

/**
A reference to a value slot.

Cloning a `Value` shares the slot. Forcing overwrites the slot in place, so
every holder of the reference observes the result.
*/
#[derive(Clone)]
pub struct Value(pub(crate) Rc<RefCell<Repr>>);

impl Value {
    pub fn new(repr: Repr) -> Self {
        Value(Rc::new(RefCell::new(repr)))
    }

    pub fn mk_int(n: i64) -> Self {
        Value::new(Repr::Int(n))
    }

    pub fn mk_bool(b: bool) -> Self {
        Value::new(Repr::Bool(b))
    }

    pub fn mk_null() -> Self {
        Value::new(Repr::Null)
    }

    pub fn mk_string(text: &str) -> Self {
        Value::mk_string_with_context(text, PathSet::new())
    }

    pub fn mk_string_with_context(text: &str, context: PathSet) -> Self {
        Value::new(Repr::String(Rc::new(Str {
            text: Rc::from(text),
            context,
        })))
    }

    pub fn mk_path(path: &Path) -> Self {
        Value::new(Repr::Path(Rc::from(path)))
    }

    pub fn mk_list(items: Vec<Value>) -> Self {
        Value::new(Repr::List(Rc::from(items)))
    }

    pub fn mk_attrs(bindings: Bindings) -> Self {
        Value::new(Repr::Attrs(Rc::new(bindings)))
    }

    pub fn mk_thunk(env: Env, expr: Rc<Expr>) -> Self {
        Value::new(Repr::Thunk { env, expr })
    }

    pub fn mk_app(fun: Value, arg: Value) -> Self {
        Value::new(Repr::App { fun, arg })
    }

    pub fn mk_primop(op: PrimOp) -> Self {
        Value::new(Repr::PrimOp(Rc::new(op)))
    }

    /// A snapshot of the slot's current contents.
    pub fn get(&self) -> Repr {
        self.0.borrow().clone()
    }

    pub(crate) fn set(&self, repr: Repr) {
        *self.0.borrow_mut() = repr;
    }

    pub fn value_type(&self) -> ValueType {
        match &*self.0.borrow() {
            Repr::Int(_) => ValueType::Int,
            Repr::Bool(_) => ValueType::Bool,
            Repr::Null => ValueType::Null,
            Repr::String(_) => ValueType::String,
            Repr::Path(_) => ValueType::Path,
            Repr::List(_) => ValueType::List,
            Repr::Attrs(_) => ValueType::Attrs,
            Repr::Lambda { .. } => ValueType::Lambda,
            Repr::PrimOp(_) => ValueType::PrimOp,
            Repr::PrimOpApp { .. } => ValueType::PrimOpApp,
            Repr::Thunk { .. } => ValueType::Thunk,
            Repr::App { .. } => ValueType::App,
            Repr::Blackhole => ValueType::Blackhole,
        }
    }

    /// The kind of value, as error messages describe it.
    pub fn show_type(&self) -> String {
        self.value_type().to_string()
    }

    pub fn is_function(&self) -> bool {
        matches!(
            self.value_type(),
            ValueType::Lambda | ValueType::PrimOp | ValueType::PrimOpApp
        )
    }

    /// Both references point at the same slot.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /**
    Both values are the same object: either the same slot, or two slots that
    were overwritten with the same shared payload (as happens when two thunks
    are forced to one memoised value).
    */
    pub fn is_identical(&self, other: &Value) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (&*self.0.borrow(), &*other.0.borrow()) {
            (Repr::String(a), Repr::String(b)) => Rc::ptr_eq(a, b),
            (Repr::Path(a), Repr::Path(b)) => Rc::ptr_eq(a, b),
            (Repr::List(a), Repr::List(b)) => Rc::ptr_eq(a, b),
            (Repr::Attrs(a), Repr::Attrs(b)) => Rc::ptr_eq(a, b),
            (Repr::Lambda { env: e1, fun: f1 }, Repr::Lambda { env: e2, fun: f2 }) => {
                e1.ptr_eq(e2) && Rc::ptr_eq(f1, f2)
            }
            (Repr::PrimOp(a), Repr::PrimOp(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Environments are cyclic, so only scalars are shown in full.
        match self.0.try_borrow() {
            Err(_) => f.write_str("<borrowed>"),
            Ok(repr) => match &*repr {
                Repr::Int(n) => write!(f, "{}", n),
                Repr::Bool(b) => write!(f, "{}", b),
                Repr::Null => f.write_str("null"),
                Repr::String(s) => write!(f, "{:?}", s.text),
                Repr::Path(p) => write!(f, "{}", p.display()),
                Repr::List(items) => f.debug_list().entries(items.iter()).finish(),
                Repr::Attrs(attrs) => write!(f, "<set of {}>", attrs.len()),
                Repr::Lambda { .. } => f.write_str("<lambda>"),
                Repr::PrimOp(op) => write!(f, "<primop {}>", op.name),
                Repr::PrimOpApp { op, args } => {
                    write!(f, "<primop-app {}/{}>", op.name, args.len())
                }
                Repr::Thunk { .. } | Repr::App { .. } => f.write_str("<thunk>"),
                Repr::Blackhole => f.write_str("<blackhole>"),
            },
        }
    }
}
