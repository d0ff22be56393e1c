#![deny(unused_crate_dependencies)]

#[cfg(test)]
mod test;

pub mod scope;

use fnv::FnvHashMap;
pub use scope::{BindError, StaticEnv};
use std::{
    fmt::{self, Display},
    path::Path,
    rc::Rc,
};

/// A source position. Positions are only used for error reporting, so a missing
/// position is represented rather than being an error.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Pos {
    pub file: Option<Rc<str>>,
    pub line: u32,
    pub column: u32,
}

impl Pos {
    pub fn new(file: &str, line: u32, column: u32) -> Self {
        Pos {
            file: Some(Rc::from(file)),
            line,
            column,
        }
    }

    pub fn none() -> Self {
        Pos::default()
    }

    pub fn is_none(&self) -> bool {
        self.file.is_none()
    }
}

impl Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            None => f.write_str("undefined position"),
            Some(file) => write!(f, "{}:{}:{}", file, self.line, self.column),
        }
    }
}

/// An interned identifier.
///
/// Symbols compare by interning identity, which is stable within one
/// [`SymbolTable`] but not across processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

#[derive(Debug, Default)]
pub struct SymbolTable {
    names: Vec<Rc<str>>,
    index: FnvHashMap<Rc<str>, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            names: Vec::new(),
            index: FnvHashMap::default(),
        }
    }

    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(symbol) = self.index.get(name) {
            return *symbol;
        }
        let symbol = Symbol(self.names.len() as u32);
        let name: Rc<str> = Rc::from(name);
        self.names.push(name.clone());
        self.index.insert(name, symbol);
        symbol
    }

    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        self.index.get(name).copied()
    }

    pub fn name(&self, symbol: Symbol) -> &str {
        &self.names[symbol.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/**
A variable reference.

`level` and `displ` are filled in by [`Expr::bind_vars`]. When `from_with` is
`false` the variable lives in slot `displ` of the frame `level` steps up the
environment chain. Otherwise `level` points at the nearest enclosing `with` frame
and the name has to be looked up dynamically.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprVar {
    pub pos: Pos,
    pub name: Symbol,
    pub from_with: bool,
    pub level: usize,
    pub displ: usize,
}

impl ExprVar {
    pub fn new(pos: Pos, name: Symbol) -> Self {
        ExprVar {
            pos,
            name,
            from_with: false,
            level: 0,
            displ: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrDef {
    /// `inherit x;` definitions are evaluated in the enclosing scope, even in a
    /// recursive attribute set.
    pub inherited: bool,
    pub e: Rc<Expr>,
    pub pos: Pos,
    pub displ: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExprAttrs {
    pub rec: bool,
    pub attrs: Vec<(Symbol, AttrDef)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formal {
    pub pos: Pos,
    pub name: Symbol,
    pub default: Option<Rc<Expr>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Formals {
    pub formals: Vec<Formal>,
    pub ellipsis: bool,
}

impl Formals {
    pub fn has(&self, name: Symbol) -> bool {
        self.formals.iter().any(|formal| formal.name == name)
    }
}

/**
A function literal.

`arg` is the plain argument name (`x: ...`) or the `@` binding of an attribute
set pattern (`args@{ a, b ? 1 }: ...`). `formals` is present exactly when the
lambda destructures an attribute set.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprLambda {
    pub pos: Pos,
    pub name: Option<Symbol>,
    pub arg: Option<Symbol>,
    pub formals: Option<Formals>,
    pub body: Rc<Expr>,
}

impl ExprLambda {
    pub fn frame_size(&self) -> usize {
        self.arg.map_or(0, |_| 1) + self.formals.as_ref().map_or(0, |f| f.formals.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Eq,
    NEq,
    And,
    Or,
    Impl,
    Update,
    ConcatLists,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Int(i64),
    String(Rc<str>),
    Path(Rc<Path>),
    Var(ExprVar),
    Select {
        pos: Pos,
        e: Rc<Expr>,
        path: Vec<Symbol>,
        default: Option<Rc<Expr>>,
    },
    HasAttr {
        e: Rc<Expr>,
        path: Vec<Symbol>,
    },
    Attrs(ExprAttrs),
    List(Vec<Rc<Expr>>),
    Lambda(Rc<ExprLambda>),
    App {
        pos: Pos,
        fun: Rc<Expr>,
        arg: Rc<Expr>,
    },
    Let {
        attrs: ExprAttrs,
        body: Rc<Expr>,
    },
    With {
        pos: Pos,
        attrs: Rc<Expr>,
        body: Rc<Expr>,
        prev_with: usize,
    },
    If {
        pos: Pos,
        cond: Rc<Expr>,
        then: Rc<Expr>,
        else_: Rc<Expr>,
    },
    Assert {
        pos: Pos,
        cond: Rc<Expr>,
        body: Rc<Expr>,
    },
    Not {
        pos: Pos,
        e: Rc<Expr>,
    },
    BinOp {
        pos: Pos,
        op: BinOp,
        lhs: Rc<Expr>,
        rhs: Rc<Expr>,
    },
    /// `a + b` and string interpolation. The type of the first part decides
    /// whether the result is an integer, a path or a string.
    ConcatStrings {
        pos: Pos,
        force_string: bool,
        parts: Vec<Rc<Expr>>,
    },
    CurPos(Pos),
}

impl Expr {
    pub fn mk_int(n: i64) -> Self {
        Expr::Int(n)
    }

    pub fn mk_string(s: &str) -> Self {
        Expr::String(Rc::from(s))
    }

    pub fn mk_path(path: &Path) -> Self {
        Expr::Path(Rc::from(path))
    }

    pub fn mk_var(name: Symbol) -> Self {
        Expr::Var(ExprVar::new(Pos::none(), name))
    }

    pub fn mk_var_at(pos: Pos, name: Symbol) -> Self {
        Expr::Var(ExprVar::new(pos, name))
    }

    pub fn mk_app(fun: Expr, arg: Expr) -> Self {
        Expr::App {
            pos: Pos::none(),
            fun: Rc::new(fun),
            arg: Rc::new(arg),
        }
    }

    /// `f a b c`
    pub fn mk_apps(fun: Expr, args: Vec<Expr>) -> Self {
        args.into_iter().fold(fun, Expr::mk_app)
    }

    pub fn mk_lambda(arg: Symbol, body: Expr) -> Self {
        Expr::Lambda(Rc::new(ExprLambda {
            pos: Pos::none(),
            name: None,
            arg: Some(arg),
            formals: None,
            body: Rc::new(body),
        }))
    }

    /// `arg@{ formals }: body`. Each formal is a name and an optional default.
    pub fn mk_pattern_lambda(
        arg: Option<Symbol>,
        formals: Vec<(Symbol, Option<Expr>)>,
        ellipsis: bool,
        body: Expr,
    ) -> Self {
        Expr::Lambda(Rc::new(ExprLambda {
            pos: Pos::none(),
            name: None,
            arg,
            formals: Some(Formals {
                formals: formals
                    .into_iter()
                    .map(|(name, default)| Formal {
                        pos: Pos::none(),
                        name,
                        default: default.map(Rc::new),
                    })
                    .collect(),
                ellipsis,
            }),
            body: Rc::new(body),
        }))
    }

    fn mk_attr_defs(attrs: Vec<(Symbol, Expr)>) -> Vec<(Symbol, AttrDef)> {
        attrs
            .into_iter()
            .map(|(name, e)| {
                (
                    name,
                    AttrDef {
                        inherited: false,
                        e: Rc::new(e),
                        pos: Pos::none(),
                        displ: 0,
                    },
                )
            })
            .collect()
    }

    pub fn mk_attrs(attrs: Vec<(Symbol, Expr)>) -> Self {
        Expr::Attrs(ExprAttrs {
            rec: false,
            attrs: Expr::mk_attr_defs(attrs),
        })
    }

    pub fn mk_rec_attrs(attrs: Vec<(Symbol, Expr)>) -> Self {
        Expr::Attrs(ExprAttrs {
            rec: true,
            attrs: Expr::mk_attr_defs(attrs),
        })
    }

    pub fn mk_list(items: Vec<Expr>) -> Self {
        Expr::List(items.into_iter().map(Rc::new).collect())
    }

    pub fn mk_let(bindings: Vec<(Symbol, Expr)>, body: Expr) -> Self {
        Expr::Let {
            attrs: ExprAttrs {
                rec: true,
                attrs: Expr::mk_attr_defs(bindings),
            },
            body: Rc::new(body),
        }
    }

    pub fn mk_with(attrs: Expr, body: Expr) -> Self {
        Expr::With {
            pos: Pos::none(),
            attrs: Rc::new(attrs),
            body: Rc::new(body),
            prev_with: 0,
        }
    }

    pub fn mk_select(e: Expr, path: Vec<Symbol>) -> Self {
        Expr::Select {
            pos: Pos::none(),
            e: Rc::new(e),
            path,
            default: None,
        }
    }

    pub fn mk_if(cond: Expr, then: Expr, else_: Expr) -> Self {
        Expr::If {
            pos: Pos::none(),
            cond: Rc::new(cond),
            then: Rc::new(then),
            else_: Rc::new(else_),
        }
    }

    pub fn mk_binop(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::BinOp {
            pos: Pos::none(),
            op,
            lhs: Rc::new(lhs),
            rhs: Rc::new(rhs),
        }
    }

    pub fn mk_concat(parts: Vec<Expr>) -> Self {
        Expr::ConcatStrings {
            pos: Pos::none(),
            force_string: false,
            parts: parts.into_iter().map(Rc::new).collect(),
        }
    }

    /// A string with interpolations, `"${a}${b}"`.
    pub fn mk_interpolation(parts: Vec<Expr>) -> Self {
        Expr::ConcatStrings {
            pos: Pos::none(),
            force_string: true,
            parts: parts.into_iter().map(Rc::new).collect(),
        }
    }
}
