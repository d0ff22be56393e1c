#[cfg(test)]
use crate::{BindError, Expr, ExprVar, Pos, StaticEnv, SymbolTable};
#[cfg(test)]
use pretty_assertions::assert_eq;
#[cfg(test)]
use std::rc::Rc;

#[cfg(test)]
fn var_of(expr: &Expr) -> &ExprVar {
    match expr {
        Expr::Var(var) => var,
        expr => panic!("expected variable, got {:?}", expr),
    }
}

#[cfg(test)]
fn lambda_body(expr: &Expr) -> &Expr {
    match expr {
        Expr::Lambda(lambda) => &lambda.body,
        expr => panic!("expected lambda, got {:?}", expr),
    }
}

#[test]
fn intern_test_1() {
    let mut symbols = SymbolTable::new();
    let a = symbols.intern("a");
    let b = symbols.intern("b");
    assert_eq!(a, symbols.intern("a"));
    assert!(a != b);
    assert_eq!("b", symbols.name(b));
    assert_eq!(2, symbols.len());
}

#[test]
fn pos_display_test_1() {
    assert_eq!("a.reel:3:7", Pos::new("a.reel", 3, 7).to_string());
    assert_eq!("undefined position", Pos::none().to_string());
}

#[test]
fn bind_vars_test_1() {
    // x: y: x
    let mut symbols = SymbolTable::new();
    let x = symbols.intern("x");
    let y = symbols.intern("y");
    let mut expr = Expr::mk_lambda(x, Expr::mk_lambda(y, Expr::mk_var(x)));
    let base = StaticEnv::new(false, None);
    expr.bind_vars(&base).unwrap();

    let var = var_of(lambda_body(lambda_body(&expr)));
    assert_eq!((false, 1, 0), (var.from_with, var.level, var.displ));
}

#[test]
fn bind_vars_test_2() {
    // let a = 1; b = a; in b
    let mut symbols = SymbolTable::new();
    let a = symbols.intern("a");
    let b = symbols.intern("b");
    let mut expr = Expr::mk_let(
        vec![(a, Expr::mk_int(1)), (b, Expr::mk_var(a))],
        Expr::mk_var(b),
    );
    expr.bind_vars(&StaticEnv::new(false, None)).unwrap();

    match &expr {
        Expr::Let { attrs, body } => {
            let var = var_of(&attrs.attrs[1].1.e);
            assert_eq!((false, 0, 0), (var.from_with, var.level, var.displ));
            assert_eq!(1, attrs.attrs[1].1.displ);
            let var = var_of(body);
            assert_eq!((false, 0, 1), (var.from_with, var.level, var.displ));
        }
        expr => panic!("expected let, got {:?}", expr),
    }
}

#[test]
fn bind_vars_test_3() {
    // with e; with f; x
    let mut symbols = SymbolTable::new();
    let e = symbols.intern("e");
    let f = symbols.intern("f");
    let x = symbols.intern("x");
    let mut base = StaticEnv::new(false, None);
    base.vars.insert(e, 0);
    base.vars.insert(f, 1);
    let mut expr = Expr::mk_with(
        Expr::mk_var(e),
        Expr::mk_with(Expr::mk_var(f), Expr::mk_var(x)),
    );
    expr.bind_vars(&base).unwrap();

    match &expr {
        Expr::With {
            body, prev_with, ..
        } => {
            assert_eq!(0, *prev_with);
            match body.as_ref() {
                Expr::With {
                    body, prev_with, ..
                } => {
                    assert_eq!(1, *prev_with);
                    let var = var_of(body);
                    assert_eq!((true, 0), (var.from_with, var.level));
                }
                expr => panic!("expected with, got {:?}", expr),
            }
        }
        expr => panic!("expected with, got {:?}", expr),
    }
}

#[test]
fn bind_vars_test_4() {
    // a plain binding shadows a `with` that encloses it
    let mut symbols = SymbolTable::new();
    let e = symbols.intern("e");
    let x = symbols.intern("x");
    let mut base = StaticEnv::new(false, None);
    base.vars.insert(e, 0);
    let mut expr = Expr::mk_lambda(x, Expr::mk_with(Expr::mk_var(e), Expr::mk_var(x)));
    expr.bind_vars(&base).unwrap();

    match lambda_body(&expr) {
        Expr::With { body, .. } => {
            let var = var_of(body);
            assert_eq!((false, 1, 0), (var.from_with, var.level, var.displ));
        }
        expr => panic!("expected with, got {:?}", expr),
    }
}

#[test]
fn bind_vars_test_5() {
    let mut symbols = SymbolTable::new();
    let x = symbols.intern("x");
    let pos = Pos::new("main.reel", 1, 5);
    let mut expr = Expr::mk_var_at(pos.clone(), x);
    let expected = Err(BindError::UndefinedVariable { name: x, pos });
    let actual = expr.bind_vars(&StaticEnv::new(false, None));
    assert_eq!(expected, actual);
}

#[test]
fn bind_vars_test_6() {
    // args@{ a, b ? a }: b
    let mut symbols = SymbolTable::new();
    let args = symbols.intern("args");
    let a = symbols.intern("a");
    let b = symbols.intern("b");
    let mut expr = Expr::mk_pattern_lambda(
        Some(args),
        vec![(a, None), (b, Some(Expr::mk_var(a)))],
        false,
        Expr::mk_var(b),
    );
    expr.bind_vars(&StaticEnv::new(false, None)).unwrap();

    match &expr {
        Expr::Lambda(lambda) => {
            let formals = lambda.formals.as_ref().unwrap();
            let default = formals.formals[1].default.as_ref().map(Rc::as_ref).unwrap();
            assert_eq!(1, var_of(default).displ);
            assert_eq!(2, var_of(&lambda.body).displ);
            assert_eq!(3, lambda.frame_size());
        }
        expr => panic!("expected lambda, got {:?}", expr),
    }
}
