#[cfg(test)]
use crate::{
    test::{builtin, fixture, run, run_ints, run_string, var},
    EvalConfig, EvalError, EvalState, Value,
};
#[cfg(test)]
use pretty_assertions::assert_eq;
#[cfg(test)]
use reel_syntax::{Expr, Pos, SymbolTable};
#[cfg(test)]
use std::path::Path;

/// `builtins.<name> arg1 arg2 ...`
#[cfg(test)]
fn call(symbols: &mut SymbolTable, name: &str, args: Vec<Expr>) -> Expr {
    Expr::mk_apps(builtin(symbols, name), args)
}

#[cfg(test)]
fn strings(state: &mut EvalState, value: &Value) -> Vec<String> {
    let items = state.force_list(value, &Pos::none()).unwrap();
    items
        .iter()
        .map(|item| {
            let s = state.force_string_no_ctx(item, &Pos::none()).unwrap();
            String::from(s.as_ref())
        })
        .collect()
}

#[test]
fn arith_test_1() {
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let e = Expr::mk_list(vec![
        call(s, "sub", vec![Expr::mk_int(10), Expr::mk_int(3)]),
        call(s, "mul", vec![Expr::mk_int(6), Expr::mk_int(7)]),
        call(s, "div", vec![Expr::mk_int(-7), Expr::mk_int(2)]),
    ]);
    assert_eq!(vec![7, 42, -3], run_ints(&mut f.state, e).unwrap());
}

#[test]
fn arith_test_2() {
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let by_zero = call(s, "div", vec![Expr::mk_int(1), Expr::mk_int(0)]);
    let overflow = call(s, "mul", vec![Expr::mk_int(i64::MAX), Expr::mk_int(2)]);
    assert_eq!(
        "division by zero",
        run(&mut f.state, by_zero).unwrap_err().to_string()
    );
    assert_eq!(
        "integer overflow",
        run(&mut f.state, overflow).unwrap_err().to_string()
    );
}

#[test]
fn less_than_test_1() {
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let ints = call(s, "lessThan", vec![Expr::mk_int(1), Expr::mk_int(2)]);
    let strings = call(
        s,
        "lessThan",
        vec![Expr::mk_string("b"), Expr::mk_string("a")],
    );
    let mixed = call(s, "lessThan", vec![Expr::mk_int(1), Expr::mk_string("a")]);

    let value = run(&mut f.state, ints).unwrap();
    assert!(f.state.force_bool(&value, &Pos::none()).unwrap());
    let value = run(&mut f.state, strings).unwrap();
    assert!(!f.state.force_bool(&value, &Pos::none()).unwrap());
    assert_eq!(
        "value is a string while an integer was expected",
        run(&mut f.state, mixed).unwrap_err().to_string()
    );
}

#[test]
fn match_test_1() {
    // builtins.match "([a-z]+)-([0-9]+)(\.tar)?" "hello-42"
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let e = call(
        s,
        "match",
        vec![
            Expr::mk_string("([a-z]+)-([0-9]+)(\\.tar)?"),
            Expr::mk_string("hello-42"),
        ],
    );
    let value = run(&mut f.state, e).unwrap();
    let items = f.state.force_list(&value, &Pos::none()).unwrap();
    assert_eq!(3, items.len());
    assert_eq!(
        "hello",
        f.state
            .force_string_no_ctx(&items[0], &Pos::none())
            .unwrap()
            .as_ref()
    );
    assert_eq!(
        "42",
        f.state
            .force_string_no_ctx(&items[1], &Pos::none())
            .unwrap()
            .as_ref()
    );
    f.state.force_value(&items[2], &Pos::none()).unwrap();
    assert_eq!("null", items[2].value_type().type_of());
}

#[test]
fn match_test_2() {
    // the whole string has to match
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let partial = call(
        s,
        "match",
        vec![Expr::mk_string("[a-z]+"), Expr::mk_string("abc1")],
    );
    let invalid = call(s, "match", vec![Expr::mk_string("("), Expr::mk_string("")]);

    let value = run(&mut f.state, partial).unwrap();
    assert_eq!("null", value.value_type().type_of());
    assert!(run(&mut f.state, invalid).is_err());
    // only the valid expression is cached
    assert_eq!(1, f.state.regex_cache.len());
}

#[test]
fn attr_names_test_1() {
    // names are sorted as text, not by when they were first seen
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let zeta = s.intern("zeta");
    let alpha = s.intern("alpha");
    let mid = s.intern("mid");
    let set = || {
        Expr::mk_attrs(vec![
            (zeta, Expr::mk_int(1)),
            (alpha, Expr::mk_int(2)),
            (mid, Expr::mk_int(3)),
        ])
    };
    let names = call(s, "attrNames", vec![set()]);
    let values = call(s, "attrValues", vec![set()]);

    let value = run(&mut f.state, names).unwrap();
    assert_eq!(
        vec!["alpha", "mid", "zeta"],
        strings(&mut f.state, &value)
    );
    assert_eq!(vec![2, 3, 1], run_ints(&mut f.state, values).unwrap());
}

#[test]
fn list_to_attrs_test_1() {
    // listToAttrs [ { name = "a"; value = 1; } { name = "b"; value = 2; } { name = "a"; value = 3; } ]
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let name = s.intern("name");
    let value = s.intern("value");
    let a = s.intern("a");
    let b = s.intern("b");
    let item = |n: &str, v: i64| {
        Expr::mk_attrs(vec![(name, Expr::mk_string(n)), (value, Expr::mk_int(v))])
    };
    let e = call(
        s,
        "listToAttrs",
        vec![Expr::mk_list(vec![item("a", 1), item("b", 2), item("a", 3)])],
    );
    let set = run(&mut f.state, e).unwrap();
    let a = f.state.get_attr(&set, a, &Pos::none()).unwrap();
    let b = f.state.get_attr(&set, b, &Pos::none()).unwrap();
    assert_eq!(1, f.state.force_int(&a, &Pos::none()).unwrap());
    assert_eq!(2, f.state.force_int(&b, &Pos::none()).unwrap());
    assert_eq!(2, f.state.force_attrs(&set, &Pos::none()).unwrap().len());
}

#[test]
fn attrs_test_1() {
    // removeAttrs, intersectAttrs, hasAttr and getAttr on { a = 1; b = 2; c = 3; }
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let a = s.intern("a");
    let b = s.intern("b");
    let c = s.intern("c");
    let set = || {
        Expr::mk_attrs(vec![
            (a, Expr::mk_int(1)),
            (b, Expr::mk_int(2)),
            (c, Expr::mk_int(3)),
        ])
    };
    let removed = call(
        s,
        "removeAttrs",
        vec![set(), Expr::mk_list(vec![Expr::mk_string("b")])],
    );
    let removed = call(s, "attrNames", vec![removed]);
    let intersected = call(
        s,
        "intersectAttrs",
        vec![Expr::mk_attrs(vec![(c, Expr::mk_int(0))]), set()],
    );
    let intersected = call(s, "attrValues", vec![intersected]);
    let has = call(s, "hasAttr", vec![Expr::mk_string("d"), set()]);
    let get = call(s, "getAttr", vec![Expr::mk_string("b"), set()]);
    let missing = call(s, "getAttr", vec![Expr::mk_string("d"), set()]);

    let value = run(&mut f.state, removed).unwrap();
    assert_eq!(vec!["a", "c"], strings(&mut f.state, &value));
    assert_eq!(vec![3], run_ints(&mut f.state, intersected).unwrap());
    let value = run(&mut f.state, has).unwrap();
    assert!(!f.state.force_bool(&value, &Pos::none()).unwrap());
    let value = run(&mut f.state, get).unwrap();
    assert_eq!(2, f.state.force_int(&value, &Pos::none()).unwrap());
    assert_eq!(
        "attribute 'd' missing",
        run(&mut f.state, missing).unwrap_err().to_string()
    );
}

#[test]
fn function_args_test_1() {
    // functionArgs ({ a, b ? 1 }: a)
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let a = s.intern("a");
    let b = s.intern("b");
    let e = call(
        s,
        "functionArgs",
        vec![Expr::mk_pattern_lambda(
            None,
            vec![(a, None), (b, Some(Expr::mk_int(1)))],
            false,
            Expr::mk_var(a),
        )],
    );
    let set = run(&mut f.state, e).unwrap();
    let a = f.state.get_attr(&set, a, &Pos::none()).unwrap();
    let b = f.state.get_attr(&set, b, &Pos::none()).unwrap();
    assert!(!f.state.force_bool(&a, &Pos::none()).unwrap());
    assert!(f.state.force_bool(&b, &Pos::none()).unwrap());
}

#[test]
fn gen_list_test_1() {
    // length (genList (i: throw "forced") 3) doesn't call the generator
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let i = s.intern("i");
    let generator = Expr::mk_lambda(
        i,
        Expr::mk_app(var(s, "throw"), Expr::mk_string("forced")),
    );
    let list = call(s, "genList", vec![generator, Expr::mk_int(3)]);
    let length = call(s, "length", vec![list]);
    let value = run(&mut f.state, length).unwrap();
    assert_eq!(3, f.state.force_int(&value, &Pos::none()).unwrap());
}

#[test]
fn gen_list_test_2() {
    // genList (i: i * i) 4
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let i = s.intern("i");
    let square = Expr::mk_lambda(i, call(s, "mul", vec![Expr::mk_var(i), Expr::mk_var(i)]));
    let e = call(s, "genList", vec![square, Expr::mk_int(4)]);
    assert_eq!(vec![0, 1, 4, 9], run_ints(&mut f.state, e).unwrap());
}

#[test]
fn gen_list_test_3() {
    // genList (i: i) n fails for sizes that cannot be allocated
    let mut f = fixture(EvalConfig::new());
    for n in [i64::MAX, -1] {
        let s = &mut f.state.symbols;
        let i = s.intern("i");
        let e = call(s, "genList", vec![Expr::mk_lambda(i, Expr::mk_var(i)), Expr::mk_int(n)]);
        match run_ints(&mut f.state, e) {
            Err(EvalError::Generic { message, .. }) => {
                assert_eq!(format!("cannot create list of size {}", n), message)
            }
            result => panic!("expected an error, got {:?}", result),
        }
    }
}

#[test]
fn map_test_1() {
    // map (x: x + 1) [1 (throw "forced") 3], only the first element is used
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let x = s.intern("x");
    let increment = Expr::mk_lambda(x, Expr::mk_concat(vec![Expr::mk_var(x), Expr::mk_int(1)]));
    let list = Expr::mk_list(vec![
        Expr::mk_int(1),
        Expr::mk_app(var(s, "throw"), Expr::mk_string("forced")),
        Expr::mk_int(3),
    ]);
    let mapped = call(s, "map", vec![increment, list]);
    let e = call(s, "head", vec![mapped]);
    let value = run(&mut f.state, e).unwrap();
    assert_eq!(2, f.state.force_int(&value, &Pos::none()).unwrap());
}

#[test]
fn foldl_test_1() {
    // foldl' (acc: x: acc * 10 + x) 0 [1 2 3]
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let acc = s.intern("acc");
    let x = s.intern("x");
    let step = Expr::mk_lambda(
        acc,
        Expr::mk_lambda(
            x,
            Expr::mk_concat(vec![
                call(s, "mul", vec![Expr::mk_var(acc), Expr::mk_int(10)]),
                Expr::mk_var(x),
            ]),
        ),
    );
    let e = call(
        s,
        "foldl'",
        vec![
            step,
            Expr::mk_int(0),
            Expr::mk_list(vec![Expr::mk_int(1), Expr::mk_int(2), Expr::mk_int(3)]),
        ],
    );
    let value = run(&mut f.state, e).unwrap();
    assert_eq!(123, f.state.force_int(&value, &Pos::none()).unwrap());
}

#[test]
fn lists_test_1() {
    // filter, concatLists, tail, elemAt and elem
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let x = s.intern("x");
    let ints = |ns: &[i64]| Expr::mk_list(ns.iter().map(|n| Expr::mk_int(*n)).collect());
    let small = Expr::mk_lambda(
        x,
        call(s, "lessThan", vec![Expr::mk_var(x), Expr::mk_int(3)]),
    );
    let filtered = call(s, "filter", vec![small, ints(&[5, 1, 4, 2])]);
    let concatenated = call(
        s,
        "concatLists",
        vec![Expr::mk_list(vec![ints(&[1]), ints(&[]), ints(&[2, 3])])],
    );
    let tail = call(s, "tail", vec![ints(&[1, 2, 3])]);
    let out_of_bounds = call(s, "elemAt", vec![ints(&[1, 2]), Expr::mk_int(2)]);
    let found = call(s, "elem", vec![Expr::mk_int(2), ints(&[1, 2])]);
    let empty_head = call(s, "head", vec![ints(&[])]);

    assert_eq!(vec![1, 2], run_ints(&mut f.state, filtered).unwrap());
    assert_eq!(vec![1, 2, 3], run_ints(&mut f.state, concatenated).unwrap());
    assert_eq!(vec![2, 3], run_ints(&mut f.state, tail).unwrap());
    assert_eq!(
        "list index 2 is out of bounds",
        run(&mut f.state, out_of_bounds).unwrap_err().to_string()
    );
    let value = run(&mut f.state, found).unwrap();
    assert!(f.state.force_bool(&value, &Pos::none()).unwrap());
    assert!(run(&mut f.state, empty_head).is_err());
}

#[test]
fn type_of_test_1() {
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let x = s.intern("x");
    let values = vec![
        Expr::mk_int(1),
        var(s, "true"),
        var(s, "null"),
        Expr::mk_string("a"),
        Expr::mk_path(Path::new("/a")),
        Expr::mk_list(vec![]),
        Expr::mk_attrs(vec![]),
        Expr::mk_lambda(x, Expr::mk_var(x)),
        builtin(s, "add"),
        call(s, "add", vec![Expr::mk_int(1)]),
    ];
    let e = Expr::mk_list(
        values
            .into_iter()
            .map(|value| call(s, "typeOf", vec![value]))
            .collect(),
    );
    let value = run(&mut f.state, e).unwrap();
    assert_eq!(
        vec![
            "int", "bool", "null", "string", "path", "list", "set", "lambda", "lambda", "lambda"
        ],
        strings(&mut f.state, &value)
    );
}

#[test]
fn throw_test_1() {
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let thrown = Expr::mk_app(var(s, "throw"), Expr::mk_string("no good"));
    let aborted = Expr::mk_app(var(s, "abort"), Expr::mk_string("stop"));
    match run(&mut f.state, thrown) {
        Err(EvalError::Thrown { message, .. }) => assert_eq!("no good", message),
        result => panic!("expected a throw, got {:?}", result),
    }
    assert_eq!(
        "evaluation aborted with the following error message: 'stop'",
        run(&mut f.state, aborted).unwrap_err().to_string()
    );
}

#[test]
fn seq_test_1() {
    // seq only reaches weak head normal form, deepSeq goes all the way
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let lazy = |s: &mut SymbolTable| {
        Expr::mk_list(vec![Expr::mk_app(var(s, "throw"), Expr::mk_string("deep"))])
    };
    let list = lazy(s);
    let shallow = call(s, "seq", vec![list, Expr::mk_int(1)]);
    let list = lazy(s);
    let deep = call(s, "deepSeq", vec![list, Expr::mk_int(1)]);
    let traced = call(s, "trace", vec![Expr::mk_string("hi"), Expr::mk_int(2)]);

    let value = run(&mut f.state, shallow).unwrap();
    assert_eq!(1, f.state.force_int(&value, &Pos::none()).unwrap());
    assert_eq!("deep", run(&mut f.state, deep).unwrap_err().to_string());
    let value = run(&mut f.state, traced).unwrap();
    assert_eq!(2, f.state.force_int(&value, &Pos::none()).unwrap());
}

#[test]
fn strings_test_1() {
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let length = call(s, "stringLength", vec![Expr::mk_string("hello")]);
    let clamped = call(
        s,
        "substring",
        vec![Expr::mk_int(3), Expr::mk_int(100), Expr::mk_string("hello")],
    );
    let negative = call(
        s,
        "substring",
        vec![Expr::mk_int(-1), Expr::mk_int(1), Expr::mk_string("hello")],
    );
    let base = Expr::mk_app(var(s, "baseNameOf"), Expr::mk_string("/a/b/c.txt"));
    let dir = Expr::mk_app(var(s, "dirOf"), Expr::mk_string("/a/b/c.txt"));
    let to_string = Expr::mk_app(var(s, "toString"), Expr::mk_int(42));

    let value = run(&mut f.state, length).unwrap();
    assert_eq!(5, f.state.force_int(&value, &Pos::none()).unwrap());
    assert_eq!("lo", run_string(&mut f.state, clamped).unwrap());
    assert_eq!(
        "negative start position in 'substring'",
        run(&mut f.state, negative).unwrap_err().to_string()
    );
    assert_eq!("c.txt", run_string(&mut f.state, base).unwrap());
    assert_eq!("/a/b", run_string(&mut f.state, dir).unwrap());
    assert_eq!("42", run_string(&mut f.state, to_string).unwrap());
}

#[test]
fn dir_of_test_1() {
    // dirOf keeps paths as paths
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let e = Expr::mk_app(var(s, "dirOf"), Expr::mk_path(Path::new("/a/b")));
    let value = run(&mut f.state, e).unwrap();
    assert_eq!("path", value.value_type().type_of());
}

#[test]
fn read_dir_test_1() {
    let mut f = fixture(EvalConfig::new());
    f.write("tree/a.reel", "");
    f.write("tree/lib/b.reel", "");
    let tree = f.path("tree");
    let s = &mut f.state.symbols;
    let entries = call(s, "readDir", vec![Expr::mk_path(&tree)]);
    let names = call(s, "attrNames", vec![entries]);
    let entries = call(s, "readDir", vec![Expr::mk_path(&tree)]);
    let kinds = call(s, "attrValues", vec![entries]);

    let value = run(&mut f.state, names).unwrap();
    assert_eq!(vec!["a.reel", "lib"], strings(&mut f.state, &value));
    let value = run(&mut f.state, kinds).unwrap();
    assert_eq!(vec!["regular", "directory"], strings(&mut f.state, &value));
}

#[test]
fn current_time_test_1() {
    // forced once, the time stays the same
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let first = builtin(s, "currentTime");
    let second = builtin(s, "currentTime");
    let first = run(&mut f.state, first).unwrap();
    let second = run(&mut f.state, second).unwrap();
    let first = f.state.force_int(&first, &Pos::none()).unwrap();
    let second = f.state.force_int(&second, &Pos::none()).unwrap();
    assert!(first > 0);
    assert_eq!(first, second);
}
