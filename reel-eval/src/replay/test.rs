#[cfg(test)]
use super::{RecordedValue, Recording, RecordingEntry};
#[cfg(test)]
use crate::{
    test::{builtin, fixture, run, run_string},
    Attr, Bindings, EvalConfig, EvalError, EvalMode, Fetcher, Value,
};
#[cfg(test)]
use pretty_assertions::assert_eq;
#[cfg(test)]
use quickcheck_macros::quickcheck;
#[cfg(test)]
use reel_store::{PathSet, Store};
#[cfg(test)]
use reel_syntax::{Expr, Pos};
#[cfg(test)]
use std::{
    cell::Cell,
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

#[cfg(test)]
fn config(mode: EvalMode) -> EvalConfig {
    EvalConfig::new().mode(mode)
}

/// Serves a fixed body and counts the downloads.
#[cfg(test)]
struct FakeFetcher {
    body: &'static str,
    calls: Rc<Cell<usize>>,
}

#[cfg(test)]
impl Fetcher for FakeFetcher {
    fn fetch(&self, _: &str) -> Result<Vec<u8>, String> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.body.as_bytes().to_vec())
    }
}

#[cfg(test)]
fn fake_fetcher(body: &'static str) -> (Rc<FakeFetcher>, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    let fetcher = Rc::new(FakeFetcher {
        body,
        calls: calls.clone(),
    });
    (fetcher, calls)
}

#[cfg(test)]
fn string_entry(name: &str, args: &[&str], value: &str) -> RecordingEntry {
    RecordingEntry {
        name: String::from(name),
        args: args.iter().map(|arg| String::from(*arg)).collect(),
        value: RecordedValue::String {
            value: String::from(value),
            context: PathSet::new(),
        },
    }
}

#[test]
fn record_playback_test_1() {
    // builtins.readFile ./greeting.txt, recorded and then played back without the file
    let mut recorder = fixture(config(EvalMode::Record));
    let file = recorder.write("greeting.txt", "hello");
    let s = &mut recorder.state.symbols;
    let e = Expr::mk_app(builtin(s, "readFile"), Expr::mk_path(&file));
    let result = run(&mut recorder.state, e).unwrap();
    assert_eq!(1, recorder.state.recorded_calls());

    let recording = recorder.state.finalize_recording(&result).unwrap();
    assert_eq!(Some(String::from("\"hello\"")), recording.result);
    assert_eq!(
        vec![string_entry(
            "readFile",
            &[format!("path:\"{}\"", file.display()).as_str()],
            "hello"
        )],
        recording.entries
    );
    fs::remove_file(&file).unwrap();

    let mut player = fixture(config(EvalMode::Playback));
    player.state.load_recording(&recording);
    let s = &mut player.state.symbols;
    let e = Expr::mk_app(builtin(s, "readFile"), Expr::mk_path(&file));
    let replayed = run(&mut player.state, e).unwrap();
    assert_eq!(
        recording.result,
        Some(player.state.parameter_value(&replayed).unwrap())
    );
    assert!(!file.exists());
}

#[test]
fn record_playback_test_2() {
    // fetchurl is answered from the recording without downloading
    let url = "https://example.com/dist/data.txt";
    let (fetcher, calls) = fake_fetcher("payload");
    let mut recorder = fixture(config(EvalMode::Record));
    recorder.state.set_fetcher(fetcher);
    let s = &mut recorder.state.symbols;
    let e = Expr::mk_app(builtin(s, "fetchurl"), Expr::mk_string(url));
    let recorded = run_string(&mut recorder.state, e).unwrap();
    assert_eq!(1, calls.get());
    assert!(recorded.ends_with("-data.txt"));
    assert_eq!("payload", fs::read_to_string(&recorded).unwrap());
    let recording = recorder.state.finalize_recording(&Value::mk_null()).unwrap();

    let (fetcher, calls) = fake_fetcher("something else");
    let mut player = fixture(config(EvalMode::Playback));
    player.state.set_fetcher(fetcher);
    player.state.load_recording(&recording);
    let s = &mut player.state.symbols;
    let e = Expr::mk_app(builtin(s, "fetchurl"), Expr::mk_string(url));
    let value = run(&mut player.state, e).unwrap();
    let mut context = PathSet::new();
    let replayed = player
        .state
        .force_string(&value, &mut context, &Pos::none())
        .unwrap();

    assert_eq!(0, calls.get());
    assert_eq!(recorded.as_str(), replayed.as_ref());
    assert_eq!(PathSet::from([recorded]), context);
}

#[test]
fn playback_miss_test_1() {
    let mut f = fixture(config(EvalMode::Playback));
    let s = &mut f.state.symbols;
    let e = Expr::mk_app(builtin(s, "getEnv"), Expr::mk_string("HOME"));
    match run(&mut f.state, e) {
        Err(err @ EvalError::PlaybackMiss { .. }) => {
            assert_eq!("wanted to call getEnv(\"HOME\", )", err.to_string())
        }
        result => panic!("expected a playback miss, got {:?}", result),
    }
}

#[test]
fn unsupported_test_1() {
    for mode in [
        EvalMode::Record,
        EvalMode::Playback,
        EvalMode::RecordAndPlayback,
    ] {
        let mut f = fixture(config(mode));
        let s = &mut f.state.symbols;
        let e = Expr::mk_app(
            builtin(s, "exec"),
            Expr::mk_list(vec![Expr::mk_string("echo"), Expr::mk_string("hi")]),
        );
        match run(&mut f.state, e) {
            Err(err @ EvalError::UnsupportedInReplayMode { .. }) => assert_eq!(
                "primop 'exec' is not supported in record/playback mode",
                err.to_string()
            ),
            result => panic!("expected an unsupported primop, got {:?}", result),
        }
    }
}

#[test]
fn record_and_playback_test_1() {
    let recording = Recording {
        entries: vec![string_entry(
            "getEnv",
            &["\"REEL_TEST_RECORDED\""],
            "from the recording",
        )],
        ..Recording::default()
    };
    let mut f = fixture(config(EvalMode::RecordAndPlayback));
    f.state.load_recording(&recording);
    let s = &mut f.state.symbols;
    let hit = Expr::mk_app(builtin(s, "getEnv"), Expr::mk_string("REEL_TEST_RECORDED"));
    let miss = Expr::mk_app(
        builtin(s, "getEnv"),
        Expr::mk_string("REEL_TEST_NOT_RECORDED_OR_SET"),
    );

    assert_eq!("from the recording", run_string(&mut f.state, hit).unwrap());
    assert_eq!(1, f.state.recorded_calls());
    assert_eq!("", run_string(&mut f.state, miss).unwrap());
    assert_eq!(2, f.state.recorded_calls());

    let result = f.state.finalize_recording(&Value::mk_int(0)).unwrap();
    let names: Vec<&str> = result
        .entries
        .iter()
        .flat_map(|entry| entry.args.iter().map(String::as_str))
        .collect();
    assert_eq!(
        vec!["\"REEL_TEST_NOT_RECORDED_OR_SET\"", "\"REEL_TEST_RECORDED\""],
        names
    );
}

#[test]
fn current_time_test_1() {
    // a built-in without arguments is keyed by its name alone
    let recording = Recording {
        entries: vec![RecordingEntry {
            name: String::from("currentTime"),
            args: Vec::new(),
            value: RecordedValue::Int { value: 1_700_000_000 },
        }],
        ..Recording::default()
    };
    let mut f = fixture(config(EvalMode::Playback));
    f.state.load_recording(&recording);
    let s = &mut f.state.symbols;
    let e = builtin(s, "currentTime");
    let value = run(&mut f.state, e).unwrap();
    assert_eq!(1_700_000_000, f.state.force_int(&value, &Pos::none()).unwrap());
}

#[test]
fn substitution_test_1() {
    let recording = Recording {
        entries: vec![RecordingEntry {
            name: String::from("pathExists"),
            args: vec![String::from("path:\"/recorded/src/a.txt\"")],
            value: RecordedValue::Bool { value: true },
        }],
        ..Recording::default()
    };
    let mut f = fixture(config(EvalMode::Playback));
    let local = f.path("checkout");
    let name = f.state.symbols.intern("/recorded/src");
    let substitutions = Value::mk_attrs(Bindings::from_attrs(vec![Attr {
        name,
        value: Value::mk_path(&local),
        pos: Pos::none(),
    }]));
    f.state.add_playback_substitutions(&substitutions).unwrap();
    f.state.load_recording(&recording);

    assert_eq!(
        local.join("a.txt"),
        f.state.substitute_path(Path::new("/recorded/src/a.txt"))
    );
    assert_eq!(
        PathBuf::from("/recorded/src/a.txt"),
        f.state.unsubstitute_path(&local.join("a.txt"))
    );
    assert_eq!(
        PathBuf::from("/elsewhere/a.txt"),
        f.state.substitute_path(Path::new("/elsewhere/a.txt"))
    );

    // the local copy doesn't exist, the answer comes from the recording
    let s = &mut f.state.symbols;
    let e = Expr::mk_app(builtin(s, "pathExists"), Expr::mk_path(&local.join("a.txt")));
    let value = run(&mut f.state, e).unwrap();
    assert!(f.state.force_bool(&value, &Pos::none()).unwrap());
}

#[test]
fn substitution_test_2() {
    // outside of playback, paths are left alone
    let mut f = fixture(config(EvalMode::Record));
    let name = f.state.symbols.intern("/recorded");
    let substitutions = Value::mk_attrs(Bindings::from_attrs(vec![Attr {
        name,
        value: Value::mk_string("/local"),
        pos: Pos::none(),
    }]));
    f.state.add_playback_substitutions(&substitutions).unwrap();
    assert_eq!(
        PathBuf::from("/recorded/a"),
        f.state.substitute_path(Path::new("/recorded/a"))
    );
}

#[test]
fn recording_store_test_1() {
    // "${./data.txt}" copies a source; the recording remembers where it went
    let mut recorder = fixture(config(EvalMode::Record));
    let file = recorder.write("data.txt", "payload");
    let copied = run_string(
        &mut recorder.state,
        Expr::mk_interpolation(vec![Expr::mk_path(&file)]),
    )
    .unwrap();

    let store_path = recorder
        .state
        .write_recording_into_store(&Value::mk_string("done"))
        .unwrap();
    assert!(store_path.to_string().ends_with("-recording.json"));
    let json = fs::read_to_string(store_path.as_path()).unwrap();
    let recording = Recording::from_json(&json).unwrap();
    assert_eq!(
        BTreeMap::from([(file.display().to_string(), copied.clone())]),
        recording.sources
    );
    assert_eq!(Some(String::from("\"done\"")), recording.result);
    fs::remove_file(&file).unwrap();

    let mut player = fixture(config(EvalMode::Playback));
    player.state.load_recording(&recording);
    let replayed = run_string(
        &mut player.state,
        Expr::mk_interpolation(vec![Expr::mk_path(&file)]),
    )
    .unwrap();
    assert_eq!(copied, replayed);
}

#[test]
fn recording_store_test_2() {
    // the stored recording references what a recorded fetchurl returned
    let url = "https://example.com/dist/data.txt";
    let (fetcher, _) = fake_fetcher("payload");
    let mut recorder = fixture(config(EvalMode::Record));
    recorder.state.set_fetcher(fetcher);
    let s = &mut recorder.state.symbols;
    let e = Expr::mk_app(builtin(s, "fetchurl"), Expr::mk_string(url));
    let fetched = run_string(&mut recorder.state, e).unwrap();

    let result = Value::mk_string("done");
    let recording = recorder.state.finalize_recording(&result).unwrap();
    assert_eq!(PathSet::from([fetched]), recording.references());

    let store_path = recorder.state.write_recording_into_store(&result).unwrap();
    let json = recording.to_json().unwrap();
    let store = recorder.state.store.clone();
    let referencing = store
        .add_text_to_store("recording.json", json.as_bytes(), &recording.references())
        .unwrap();
    let unreferencing = store
        .add_text_to_store("recording.json", json.as_bytes(), &PathSet::new())
        .unwrap();
    assert_eq!(referencing, store_path);
    assert!(unreferencing != store_path);
}

#[test]
fn recording_json_test_1() {
    let recording = Recording {
        entries: vec![RecordingEntry {
            name: String::from("readDir"),
            args: vec![String::from("path:\"/src\"")],
            value: RecordedValue::Attrs {
                attrs: BTreeMap::from([
                    (
                        String::from("a.reel"),
                        RecordedValue::String {
                            value: String::from("regular"),
                            context: PathSet::new(),
                        },
                    ),
                    (
                        String::from("lib"),
                        RecordedValue::String {
                            value: String::from("directory"),
                            context: PathSet::new(),
                        },
                    ),
                ]),
            },
        }],
        sources: BTreeMap::new(),
        result: None,
    };
    let json = recording.to_json().unwrap();
    assert_eq!(recording, Recording::from_json(&json).unwrap());
    assert_eq!(
        r#"{"type":"string","value":"regular"}"#,
        serde_json::to_string(&RecordedValue::String {
            value: String::from("regular"),
            context: PathSet::new(),
        })
        .unwrap()
    );
}

#[test]
fn recording_json_test_2() {
    match Recording::from_json("{\"entries\": 3}") {
        Err(err @ EvalError::BadRecording { .. }) => {
            assert!(err.to_string().starts_with("malformed recording: "))
        }
        result => panic!("expected a malformed recording, got {:?}", result),
    }
}

#[test]
fn parameter_value_test_1() {
    // { b = 1; a = [ true null "x\"y" ]; c = /src/a; }
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let a = s.intern("a");
    let b = s.intern("b");
    let c = s.intern("c");
    let e = Expr::mk_attrs(vec![
        (b, Expr::mk_int(1)),
        (
            a,
            Expr::mk_list(vec![
                Expr::mk_var(s.intern("true")),
                Expr::mk_var(s.intern("null")),
                Expr::mk_string("x\"y"),
            ]),
        ),
        (c, Expr::mk_path(Path::new("/src/a"))),
    ]);
    let value = run(&mut f.state, e).unwrap();
    assert_eq!(
        r#"{"a":[true,null,"x\"y"],"b":1,"c":path:"/src/a"}"#,
        f.state.parameter_value(&value).unwrap()
    );
}

#[test]
fn parameter_value_test_2() {
    // derivations render as their output path, functions don't render
    let mut f = fixture(EvalConfig::new());
    let s = &mut f.state.symbols;
    let type_ = s.intern("type");
    let out_path = s.intern("outPath");
    let name = s.intern("name");
    let x = s.intern("x");
    let drv = Expr::mk_attrs(vec![
        (type_, Expr::mk_string("derivation")),
        (out_path, Expr::mk_string("/store/abc-hello")),
        (name, Expr::mk_string("hello")),
    ]);
    let value = run(&mut f.state, drv).unwrap();
    assert_eq!(
        "\"/store/abc-hello\"",
        f.state.parameter_value(&value).unwrap()
    );

    let fun = run(&mut f.state, Expr::mk_lambda(x, Expr::mk_var(x))).unwrap();
    match f.state.parameter_value(&fun) {
        Err(err @ EvalError::Unrenderable { .. }) => {
            assert_eq!("cannot use a function in a recording", err.to_string())
        }
        result => panic!("expected an unrenderable value, got {:?}", result),
    }
}

#[quickcheck]
fn prop_parameter_value_ignores_interning_order(names: Vec<String>) -> bool {
    // the same set, built by two evaluators that interned its names in opposite orders
    let mut names: Vec<String> = names.into_iter().filter(|name| !name.is_empty()).collect();
    names.sort();
    names.dedup();

    let render = |order: &[String]| {
        let mut f = fixture(EvalConfig::new());
        for name in order.iter() {
            f.state.symbols.intern(name);
        }
        let attrs = names
            .iter()
            .enumerate()
            .map(|(ix, name)| Attr {
                name: f.state.symbols.intern(name),
                value: Value::mk_int(ix as i64),
                pos: Pos::none(),
            })
            .collect();
        let value = Value::mk_attrs(Bindings::from_attrs(attrs));
        f.state.parameter_value(&value).unwrap()
    };

    let mut reversed = names.clone();
    reversed.reverse();
    render(&names) == render(&reversed)
}
