#[cfg(test)]
use crate::{Diagnostic, Location, Message, Position, Source};
#[cfg(test)]
use pretty_assertions::assert_eq;
#[cfg(test)]
use std::{io::Write, path::PathBuf};

#[test]
fn test_1() {
    assert_eq!(
        Diagnostic::report_located_message(
            5,
            3,
            "test/file",
            &String::from("abcdefg"),
            &Message {
                content: String::from("some error"),
                addendum: None
            },
        ),
        [
            "test/file:5:3: error: some error",
            "  |",
            "5 | abcdefg",
            "  |   ^",
        ]
        .join("\n")
    )
}

#[test]
fn test_2() {
    assert_eq!(
        Diagnostic::report_located_message(
            10,
            2,
            "test/file",
            &String::from("abcdefg"),
            &Message {
                content: String::from("some error"),
                addendum: Some(String::from("while evaluating the file"))
            }
        ),
        [
            "test/file:10:2: error: some error",
            "   |",
            "10 | abcdefg",
            "   |  ^",
            "while evaluating the file",
        ]
        .join("\n")
    )
}

#[test]
fn render_all_test_1() {
    let mut file = tempfile_in_target();
    writeln!(file.1, "let").unwrap();
    writeln!(file.1, "  x = y;").unwrap();
    writeln!(file.1, "in x").unwrap();

    let mut diagnostic = Diagnostic::new();
    diagnostic.item(
        None,
        Message {
            content: String::from("evaluation aborted"),
            addendum: None,
        },
    );
    diagnostic.item(
        Some(Location {
            source: Source::File {
                path: file.0.clone(),
            },
            position: Some(Position { line: 2, column: 7 }),
        }),
        Message {
            content: String::from("undefined variable 'y'"),
            addendum: None,
        },
    );
    let path = file.0.to_str().unwrap().to_string();
    let expected = vec![
        String::from("error: evaluation aborted"),
        [
            format!("{}:2:7: error: undefined variable 'y'", path),
            String::from("  |"),
            String::from("2 |   x = y;"),
            String::from("  |       ^"),
        ]
        .join("\n"),
    ];
    let actual = diagnostic.render_all().unwrap();
    std::fs::remove_file(&file.0).unwrap();
    assert_eq!(expected, actual)
}

#[test]
fn render_all_test_2() {
    let mut diagnostic = Diagnostic::new();
    diagnostic.item(
        Some(Location {
            source: Source::Interactive {
                label: String::from("(repl)"),
            },
            position: None,
        }),
        Message {
            content: String::from("infinite recursion encountered"),
            addendum: None,
        },
    );
    let expected = vec![String::from(
        "(repl): error: infinite recursion encountered",
    )];
    let actual = diagnostic.render_all().unwrap();
    assert_eq!(expected, actual)
}

#[cfg(test)]
fn tempfile_in_target() -> (PathBuf, std::fs::File) {
    let path = std::env::temp_dir().join(format!(
        "reel-diagnostic-{}-{:?}.reel",
        std::process::id(),
        std::thread::current().id()
    ));
    let file = std::fs::File::create(&path).unwrap();
    (path, file)
}
