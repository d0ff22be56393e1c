use crate::value::ValueType;
use reel_diagnostic::{Diagnostic, Location, Message, Position, Source};
use reel_store::StoreError;
use reel_syntax::Pos;
use std::{io, path::PathBuf};

pub type EvalResult<T> = Result<T, EvalError>;

fn call_args(args: &[String]) -> String {
    args.iter().map(|arg| format!("{}, ", arg)).collect()
}

fn quoted_names(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("'{}'", name))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(thiserror::Error, Debug)]
pub enum EvalError {
    #[error("value is {actual} while {expected} was expected")]
    TypeMismatch {
        expected: ValueType,
        actual: ValueType,
        pos: Pos,
    },
    #[error("undefined variable '{name}'")]
    UndefinedVariable { name: String, pos: Pos },
    #[error("function called without required argument '{name}'")]
    MissingArgument { name: String, pos: Pos },
    #[error("cannot auto-call a function that has required arguments {}", quoted_names(.names))]
    MissingArguments { names: Vec<String>, pos: Pos },
    #[error("function called with unexpected argument '{name}'")]
    UnexpectedArgument { name: String, pos: Pos },
    #[error("attribute '{name}' missing")]
    MissingAttribute { name: String, pos: Pos },
    #[error("infinite recursion encountered")]
    InfiniteRecursion { pos: Pos },
    #[error("{reason}: '{path}'")]
    InvalidPath {
        path: String,
        reason: &'static str,
        pos: Pos,
    },
    #[error("{what} is forbidden in restricted mode")]
    Restricted { what: String, pos: Pos },
    #[error("primop '{name}' is not supported in record/playback mode")]
    UnsupportedInReplayMode { name: String, pos: Pos },
    #[error("wanted to call {name}({})", call_args(.args))]
    PlaybackMiss {
        name: String,
        args: Vec<String>,
        pos: Pos,
    },
    #[error("cannot use {actual} in a recording")]
    Unrenderable { actual: ValueType, pos: Pos },
    #[error("assertion failed")]
    AssertionFailed { pos: Pos },
    #[error("{message}")]
    Thrown { message: String, pos: Pos },
    #[error("evaluation aborted with the following error message: '{message}'")]
    Aborted { message: String, pos: Pos },
    #[error("{message}")]
    Generic { message: String, pos: Pos },
    #[error("file '{path}' was not found in the search path")]
    NotFound { path: String, pos: Pos },
    #[error("cannot access '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{message}")]
    Parse { message: String, pos: Pos },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unable to download '{url}': {message}")]
    Fetch {
        url: String,
        message: String,
        pos: Pos,
    },
    #[error("malformed recording: {message}")]
    BadRecording { message: String },
}

impl EvalError {
    pub fn generic(message: impl Into<String>, pos: &Pos) -> Self {
        EvalError::Generic {
            message: message.into(),
            pos: pos.clone(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        EvalError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn pos(&self) -> Option<&Pos> {
        match self {
            EvalError::TypeMismatch { pos, .. }
            | EvalError::UndefinedVariable { pos, .. }
            | EvalError::MissingArgument { pos, .. }
            | EvalError::MissingArguments { pos, .. }
            | EvalError::UnexpectedArgument { pos, .. }
            | EvalError::MissingAttribute { pos, .. }
            | EvalError::InfiniteRecursion { pos }
            | EvalError::InvalidPath { pos, .. }
            | EvalError::Restricted { pos, .. }
            | EvalError::UnsupportedInReplayMode { pos, .. }
            | EvalError::PlaybackMiss { pos, .. }
            | EvalError::Unrenderable { pos, .. }
            | EvalError::AssertionFailed { pos }
            | EvalError::Thrown { pos, .. }
            | EvalError::Aborted { pos, .. }
            | EvalError::Generic { pos, .. }
            | EvalError::NotFound { pos, .. }
            | EvalError::Parse { pos, .. }
            | EvalError::Fetch { pos, .. } => Some(pos).filter(|pos| !pos.is_none()),
            EvalError::Io { .. } | EvalError::Store(_) | EvalError::BadRecording { .. } => None,
        }
    }

    pub fn report(&self, diagnostic: &mut Diagnostic) {
        let location = self.pos().and_then(|pos| {
            pos.file.as_ref().map(|file| Location {
                source: Source::File {
                    path: PathBuf::from(file.as_ref()),
                },
                position: Some(Position {
                    line: pos.line as usize,
                    column: pos.column as usize,
                }),
            })
        });
        diagnostic.item(
            location,
            Message {
                content: self.to_string(),
                addendum: None,
            },
        )
    }
}
