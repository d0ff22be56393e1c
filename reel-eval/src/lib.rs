#![deny(unused_crate_dependencies)]


mod apply;
mod coerce;
pub mod config;
pub mod env;
pub mod error;
mod eval;
pub mod fetch;
mod force;
pub mod primops;
mod render;
pub mod replay;
pub mod search_path;
pub mod stats;
pub mod value;

pub use config::{EvalConfig, EvalMode};
pub use env::Env;
pub use error::{EvalError, EvalResult};
pub use eval::{EvalState, ParseError, Parser, BASE_ENV_SIZE};
pub use fetch::{Fetcher, HttpFetcher};
pub use replay::{Recording, RecordingEntry, RecordedValue};
pub use search_path::{SearchPath, SearchPathEntry};
pub use stats::EvalStats;
pub use value::{Attr, Bindings, PrimOp, Repr, Value, ValueType};
