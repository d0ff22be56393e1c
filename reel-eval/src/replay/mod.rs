#[cfg(test)]
mod test;

use crate::{
    config::EvalMode,
    error::{EvalError, EvalResult},
    value::{Attr, Bindings, PrimOpFn, Repr, Value, ValueType},
    EvalState,
};
use reel_store::{PathSet, StorePath};
use reel_syntax::Pos;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    rc::Rc,
};
use tracing::{debug, trace};

/// The arguments of an impure built-in that identify a call.
#[derive(Debug, Clone, Copy)]
pub enum KeyArgs {
    All,
    /// Positions of the arguments to use. The others (for example a
    /// destination chosen by the caller) don't influence the result.
    Only(&'static [usize]),
}

impl KeyArgs {
    fn selects(self, ix: usize) -> bool {
        match self {
            KeyArgs::All => true,
            KeyArgs::Only(positions) => positions.contains(&ix),
        }
    }
}

/// A built-in whose result depends on the world outside the evaluator.
pub struct ImpurePrimOp {
    pub name: &'static str,
    pub arity: usize,
    pub key_args: KeyArgs,
    pub fun: PrimOpFn,
}

/// Identifies a call to an impure built-in: its name and the canonical text of
/// its key arguments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordingKey {
    pub name: String,
    pub args: Vec<String>,
}

/**
Choose how an impure built-in behaves under `mode`. The choice is made once,
when the built-in is installed.

* `Normal`: the built-in runs.
* `Record`: the built-in runs and its result is recorded.
* `Playback`: the result comes from the recording; the built-in never runs.
* `RecordAndPlayback`: like `Playback`, but a call that isn't in the recording
  runs and is recorded.
*/
pub fn replay_wrapper(mode: EvalMode, op: ImpurePrimOp) -> PrimOpFn {
    let ImpurePrimOp {
        name,
        key_args,
        fun,
        ..
    } = op;
    match mode {
        EvalMode::Normal => fun,
        EvalMode::Record => Rc::new(move |state, args, pos| {
            let key = state.recording_key(name, key_args, args)?;
            let result = fun(state, args, pos)?;
            state.record(key, &result)?;
            Ok(result)
        }),
        EvalMode::Playback => Rc::new(move |state, args, pos| {
            let key = state.recording_key(name, key_args, args)?;
            state.playback(key, pos)
        }),
        EvalMode::RecordAndPlayback => Rc::new(move |state, args, pos| {
            let key = state.recording_key(name, key_args, args)?;
            if let Some(value) = state.recording.get(&key) {
                trace!(op = name, args = ?key.args, "playback hit");
                return Ok(value.clone());
            }
            debug!(op = name, args = ?key.args, "playback miss, recording");
            let result = fun(state, args, pos)?;
            state.record(key, &result)?;
            Ok(result)
        }),
    }
}

/// Built-ins without a deterministic meaning fail whenever a recording is
/// written or read.
pub fn unsupported_in_replay(mode: EvalMode, name: &'static str, fun: PrimOpFn) -> PrimOpFn {
    if mode.is_deterministic() {
        Rc::new(move |_, _, pos| {
            Err(EvalError::UnsupportedInReplayMode {
                name: String::from(name),
                pos: pos.clone(),
            })
        })
    } else {
        fun
    }
}

/// A persisted recording.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    pub entries: Vec<RecordingEntry>,
    /// Source path in the recorded run → the store path it was copied to.
    #[serde(default)]
    pub sources: BTreeMap<String, String>,
    /// The canonical text of the recorded run's result.
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingEntry {
    pub name: String,
    pub args: Vec<String>,
    pub value: RecordedValue,
}

/// A fully evaluated value, independent of any evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RecordedValue {
    Int {
        value: i64,
    },
    Bool {
        value: bool,
    },
    Null,
    String {
        value: String,
        #[serde(default, skip_serializing_if = "PathSet::is_empty")]
        context: PathSet,
    },
    Path {
        value: String,
    },
    List {
        items: Vec<RecordedValue>,
    },
    Attrs {
        attrs: BTreeMap<String, RecordedValue>,
    },
}

impl RecordedValue {
    fn collect_context(&self, into: &mut PathSet) {
        match self {
            RecordedValue::String { context, .. } => into.extend(context.iter().cloned()),
            RecordedValue::List { items } => {
                for item in items {
                    item.collect_context(into)
                }
            }
            RecordedValue::Attrs { attrs } => {
                for value in attrs.values() {
                    value.collect_context(into)
                }
            }
            RecordedValue::Int { .. }
            | RecordedValue::Bool { .. }
            | RecordedValue::Null
            | RecordedValue::Path { .. } => {}
        }
    }
}

impl Recording {
    /// The store paths a playback of this recording can hand back: the copied
    /// sources and the context of every recorded string.
    pub fn references(&self) -> PathSet {
        let mut references: PathSet = self.sources.values().cloned().collect();
        for entry in self.entries.iter() {
            entry.value.collect_context(&mut references);
        }
        references
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> EvalResult<Self> {
        serde_json::from_str(json).map_err(|err| EvalError::BadRecording {
            message: err.to_string(),
        })
    }
}

impl EvalState {
    fn recording_key(
        &mut self,
        name: &str,
        key_args: KeyArgs,
        args: &[Value],
    ) -> EvalResult<RecordingKey> {
        let mut rendered = Vec::new();
        for (ix, arg) in args.iter().enumerate() {
            if key_args.selects(ix) {
                rendered.push(self.parameter_value(arg)?);
            }
        }
        Ok(RecordingKey {
            name: String::from(name),
            args: rendered,
        })
    }

    /// Later calls with the same key replace earlier ones.
    fn record(&mut self, key: RecordingKey, result: &Value) -> EvalResult<()> {
        self.force_value_deep(result)?;
        trace!(name = %key.name, args = ?key.args, "recording call");
        self.recording.insert(key, result.clone());
        Ok(())
    }

    fn playback(&mut self, key: RecordingKey, pos: &Pos) -> EvalResult<Value> {
        match self.recording.get(&key) {
            Some(value) => {
                trace!(name = %key.name, args = ?key.args, "playback hit");
                Ok(value.clone())
            }
            None => {
                debug!(name = %key.name, args = ?key.args, "playback miss");
                Err(EvalError::PlaybackMiss {
                    name: key.name,
                    args: key.args,
                    pos: pos.clone(),
                })
            }
        }
    }

    /// Number of calls in the recording table.
    pub fn recorded_calls(&self) -> usize {
        self.recording.len()
    }

    fn recorded_value(&mut self, value: &Value) -> EvalResult<RecordedValue> {
        self.force_value(value, &Pos::none())?;
        match value.get() {
            Repr::Int(value) => Ok(RecordedValue::Int { value }),
            Repr::Bool(value) => Ok(RecordedValue::Bool { value }),
            Repr::Null => Ok(RecordedValue::Null),
            Repr::String(s) => Ok(RecordedValue::String {
                value: String::from(s.text.as_ref()),
                context: s.context.clone(),
            }),
            Repr::Path(path) => Ok(RecordedValue::Path {
                value: self.unsubstitute_path(&path).to_string_lossy().into_owned(),
            }),
            Repr::List(items) => {
                let items = items
                    .iter()
                    .map(|item| self.recorded_value(item))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(RecordedValue::List { items })
            }
            Repr::Attrs(attrs) => {
                let mut recorded = BTreeMap::new();
                for attr in attrs.iter() {
                    let name = String::from(self.symbols.name(attr.name));
                    recorded.insert(name, self.recorded_value(&attr.value)?);
                }
                Ok(RecordedValue::Attrs { attrs: recorded })
            }
            _ => Err(EvalError::Unrenderable {
                actual: value.value_type(),
                pos: Pos::none(),
            }),
        }
    }

    fn restored_value(&mut self, recorded: &RecordedValue) -> Value {
        match recorded {
            RecordedValue::Int { value } => Value::mk_int(*value),
            RecordedValue::Bool { value } => Value::mk_bool(*value),
            RecordedValue::Null => Value::mk_null(),
            RecordedValue::String { value, context } => {
                Value::mk_string_with_context(value, context.clone())
            }
            RecordedValue::Path { value } => Value::mk_path(&self.substitute_path(Path::new(value))),
            RecordedValue::List { items } => {
                let items = items.iter().map(|item| self.restored_value(item)).collect();
                Value::mk_list(items)
            }
            RecordedValue::Attrs { attrs } => {
                let attrs = attrs
                    .iter()
                    .map(|(name, value)| Attr {
                        name: self.symbols.intern(name),
                        value: self.restored_value(value),
                        pos: Pos::none(),
                    })
                    .collect();
                Value::mk_attrs(Bindings::from_attrs(attrs))
            }
        }
    }

    /**
    Package the calls made so far, the sources copied to the store and the
    canonical text of `result` so that a later run can play them back.
    */
    pub fn finalize_recording(&mut self, result: &Value) -> EvalResult<Recording> {
        let rendered = self.parameter_value(result)?;
        let calls: Vec<(RecordingKey, Value)> = self
            .recording
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let mut entries = Vec::with_capacity(calls.len());
        for (key, value) in calls {
            entries.push(RecordingEntry {
                name: key.name,
                args: key.args,
                value: self.recorded_value(&value)?,
            });
        }
        let sources = self
            .src_to_store
            .iter()
            .map(|(path, store_path)| {
                (
                    self.unsubstitute_path(path).to_string_lossy().into_owned(),
                    store_path.to_string(),
                )
            })
            .collect();
        debug!(calls = entries.len(), "finalized recording");
        Ok(Recording {
            entries,
            sources,
            result: Some(rendered),
        })
    }

    /// Write the recording for `result` into the store as `recording.json`.
    pub fn write_recording_into_store(&mut self, result: &Value) -> EvalResult<StorePath> {
        let recording = self.finalize_recording(result)?;
        let json = recording.to_json().map_err(|err| EvalError::BadRecording {
            message: err.to_string(),
        })?;
        let references = recording.references();
        let store_path = self
            .store
            .add_text_to_store("recording.json", json.as_bytes(), &references)?;
        debug!(store_path = %store_path, "wrote recording into the store");
        Ok(store_path)
    }

    /// Use `recording` to answer impure calls, and its sources to answer copies.
    pub fn load_recording(&mut self, recording: &Recording) {
        for entry in recording.entries.iter() {
            let value = self.restored_value(&entry.value);
            self.recording.insert(
                RecordingKey {
                    name: entry.name.clone(),
                    args: entry.args.clone(),
                },
                value,
            );
        }
        for (from, to) in recording.sources.iter() {
            self.add_playback_source(Path::new(from), StorePath::new(PathBuf::from(to)));
        }
        debug!(calls = recording.entries.len(), "loaded recording");
    }

    /**
    Install path substitutions from an attribute set that maps each path of the
    recorded run to a local copy of the same content.
    */
    pub fn add_playback_substitutions(&mut self, top: &Value) -> EvalResult<()> {
        let pos = Pos::none();
        let attrs = self.force_attrs(top, &pos)?;
        for attr in attrs.iter() {
            let from = PathBuf::from(self.symbols.name(attr.name));
            self.force_value(&attr.value, &attr.pos)?;
            let to = match attr.value.get() {
                Repr::Path(path) => path.to_path_buf(),
                Repr::String(s) => PathBuf::from(s.text.as_ref()),
                _ => {
                    return Err(EvalError::TypeMismatch {
                        expected: ValueType::Path,
                        actual: attr.value.value_type(),
                        pos: attr.pos.clone(),
                    })
                }
            };
            debug!(from = %from.display(), to = %to.display(), "adding playback substitution");
            self.playback_substitutions.push((from, to));
        }
        Ok(())
    }

    /// During playback, copying `from` answers `to` without hashing anything.
    pub fn add_playback_source(&mut self, from: &Path, to: StorePath) {
        self.src_to_store_for_playback.insert(from.to_path_buf(), to);
    }

    pub(crate) fn playback_source(&self, path: &Path) -> Option<StorePath> {
        if !self.config.mode.is_in_playback_mode() {
            return None;
        }
        let recorded = self.unsubstitute_path(path);
        self.src_to_store_for_playback.get(&recorded).cloned()
    }

    /// Map a path of the recorded run to its local copy.
    pub fn substitute_path(&self, path: &Path) -> PathBuf {
        self.rewrite_prefix(path, false)
    }

    /// Map a local copy back to the path it had in the recorded run.
    pub fn unsubstitute_path(&self, path: &Path) -> PathBuf {
        self.rewrite_prefix(path, true)
    }

    fn rewrite_prefix(&self, path: &Path, reverse: bool) -> PathBuf {
        if !self.config.mode.is_in_playback_mode() {
            return path.to_path_buf();
        }
        for (recorded, local) in self.playback_substitutions.iter() {
            let (from, to) = if reverse {
                (local, recorded)
            } else {
                (recorded, local)
            };
            if let Ok(rest) = path.strip_prefix(from) {
                return if rest.as_os_str().is_empty() {
                    to.clone()
                } else {
                    to.join(rest)
                };
            }
        }
        path.to_path_buf()
    }
}
