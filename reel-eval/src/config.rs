use serde::Deserialize;
use std::{env, fmt, str::FromStr};

/// How impure built-ins behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvalMode {
    /// Impure built-ins run for real.
    #[default]
    Normal,
    /// Impure built-ins run for real and their results are recorded.
    Record,
    /// Impure built-ins answer from a recording and never run.
    Playback,
    /// Like `Playback`, but calls missing from the recording run and get recorded.
    RecordAndPlayback,
}

impl EvalMode {
    pub fn is_in_playback_mode(self) -> bool {
        matches!(self, EvalMode::Playback | EvalMode::RecordAndPlayback)
    }

    pub fn is_deterministic(self) -> bool {
        self != EvalMode::Normal
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError(String);

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown evaluation mode '{}' (expected normal, record, playback or record-and-playback)",
            self.0
        )
    }
}

impl std::error::Error for ParseModeError {}

impl FromStr for EvalMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(EvalMode::Normal),
            "record" => Ok(EvalMode::Record),
            "playback" => Ok(EvalMode::Playback),
            "record-and-playback" => Ok(EvalMode::RecordAndPlayback),
            _ => Err(ParseModeError(String::from(s))),
        }
    }
}

impl fmt::Display for EvalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EvalMode::Normal => "normal",
            EvalMode::Record => "record",
            EvalMode::Playback => "playback",
            EvalMode::RecordAndPlayback => "record-and-playback",
        })
    }
}

/// Evaluator settings. The mode is fixed once an `EvalState` is built from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EvalConfig {
    /// Entries of the form `prefix=path` or `path`.
    pub search_path: Vec<String>,
    pub restricted: bool,
    pub mode: EvalMode,
    /// Re-copy sources into the store even when they are already there.
    pub repair: bool,
    pub count_calls: bool,
    pub show_stats: bool,
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
}

impl EvalConfig {
    pub fn new() -> Self {
        EvalConfig::default()
    }

    /**
    Settings from the process environment:

    * `REEL_PATH`: colon-separated search path entries
    * `REEL_MODE`: `normal`, `record`, `playback` or `record-and-playback`
    * `REEL_RESTRICTED`, `REEL_COUNT_CALLS`, `REEL_SHOW_STATS`: `1`, `true` or `yes` to enable
    */
    pub fn from_env() -> Result<Self, ParseModeError> {
        let mut config = EvalConfig::default();
        if let Ok(path) = env::var("REEL_PATH") {
            config.search_path = path
                .split(':')
                .filter(|entry| !entry.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(mode) = env::var("REEL_MODE") {
            config.mode = mode.parse()?;
        }
        if let Some(restricted) = env_flag("REEL_RESTRICTED") {
            config.restricted = restricted;
        }
        if let Some(count_calls) = env_flag("REEL_COUNT_CALLS") {
            config.count_calls = count_calls;
        }
        if let Some(show_stats) = env_flag("REEL_SHOW_STATS") {
            config.show_stats = show_stats;
        }
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_search_path(mut self, entry: &str) -> Self {
        self.search_path.push(String::from(entry));
        self
    }

    pub fn restricted(mut self, restricted: bool) -> Self {
        self.restricted = restricted;
        self
    }

    pub fn mode(mut self, mode: EvalMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn repair(mut self, repair: bool) -> Self {
        self.repair = repair;
        self
    }

    pub fn count_calls(mut self, count_calls: bool) -> Self {
        self.count_calls = count_calls;
        self
    }

    pub fn show_stats(mut self, show_stats: bool) -> Self {
        self.show_stats = show_stats;
        self
    }
}
