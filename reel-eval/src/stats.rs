use serde::Serialize;
use std::collections::BTreeMap;

/// Counters kept by one evaluator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvalStats {
    pub envs: u64,
    pub values_in_envs: u64,
    pub values: u64,
    pub list_elems: u64,
    pub list_concats: u64,
    pub attrsets: u64,
    pub attrs_in_attrsets: u64,
    pub op_updates: u64,
    pub op_update_values_copied: u64,
    pub thunks: u64,
    pub thunks_avoided: u64,
    pub lookups: u64,
    pub primop_calls: u64,
    pub function_calls: u64,
    /// Per built-in, only kept when call counting is enabled.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub primop_call_counts: BTreeMap<String, u64>,
    /// Per lambda position, only kept when call counting is enabled.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub function_call_counts: BTreeMap<String, u64>,
    /// Per selection position, only kept when call counting is enabled.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attr_selects: BTreeMap<String, u64>,
}

impl EvalStats {
    pub fn new() -> Self {
        EvalStats::default()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub(crate) fn count(counts: &mut BTreeMap<String, u64>, key: String) {
        *counts.entry(key).or_insert(0) += 1;
    }
}
