use serde::{Deserialize, Serialize};

/// Bookkeeping returned alongside `find_references`/`get_function_details`
/// results (spec.md §9 / `SPEC_FULL.md` §3, grounded on the original
/// `typescript_models.py::AnalysisStats`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub searched_files: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub parse_time_ms: f64,
    pub resolution_time_ms: f64,
    pub pass_depth: u8,
}

/// Outcome counts for batch type resolution (spec.md §4.7
/// `fallback_on_complexity`, grounded on `type_resolver.py`'s batch-mode
/// bucketing).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    pub basic: u64,
    pub generic: u64,
    pub inferred: u64,
    pub error: u64,
}
