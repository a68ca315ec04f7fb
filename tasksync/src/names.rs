//! Names of the shared resources addressed by requests.
//!
//! The formats are part of the cluster-wide contract: every component addressing a latch or a
//! checkpoint map of a context must derive the same name.

/// Prefix shared by all latch names.
const LATCH_PREFIX: &str = "latch_";

/// Prefix shared by all checkpoint map names.
const CHECKPOINT_MAP_PREFIX: &str = "checkpointmap_";

/// Returns the name of latch `selector` in context `context_id`: `latch_<context>_<selector>`.
pub fn latch_name(context_id: &str, selector: &str) -> String {
    format!("{LATCH_PREFIX}{context_id}_{selector}")
}

/// Returns the prefix shared by all latch names of context `context_id`.
pub fn latch_prefix(context_id: &str) -> String {
    format!("{LATCH_PREFIX}{context_id}_")
}

/// Returns the name of the checkpoint map of context `context_id`: `checkpointmap_<context>`.
pub fn checkpoint_map_name(context_id: &str) -> String {
    format!("{CHECKPOINT_MAP_PREFIX}{context_id}")
}
