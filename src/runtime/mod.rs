//! # Runtime
//!
//! Process-wide lifecycle: startup wiring and the two background loops
//! (configuration refresh and pipeline sync).

pub mod initialization;
pub mod loops;

pub use initialization::{initialize, Runtime};
pub use loops::{run_config_refresh_loop, run_pipeline_sync_loop};
