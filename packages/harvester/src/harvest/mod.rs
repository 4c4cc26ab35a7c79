//! Harvest orchestration: paging, retries, state and record delivery.

mod controller;
mod sink;
mod state;
mod temp;
mod transform;

pub use controller::{CancelFlag, HarvestController};
pub use sink::{JsonLinesSink, RecordSink};
pub use state::{FileStateStore, MemoryStateStore, StateStore};
pub use temp::{allocate_temp_path, allocate_temp_path_with};
pub use transform::{decode_page, prepare_page, sanitize_body, PreTransform};
