pub mod config;
pub mod db;
pub mod documents;
pub mod error;
pub mod models;
pub mod sink;
pub mod state_store;
pub mod worker;

pub use config::{PipelineConfig, WorkerConfig};
pub use db::{create_pool, run_migrations};
pub use error::PipelineError;
pub use models::{Document, StateEntry};
pub use sink::IndexSink;
pub use state_store::PgStateStore;
pub use worker::{run_harvest_worker, run_round, SourceRun};
