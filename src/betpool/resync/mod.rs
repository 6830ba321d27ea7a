pub mod config;
pub mod dedup;
pub mod error;
pub mod io;
pub mod model;
pub mod normalize;
pub mod orchestrator;
pub mod report;
pub mod table_sync;

pub use error::{Result, ResyncError};
