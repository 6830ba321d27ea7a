//! Core library for the betpool-resync command line application.
//!
//! The library rebuilds the betting pool's relational backend from the
//! spreadsheet that is its source of truth. Collaborators live under
//! [`betpool::resync::io`], the cell and table model inside
//! [`betpool::resync::model`], row cleaning in [`betpool::resync::normalize`]
//! and [`betpool::resync::dedup`], per-table writes in
//! [`betpool::resync::table_sync`], and the dependency-ordered run under
//! [`betpool::resync::orchestrator`].

pub mod betpool;

pub use betpool::resync::{
    Result, ResyncError, config, dedup, error, io, model, normalize, orchestrator, report,
    table_sync,
};
