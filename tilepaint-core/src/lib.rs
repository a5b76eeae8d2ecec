//! # tilepaint-core
//!
//! Raster editing engine: layered documents, tile-granular undo capture, a single shared scratch
//! buffer, and the workspace that coordinates interactive tools with programmatic changes.

pub mod capture;
pub mod config;
pub mod history;
pub mod id;
pub mod scratch;
pub mod state;
pub mod surface;
pub mod tools;
pub mod util;
pub mod workspace;

pub use id::PaintID;
