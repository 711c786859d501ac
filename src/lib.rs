//! Demo surface for the quietsave pipeline: a CLI that auto-saves a
//! document assembled from stdin edits.

pub mod cli;
pub mod state;
