//! Personal time tracker for the terminal. Start and stop work/break timers,
//! correct the history by hand, organize entries with projects and tags, and
//! pull daily or per-project reports out of the tracked intervals.
//!

pub mod cli;
pub mod report;
pub mod store;
pub mod utils;
