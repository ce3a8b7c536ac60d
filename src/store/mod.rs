pub mod entities;
pub mod snapshot;
pub mod tracker;
