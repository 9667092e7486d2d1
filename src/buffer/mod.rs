//! In-memory handoff between producers and the dispatch worker.

pub mod queue;

pub use queue::HandoffQueue;
