//! Periodic weather snapshot refresh.

pub mod scheduler;
pub mod worker;

pub use worker::{RefreshKind, RefreshSummary};
