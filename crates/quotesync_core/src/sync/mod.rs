//! Local/remote quote synchronization.
//!
//! # Responsibility
//! - `remote`: the asynchronous endpoint seam and its simulated server.
//! - `reconcile`: the pure merge and conflict-detection algorithm.
//! - `reconciler`: sync runs, pending conflicts and manual resolution.

pub mod reconcile;
pub mod reconciler;
pub mod remote;
