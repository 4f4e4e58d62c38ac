//! Core subsystems of the kagura ledger node.
//!
//! This crate holds everything between the wire and the commit round: the
//! signed-message codec, the peer directory, the transaction ingestion
//! queue, the ordering service that batches transactions into
//! height-numbered proposals, and the stateful validator with its
//! speculative world-state view.

pub mod codec;
pub mod config;
pub mod directory;
pub mod identity;
pub mod ordering;
pub mod queue;
pub mod validation;
pub mod wsv;

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}
