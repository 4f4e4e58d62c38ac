//! Wire schema for the kagura ledger node.
//!
//! Message and service names are fixed by the peer protocol — including the
//! historical `RecieverConfirmation` spelling — and must not be renamed.

/// Generated protobuf code from tonic-build.
/// This module is populated by the build.rs script.
#[allow(clippy::all)]
#[allow(clippy::pedantic)]
pub mod api {
    tonic::include_proto!("api");
}

// Re-export key types for convenience
pub use api::{
    AssetResponse, Command, ConsensusEvent, Proposal, Query, RecieverConfirmation, Signature,
    StatusResponse, Transaction, TransactionResponse,
};
