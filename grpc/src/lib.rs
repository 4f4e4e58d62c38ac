//! gRPC transport fabric for the kagura ledger node.
//!
//! This crate provides:
//! - The inbound wire surface: Sumeragi (Verify/Torii) and the repository
//!   `find` services, dispatching to compile-time wired handlers
//! - The outbound peer link with confirmation verification
//! - Proposal broadcast toward the ledger peer set

pub mod broadcast;
pub mod client;
pub mod config;
pub mod error;
pub mod server;
pub mod sink;

pub use broadcast::ProposalBroadcaster;
pub use client::{SendOutcome, SumeragiLink};
pub use config::GrpcConfig;
pub use error::TransportError;
pub use server::RpcServer;
pub use sink::{EventSink, QuerySink, TransactionSink};
