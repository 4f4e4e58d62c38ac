//! Batching of queued transactions into height-numbered proposals.

mod service;

pub use service::{OrderingConfig, OrderingHandle, OrderingService};

use kagura_proto::api::Proposal;

use crate::directory::PeerEntry;

/// Read access to the ledger peer set recorded in world state.
pub trait PeerQuery: Send + Sync {
    fn get_ledger_peers(&self) -> Option<Vec<PeerEntry>>;
}

/// Outbound side of the transport fabric, as seen by the ordering service.
///
/// Per-peer delivery failures are the implementation's to log; the ordering
/// service neither retries nor aborts on them.
#[async_trait::async_trait]
pub trait ProposalTransport: Send + Sync {
    async fn publish_proposal(&self, proposal: Proposal, peers: &[String]);
}
