//! Capability traits wiring inbound RPCs to node subsystems.
//!
//! Each wire service is generic over one handler type implementing the
//! matching trait, so the whole dispatch graph is fixed at server
//! construction and auditable at compile time. Handlers are delivery
//! callbacks: they must not block the RPC worker for long.

use kagura_core::ordering::OrderingHandle;
use kagura_proto::api::{ConsensusEvent, Query, Transaction};

/// Receives peer-to-peer consensus events (`Sumeragi.Verify`).
pub trait EventSink: Send + Sync + 'static {
    fn on_event(&self, from: &str, event: ConsensusEvent);
}

/// Receives client-submitted transactions (`Sumeragi.Torii`).
pub trait TransactionSink: Send + Sync + 'static {
    fn on_transaction(&self, from: &str, transaction: Transaction);
}

/// Receives repository queries (`find`).
pub trait QuerySink: Send + Sync + 'static {
    fn on_find(&self, from: &str, query: Query);
}

/// Torii submissions feed the ordering service's ingestion queue.
impl TransactionSink for OrderingHandle {
    fn on_transaction(&self, _from: &str, transaction: Transaction) {
        OrderingHandle::on_transaction(self, transaction);
    }
}
