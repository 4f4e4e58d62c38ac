//! Proposal broadcast toward the ledger peer set.

use async_trait::async_trait;
use kagura_core::ordering::ProposalTransport;
use kagura_proto::api::{ConsensusEvent, Proposal};
use slog::Logger;

use crate::client::SumeragiLink;

/// Delivers each proposal transaction as a consensus event to every peer.
///
/// Delivery is sequential per peer with no retry or acknowledgment
/// aggregation; failures are logged and the broadcast continues. The local
/// address is skipped.
pub struct ProposalBroadcaster {
    link: SumeragiLink,
    logger: Logger,
}

impl ProposalBroadcaster {
    pub fn new(link: SumeragiLink, logger: Logger) -> Self {
        Self { link, logger }
    }
}

#[async_trait]
impl ProposalTransport for ProposalBroadcaster {
    async fn publish_proposal(&self, proposal: Proposal, peers: &[String]) {
        slog::info!(
            self.logger,
            "Broadcasting proposal";
            "height" => proposal.height,
            "tx_count" => proposal.transactions.len(),
            "peers" => peers.len(),
        );

        for peer in peers {
            if peer == self.link.directory().my_address() {
                continue;
            }
            for tx in &proposal.transactions {
                let event = ConsensusEvent {
                    transaction: Some(tx.clone()),
                    event_signatures: Vec::new(),
                    status: String::new(),
                };
                let outcome = self.link.send_event(peer, &event).await;
                if !outcome.is_ok() {
                    slog::warn!(
                        self.logger,
                        "Proposal delivery failed";
                        "peer" => %peer,
                        "height" => proposal.height,
                        "outcome" => ?outcome,
                    );
                }
            }
        }
    }
}
