//! Outbound peer link.

use std::sync::Arc;
use std::time::Duration;

use kagura_core::codec;
use kagura_core::directory::{PeerDirectory, DEFAULT_GRPC_PORT};
use kagura_proto::api::sumeragi_client::SumeragiClient;
use kagura_proto::api::{ConsensusEvent, StatusResponse, Transaction};
use slog::Logger;
use tonic::transport::Channel;

use crate::error::{TransportError, TransportResult};

/// Result of one outbound delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Remote answered OK and its confirmation verified.
    Ok,
    /// Remote answered OK but the returned confirmation did not verify.
    InvalidSignature,
    /// Transport-level failure: dial, RPC or per-call timeout.
    ConnectionFailure,
    /// Destination is not in the peer directory; nothing was sent.
    UnknownPeer,
}

impl SendOutcome {
    pub fn is_ok(self) -> bool {
        matches!(self, SendOutcome::Ok)
    }
}

/// Outbound Sumeragi link, gated by the peer directory.
///
/// The link does not retry; retry policy belongs to the caller.
pub struct SumeragiLink {
    directory: Arc<PeerDirectory>,
    timeout: Duration,
    logger: Logger,
}

impl SumeragiLink {
    pub fn new(directory: Arc<PeerDirectory>, timeout: Duration, logger: Logger) -> Self {
        Self {
            directory,
            timeout,
            logger,
        }
    }

    pub fn directory(&self) -> &PeerDirectory {
        &self.directory
    }

    /// Delivers a consensus event to `address` via `Sumeragi.Verify`.
    pub async fn send_event(&self, address: &str, event: &ConsensusEvent) -> SendOutcome {
        let Some(expected_hash) = codec::event_transaction_hash(event) else {
            slog::warn!(self.logger, "refusing to send event without transaction");
            return SendOutcome::ConnectionFailure;
        };

        let response = async {
            let mut client = self.connect(address).await?;
            self.call(address, client.verify(event.clone())).await
        }
        .await;
        self.conclude(address, response, &expected_hash)
    }

    /// Submits a transaction to `address` via `Sumeragi.Torii`.
    pub async fn send_transaction(&self, address: &str, transaction: &Transaction) -> SendOutcome {
        let expected_hash = codec::transaction_hash(transaction);

        let response = async {
            let mut client = self.connect(address).await?;
            self.call(address, client.torii(transaction.clone())).await
        }
        .await;
        self.conclude(address, response, &expected_hash)
    }

    /// Opens a channel to a directory-approved destination. Unknown
    /// addresses and our own address fail without a dial.
    async fn connect(&self, address: &str) -> TransportResult<SumeragiClient<Channel>> {
        if !self.directory.contains(address) || address == self.directory.my_address() {
            return Err(TransportError::UnknownPeer(address.to_string()));
        }

        let port = self.directory.grpc_port(DEFAULT_GRPC_PORT);
        let endpoint = format!("http://{}:{}", address, port);
        SumeragiClient::connect(endpoint)
            .await
            .map_err(|e| TransportError::ConnectionFailure(e.to_string()))
    }

    /// Awaits one RPC under the per-call timeout.
    async fn call<F>(&self, address: &str, rpc: F) -> TransportResult<StatusResponse>
    where
        F: std::future::Future<
            Output = Result<tonic::Response<StatusResponse>, tonic::Status>,
        >,
    {
        match tokio::time::timeout(self.timeout, rpc).await {
            Ok(Ok(response)) => Ok(response.into_inner()),
            Ok(Err(status)) => Err(TransportError::ConnectionFailure(format!(
                "{}: {}",
                address, status
            ))),
            Err(_) => Err(TransportError::ConnectionFailure(format!(
                "{}: call timed out",
                address
            ))),
        }
    }

    /// Classifies one delivery: the RPC must have answered OK and the
    /// returned confirmation must verify over the hash we sent.
    fn conclude(
        &self,
        address: &str,
        response: TransportResult<StatusResponse>,
        expected_hash: &[u8],
    ) -> SendOutcome {
        match response {
            Ok(response) => {
                let confirmed = response
                    .confirm
                    .as_ref()
                    .is_some_and(|confirm| {
                        confirm.hash == expected_hash && codec::verify_confirmation(confirm)
                    });
                if confirmed {
                    slog::debug!(self.logger, "delivery confirmed"; "peer" => %address, "response" => %response.value);
                    SendOutcome::Ok
                } else {
                    slog::warn!(self.logger, "confirmation did not verify"; "peer" => %address);
                    SendOutcome::InvalidSignature
                }
            }
            Err(TransportError::UnknownPeer(_)) => {
                slog::debug!(self.logger, "dropping send to unknown peer"; "peer" => %address);
                SendOutcome::UnknownPeer
            }
            Err(err) => {
                slog::error!(self.logger, "delivery failed"; "peer" => %address, "error" => %err);
                SendOutcome::ConnectionFailure
            }
        }
    }
}
