//! Authoritative runtime set of peer addresses and keys.
//!
//! The directory is an injected service: a node-wide context constructs one
//! from config plus the node identity and hands it to the transport and the
//! ordering service. Tests inject their own instances.

use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::{Context, Result};
use ed25519_dalek::VerifyingKey;

use crate::codec::MessageSigner;
use crate::config::NodeConfig;
use crate::identity::NodeIdentity;
use crate::ordering::PeerQuery;

/// Default gRPC port shared by the peer set.
pub const DEFAULT_GRPC_PORT: u16 = 50051;

/// One ledger peer as known to the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEntry {
    pub address: String,
    pub public_key: VerifyingKey,
}

/// Peer directory: this node's identity plus the permissioned peer table.
///
/// Reads are snapshot-consistent; updates are serialized behind the lock.
pub struct PeerDirectory {
    my_address: String,
    grpc_port: Option<u16>,
    identity: NodeIdentity,
    peers: RwLock<BTreeMap<String, VerifyingKey>>,
}

impl PeerDirectory {
    pub fn new(
        my_address: String,
        grpc_port: Option<u16>,
        identity: NodeIdentity,
        peers: Vec<PeerEntry>,
    ) -> Self {
        let peers = peers
            .into_iter()
            .map(|p| (p.address, p.public_key))
            .collect();
        Self {
            my_address,
            grpc_port,
            identity,
            peers: RwLock::new(peers),
        }
    }

    /// Build a directory from loaded configuration.
    pub fn from_config(config: &NodeConfig, identity: NodeIdentity) -> Result<Self> {
        let mut peers = Vec::with_capacity(config.peers.len());
        for peer in &config.peers {
            let bytes = hex::decode(&peer.public_key)
                .with_context(|| format!("invalid public key hex for peer {}", peer.address))?;
            let bytes: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
                anyhow::anyhow!("public key for peer {} must be 32 bytes", peer.address)
            })?;
            let public_key = VerifyingKey::from_bytes(&bytes)
                .with_context(|| format!("invalid public key for peer {}", peer.address))?;
            peers.push(PeerEntry {
                address: peer.address.clone(),
                public_key,
            });
        }
        Ok(Self::new(
            config.my_address.clone(),
            Some(config.grpc_port),
            identity,
            peers,
        ))
    }

    /// Snapshot of every known peer address.
    pub fn ip_list(&self) -> Vec<String> {
        self.peers.read().unwrap().keys().cloned().collect()
    }

    /// Snapshot of every known peer entry.
    pub fn entries(&self) -> Vec<PeerEntry> {
        self.peers
            .read()
            .unwrap()
            .iter()
            .map(|(address, public_key)| PeerEntry {
                address: address.clone(),
                public_key: *public_key,
            })
            .collect()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.peers.read().unwrap().contains_key(address)
    }

    pub fn public_key_of(&self, address: &str) -> Option<VerifyingKey> {
        self.peers.read().unwrap().get(address).copied()
    }

    /// Insert or replace a peer entry.
    pub fn insert(&self, entry: PeerEntry) {
        self.peers
            .write()
            .unwrap()
            .insert(entry.address, entry.public_key);
    }

    pub fn my_address(&self) -> &str {
        &self.my_address
    }

    pub fn my_public_key(&self) -> VerifyingKey {
        self.identity.public_key()
    }

    /// This node's signing key (private-key access point).
    pub fn my_signing_key(&self) -> ed25519_dalek::SigningKey {
        self.identity.signing_key()
    }

    /// Confirmation signer backed by this node's private key.
    pub fn signer(&self) -> MessageSigner {
        self.identity.signer()
    }

    /// Configured gRPC port, or `default` when none was set.
    pub fn grpc_port(&self, default: u16) -> u16 {
        self.grpc_port.unwrap_or(default)
    }
}

impl PeerQuery for PeerDirectory {
    fn get_ledger_peers(&self) -> Option<Vec<PeerEntry>> {
        Some(self.entries())
    }
}
