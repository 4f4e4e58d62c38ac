//! Stateful validation: filtering a proposal against a speculative
//! world-state view.

use std::collections::BTreeSet;

use kagura_proto::api::{Proposal, Signature, Transaction};
use slog::Logger;
use thiserror::Error;

use crate::codec;
use crate::wsv::TemporaryWsv;

/// Why a transaction was excluded from the verified proposal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RejectReason {
    #[error("creator account {0} is unknown")]
    UnknownAccount(String),
    #[error("quorum not met: {have} of {need} signatures")]
    QuorumNotMet { have: usize, need: u32 },
    #[error("a signing key is not a registered signatory")]
    UnknownSigner,
}

/// Filters proposals down to their admissible subsequence.
///
/// The validator never fails a proposal as a whole: inadmissible
/// transactions are dropped and the remainder — possibly empty — is
/// returned with the input's height and creation time.
pub struct StatefulValidator {
    logger: Logger,
}

impl StatefulValidator {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Validates `proposal` against `wsv`, returning the verified proposal.
    ///
    /// Transactions are evaluated in proposal order; effects of accepted
    /// transactions accumulate in the view, so a later transaction may be
    /// admitted only because of an earlier one.
    pub fn validate(&self, proposal: &Proposal, wsv: &mut TemporaryWsv) -> Proposal {
        slog::info!(
            self.logger,
            "transactions in proposal";
            "height" => proposal.height,
            "count" => proposal.transactions.len(),
        );

        let mut valid = Vec::with_capacity(proposal.transactions.len());
        for tx in &proposal.transactions {
            let accepted = wsv.apply(tx, |tx, queries| match Self::admissible(tx, queries) {
                Ok(()) => true,
                Err(reason) => {
                    slog::debug!(
                        self.logger,
                        "transaction rejected";
                        "tx_hash" => hex::encode(&codec::transaction_hash(tx)[..8]),
                        "reason" => %reason,
                    );
                    false
                }
            });
            if accepted {
                valid.push(tx.clone());
            }
        }

        let verified = Proposal {
            height: proposal.height,
            created_time: proposal.created_time,
            transactions: valid,
        };
        slog::info!(
            self.logger,
            "transactions in verified proposal";
            "height" => verified.height,
            "count" => verified.transactions.len(),
        );
        verified
    }

    /// The per-transaction admissibility predicate.
    fn admissible(tx: &Transaction, queries: &TemporaryWsv) -> Result<(), RejectReason> {
        let account = queries
            .get_account(&tx.creator_account_id)
            .ok_or_else(|| RejectReason::UnknownAccount(tx.creator_account_id.clone()))?;

        if tx.signatures.len() < account.quorum as usize {
            return Err(RejectReason::QuorumNotMet {
                have: tx.signatures.len(),
                need: account.quorum,
            });
        }

        let signatories = queries
            .get_signatories(&tx.creator_account_id)
            .ok_or_else(|| RejectReason::UnknownAccount(tx.creator_account_id.clone()))?;

        if !signatures_subset(&tx.signatures, &signatories) {
            return Err(RejectReason::UnknownSigner);
        }
        Ok(())
    }
}

/// True iff every signing key is a registered signatory.
fn signatures_subset(signatures: &[Signature], signatories: &BTreeSet<Vec<u8>>) -> bool {
    signatures
        .iter()
        .all(|signature| signatories.contains(&signature.public_key))
}
