//! Signed-message codec: canonical byte encoding plus confirmation signing
//! and verification.
//!
//! The canonical encoding of every message kind is its protobuf encoding;
//! prost emits fields in tag order, so two honest nodes compute equal bytes
//! (and therefore equal hashes) over equal messages. Transaction hashes are
//! content-addressed: blake3 over the encoding with `signatures` cleared.

use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use kagura_proto::api::{ConsensusEvent, RecieverConfirmation, Signature, Transaction};
use prost::Message;

/// Length of a content hash in bytes.
pub const HASH_LEN: usize = blake3::OUT_LEN;

/// Canonical byte encoding of a wire message.
pub fn encode<M: Message>(message: &M) -> Vec<u8> {
    message.encode_to_vec()
}

/// Decodes a message previously produced by [`encode`].
pub fn decode<M: Message + Default>(bytes: &[u8]) -> Result<M, prost::DecodeError> {
    M::decode(bytes)
}

/// Bytes covered by a transaction's content hash: every field except the
/// signatures.
pub fn signable_bytes(tx: &Transaction) -> Vec<u8> {
    let mut body = tx.clone();
    body.signatures.clear();
    body.encode_to_vec()
}

/// Content-addressed transaction hash.
pub fn transaction_hash(tx: &Transaction) -> [u8; HASH_LEN] {
    *blake3::hash(&signable_bytes(tx)).as_bytes()
}

/// Hash of the transaction an event carries, if any.
pub fn event_transaction_hash(event: &ConsensusEvent) -> Option<[u8; HASH_LEN]> {
    event.transaction.as_ref().map(transaction_hash)
}

/// Signs message hashes on behalf of one node.
///
/// Key material is injected at construction; the signer holds no global
/// state and is cheap to clone.
#[derive(Clone)]
pub struct MessageSigner {
    signing_key: SigningKey,
}

impl MessageSigner {
    pub fn new(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    /// Produces a receipt confirmation: this node's public key and a
    /// signature over `hash`.
    pub fn sign(&self, hash: &[u8]) -> RecieverConfirmation {
        let signature = self.signing_key.sign(hash);
        RecieverConfirmation {
            hash: hash.to_vec(),
            signature: Some(Signature {
                public_key: self.signing_key.verifying_key().to_bytes().to_vec(),
                signature: signature.to_bytes().to_vec(),
            }),
        }
    }

    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

/// True iff the confirmation's signature verifies its embedded hash under
/// the embedded public key.
pub fn verify_confirmation(confirm: &RecieverConfirmation) -> bool {
    match &confirm.signature {
        Some(signature) => verify_signature(signature, &confirm.hash),
        None => false,
    }
}

/// Verifies one detached signature over `payload`.
pub fn verify_signature(signature: &Signature, payload: &[u8]) -> bool {
    let Ok(key_bytes) = <[u8; 32]>::try_from(signature.public_key.as_slice()) else {
        return false;
    };
    let Ok(public_key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; 64]>::try_from(signature.signature.as_slice()) else {
        return false;
    };
    let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
    public_key.verify(payload, &signature).is_ok()
}

/// Signs the transaction's content hash with `key` and appends the
/// resulting signature. The content hash is unaffected.
pub fn sign_transaction(tx: &mut Transaction, key: &SigningKey) {
    let hash = transaction_hash(tx);
    let signature = key.sign(&hash);
    tx.signatures.push(Signature {
        public_key: key.verifying_key().to_bytes().to_vec(),
        signature: signature.to_bytes().to_vec(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use kagura_proto::api::{command, AddSignatory, Command, Proposal};
    use rand::rngs::OsRng;

    fn test_transaction() -> Transaction {
        Transaction {
            creator_account_id: "alice@wonderland".to_string(),
            created_time: 1_700_000_000_000,
            commands: vec![Command {
                command: Some(command::Command::AddSignatory(AddSignatory {
                    account_id: "alice@wonderland".to_string(),
                    public_key: vec![7u8; 32],
                })),
            }],
            signatures: Vec::new(),
        }
    }

    #[test]
    fn sign_then_verify_confirmation() {
        let signer = MessageSigner::new(SigningKey::generate(&mut OsRng));
        let hash = transaction_hash(&test_transaction());

        let confirm = signer.sign(&hash);
        assert!(verify_confirmation(&confirm));
        assert_eq!(confirm.hash, hash.to_vec());
    }

    #[test]
    fn tampered_hash_fails_verification() {
        let signer = MessageSigner::new(SigningKey::generate(&mut OsRng));
        let hash = transaction_hash(&test_transaction());

        let mut confirm = signer.sign(&hash);
        confirm.hash[0] ^= 0x01;
        assert!(!verify_confirmation(&confirm));
    }

    #[test]
    fn tampered_signature_fails_verification() {
        let signer = MessageSigner::new(SigningKey::generate(&mut OsRng));
        let hash = transaction_hash(&test_transaction());

        let mut confirm = signer.sign(&hash);
        let sig = confirm.signature.as_mut().unwrap();
        sig.signature[10] ^= 0x01;
        assert!(!verify_confirmation(&confirm));
    }

    #[test]
    fn missing_signature_fails_verification() {
        let confirm = RecieverConfirmation {
            hash: vec![1u8; HASH_LEN],
            signature: None,
        };
        assert!(!verify_confirmation(&confirm));
    }

    #[test]
    fn hash_ignores_signatures() {
        let mut tx = test_transaction();
        let unsigned = transaction_hash(&tx);

        sign_transaction(&mut tx, &SigningKey::generate(&mut OsRng));
        sign_transaction(&mut tx, &SigningKey::generate(&mut OsRng));
        assert_eq!(transaction_hash(&tx), unsigned);
    }

    #[test]
    fn hash_covers_every_other_field() {
        let tx = test_transaction();
        let base = transaction_hash(&tx);

        let mut changed = tx.clone();
        changed.created_time += 1;
        assert_ne!(transaction_hash(&changed), base);

        let mut changed = tx.clone();
        changed.creator_account_id.push('x');
        assert_ne!(transaction_hash(&changed), base);

        let mut changed = tx;
        changed.commands.clear();
        assert_ne!(transaction_hash(&changed), base);
    }

    #[test]
    fn encoding_is_deterministic() {
        let mut tx = test_transaction();
        sign_transaction(&mut tx, &SigningKey::generate(&mut OsRng));
        assert_eq!(encode(&tx), encode(&tx.clone()));
    }

    #[test]
    fn transaction_round_trip() {
        let mut tx = test_transaction();
        sign_transaction(&mut tx, &SigningKey::generate(&mut OsRng));

        let decoded: Transaction = decode(&encode(&tx)).unwrap();
        assert_eq!(decoded, tx);
    }

    #[test]
    fn proposal_round_trip() {
        let proposal = Proposal {
            height: 2,
            created_time: 1_700_000_000_123,
            transactions: vec![test_transaction()],
        };

        let decoded: Proposal = decode(&encode(&proposal)).unwrap();
        assert_eq!(decoded, proposal);
    }

    #[test]
    fn event_round_trip_preserves_transaction_bytes() {
        let mut tx = test_transaction();
        sign_transaction(&mut tx, &SigningKey::generate(&mut OsRng));
        let event = ConsensusEvent {
            transaction: Some(tx.clone()),
            event_signatures: Vec::new(),
            status: String::new(),
        };

        let decoded: ConsensusEvent = decode(&encode(&event)).unwrap();
        assert_eq!(encode(decoded.transaction.as_ref().unwrap()), encode(&tx));
    }
}
