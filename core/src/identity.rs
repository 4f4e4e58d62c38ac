//! Node identity: the Ed25519 keypair a peer signs confirmations with.

use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::codec::MessageSigner;

/// Ed25519 identity for one ledger node.
///
/// # Security
/// The secret bytes are zeroized on drop to prevent key material from
/// lingering in memory.
pub struct NodeIdentity {
    secret: [u8; 32],
}

impl NodeIdentity {
    /// Generate a new random identity.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut secret = [0u8; 32];
        rng.fill_bytes(&mut secret);
        Self { secret }
    }

    /// Create an identity from raw secret bytes (for deterministic testing
    /// or persistence).
    pub fn from_secret_bytes(secret: [u8; 32]) -> Self {
        Self { secret }
    }

    /// Get the Ed25519 public key.
    pub fn public_key(&self) -> VerifyingKey {
        SigningKey::from_bytes(&self.secret).verifying_key()
    }

    /// Build the signing key (private-key access point).
    pub fn signing_key(&self) -> SigningKey {
        SigningKey::from_bytes(&self.secret)
    }

    /// Build a confirmation signer backed by this identity.
    pub fn signer(&self) -> MessageSigner {
        MessageSigner::new(self.signing_key())
    }

    /// Save the identity secret to a file (hex-encoded).
    ///
    /// # Security
    /// The file contains the private key material. Ensure proper file
    /// permissions.
    pub fn save_to_file(&self, path: &std::path::Path) -> std::io::Result<()> {
        use std::io::Write;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)?;
        writeln!(file, "{}", hex::encode(self.secret))?;
        Ok(())
    }

    /// Load an identity from a secret file (hex-encoded).
    pub fn load_from_file(path: &std::path::Path) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let bytes = hex::decode(contents.trim())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let secret: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, "identity secret must be 32 bytes")
        })?;
        Ok(Self { secret })
    }

    /// Load an identity from file if it exists, otherwise generate and save.
    pub fn load_or_generate<R: RngCore + CryptoRng>(
        path: Option<&std::path::Path>,
        rng: &mut R,
    ) -> std::io::Result<Self> {
        match path {
            Some(p) if p.exists() => Self::load_from_file(p),
            Some(p) => {
                let identity = Self::generate(rng);
                identity.save_to_file(p)?;
                Ok(identity)
            }
            None => Ok(Self::generate(rng)),
        }
    }
}

impl Drop for NodeIdentity {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

impl Clone for NodeIdentity {
    fn clone(&self) -> Self {
        Self { secret: self.secret }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn deterministic_from_secret() {
        let a = NodeIdentity::from_secret_bytes([9u8; 32]);
        let b = NodeIdentity::from_secret_bytes([9u8; 32]);
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("node.key");

        let identity = NodeIdentity::generate(&mut OsRng);
        identity.save_to_file(&path).unwrap();

        let loaded = NodeIdentity::load_from_file(&path).unwrap();
        assert_eq!(loaded.public_key(), identity.public_key());
    }

    #[test]
    fn load_or_generate_creates_then_reuses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.key");

        let first = NodeIdentity::load_or_generate(Some(&path), &mut OsRng).unwrap();
        assert!(path.exists());

        let second = NodeIdentity::load_or_generate(Some(&path), &mut OsRng).unwrap();
        assert_eq!(first.public_key(), second.public_key());
    }

    #[test]
    fn load_rejects_short_secret() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.key");
        std::fs::write(&path, "0badc0de").unwrap();

        assert!(NodeIdentity::load_from_file(&path).is_err());
    }

    #[test]
    fn signer_confirmations_verify() {
        let identity = NodeIdentity::generate(&mut OsRng);
        let confirm = identity.signer().sign(&[0xabu8; 32]);
        assert!(crate::codec::verify_confirmation(&confirm));
    }
}
