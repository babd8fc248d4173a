//! Ed25519 signing keys for Sui actors
//!
//! Keys come from the environment as base64 in the Sui keystore layout: one scheme
//! flag byte followed by the 32-byte seed. A bare 32-byte seed is accepted too.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use blake2::{digest::consts::U32, Blake2b, Digest};
use ring::signature::{Ed25519KeyPair, KeyPair as _};
use std::fmt;

type Blake2b256 = Blake2b<U32>;

/// Signature scheme flag for Ed25519.
pub const ED25519_FLAG: u8 = 0x00;

/// Intent prefix for a transaction-data message (scope, version, app id).
const TRANSACTION_INTENT: [u8; 3] = [0, 0, 0];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("missing credential: {0} is not set")]
    MissingCredential(String),

    #[error("invalid credential in {source_name}: {reason}")]
    InvalidCredential { source_name: String, reason: String },
}

impl CredentialError {
    fn invalid(source_name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidCredential {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }
}

pub struct Keypair {
    inner: Ed25519KeyPair,
    address: String,
}

impl Keypair {
    pub fn from_seed(seed: &[u8]) -> Result<Self, CredentialError> {
        let inner = Ed25519KeyPair::from_seed_unchecked(seed)
            .map_err(|e| CredentialError::invalid("seed", e.to_string()))?;
        let address = derive_address(inner.public_key().as_ref());
        Ok(Self { inner, address })
    }

    /// Decode a base64 private key. `source_name` only labels errors.
    pub fn from_base64(source_name: &str, encoded: &str) -> Result<Self, CredentialError> {
        let raw = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CredentialError::invalid(source_name, e.to_string()))?;
        let seed = match raw.len() {
            33 if raw[0] == ED25519_FLAG => &raw[1..],
            33 => {
                return Err(CredentialError::invalid(
                    source_name,
                    format!("unsupported key scheme flag {:#04x}", raw[0]),
                ))
            }
            32 => &raw[..],
            n => {
                return Err(CredentialError::invalid(
                    source_name,
                    format!("expected 32 or 33 bytes, got {}", n),
                ))
            }
        };
        Self::from_seed(seed).map_err(|_| CredentialError::invalid(source_name, "rejected seed"))
    }

    /// Load the key named by `var` from the process environment.
    pub fn from_env(var: &str) -> Result<Self, CredentialError> {
        Self::from_env_value(var, std::env::var(var).ok())
    }

    /// Same as `from_env` with the lookup already done. Blank counts as missing.
    pub fn from_env_value(var: &str, value: Option<String>) -> Result<Self, CredentialError> {
        match value {
            Some(v) if !v.trim().is_empty() => Self::from_base64(var, &v),
            _ => Err(CredentialError::MissingCredential(var.to_string())),
        }
    }

    pub fn public_key(&self) -> &[u8] {
        self.inner.public_key().as_ref()
    }

    /// `0x` + hex(blake2b256(flag || public key)).
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Sign raw transaction bytes and return the serialized signature
    /// (base64 of flag || signature || public key).
    pub fn sign_transaction(&self, tx_bytes: &[u8]) -> String {
        let digest = transaction_digest(tx_bytes);
        let signature = self.inner.sign(&digest);

        let mut serialized = Vec::with_capacity(1 + 64 + 32);
        serialized.push(ED25519_FLAG);
        serialized.extend_from_slice(signature.as_ref());
        serialized.extend_from_slice(self.public_key());
        STANDARD.encode(serialized)
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair").field("address", &self.address).finish()
    }
}

/// The message Sui actually signs: blake2b256 over the intent-prefixed bytes.
pub fn transaction_digest(tx_bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(TRANSACTION_INTENT);
    hasher.update(tx_bytes);
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

fn derive_address(public_key: &[u8]) -> String {
    let mut hasher = Blake2b256::new();
    hasher.update([ED25519_FLAG]);
    hasher.update(public_key);
    format!("0x{}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_blank_env_are_missing_credential() {
        assert_eq!(
            Keypair::from_env_value("PRIVATE_KEY", None).unwrap_err(),
            CredentialError::MissingCredential("PRIVATE_KEY".into())
        );
        assert_eq!(
            Keypair::from_env_value("USER1_PRIVATE_KEY", Some("  ".into())).unwrap_err(),
            CredentialError::MissingCredential("USER1_PRIVATE_KEY".into())
        );
    }

    #[test]
    fn flagged_and_bare_seeds_agree() {
        let seed = [9u8; 32];
        let mut flagged = vec![ED25519_FLAG];
        flagged.extend_from_slice(&seed);

        let a = Keypair::from_base64("k", &STANDARD.encode(flagged)).unwrap();
        let b = Keypair::from_base64("k", &STANDARD.encode(seed)).unwrap();
        assert_eq!(a.address(), b.address());
    }

    #[test]
    fn wrong_length_and_scheme_rejected() {
        let err = Keypair::from_base64("k", &STANDARD.encode([1u8; 10])).unwrap_err();
        assert!(err.to_string().contains("got 10"));

        let mut secp = vec![0x01];
        secp.extend_from_slice(&[1u8; 32]);
        assert!(Keypair::from_base64("k", &STANDARD.encode(secp)).is_err());
        assert!(Keypair::from_base64("k", "not base64!").is_err());
    }

    #[test]
    fn debug_does_not_print_secret() {
        let kp = Keypair::from_seed(&[3u8; 32]).unwrap();
        let shown = format!("{:?}", kp);
        assert!(shown.contains(kp.address()));
        assert!(!shown.contains("inner"));
    }
}
