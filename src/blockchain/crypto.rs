use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use std::fmt;
use std::str::FromStr;

/// Sender literal used by coinbase (reward) transactions
pub const NETWORK_ADDRESS: &str = "network";

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Malformed key: {0}")]
    MalformedKey(String),

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// Represents a wallet address (public key in base58 format)
///
/// Recipients may also be opaque strings; only senders have to decode to a key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    /// Creates a new address from a public key
    pub fn from_public_key(public_key: &VerifyingKey) -> Self {
        Address(bs58::encode(public_key.as_bytes()).into_string())
    }

    /// The reserved issuer of reward transactions
    pub fn network() -> Self {
        Address(NETWORK_ADDRESS.to_string())
    }

    /// Checks if this is the reserved network address
    pub fn is_network(&self) -> bool {
        self.0 == NETWORK_ADDRESS
    }

    /// Converts the address back to a public key
    pub fn to_public_key(&self) -> Result<VerifyingKey, CryptoError> {
        let bytes = bs58::decode(&self.0)
            .into_vec()
            .map_err(|e| CryptoError::MalformedKey(e.to_string()))?;

        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            CryptoError::MalformedKey("Public key must be 32 bytes".to_string())
        })?;

        VerifyingKey::from_bytes(&bytes).map_err(|e| CryptoError::MalformedKey(e.to_string()))
    }

    /// Gets the address text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CryptoError::InvalidAddress("Address is empty".to_string()));
        }
        if s == NETWORK_ADDRESS {
            return Err(CryptoError::InvalidAddress(format!(
                "'{}' is reserved for reward transactions",
                NETWORK_ADDRESS
            )));
        }

        Ok(Address(s.to_string()))
    }
}

/// Represents a digital signature in base58 format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct DigitalSignature(pub String);

impl DigitalSignature {
    /// Creates a new digital signature from a signature
    pub fn from_signature(signature: &Signature) -> Self {
        DigitalSignature(bs58::encode(signature.to_bytes()).into_string())
    }

    /// Converts the digital signature to a signature
    pub fn to_signature(&self) -> Result<Signature, CryptoError> {
        let bytes = bs58::decode(&self.0)
            .into_vec()
            .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;

        let signature_bytes: [u8; 64] = bytes.try_into().map_err(|_| {
            CryptoError::MalformedSignature("Signature must be 64 bytes".to_string())
        })?;

        Ok(Signature::from_bytes(&signature_bytes))
    }
}

/// Represents a wallet with a keypair
#[derive(Debug, Clone)]
pub struct Wallet {
    signing_key: SigningKey,
    address: Address,
}

impl Wallet {
    /// Creates a new wallet with a random keypair
    pub fn new() -> Self {
        let mut csprng = OsRng;
        Self::from_signing_key(SigningKey::generate(&mut csprng))
    }

    /// Restores a wallet from a base58 private key produced by [`Wallet::export_private_key`]
    pub fn from_private_key(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = bs58::decode(encoded.trim())
            .into_vec()
            .map_err(|e| CryptoError::MalformedKey(e.to_string()))?;

        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            CryptoError::MalformedKey("Private key must be 32 bytes".to_string())
        })?;

        Ok(Self::from_signing_key(SigningKey::from_bytes(&bytes)))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = Address::from_public_key(&signing_key.verifying_key());
        Wallet {
            signing_key,
            address,
        }
    }

    /// Gets the wallet's address
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Gets the wallet's public key
    #[cfg(test)]
    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Signs a message with the wallet's private key
    pub fn sign(&self, message: &[u8]) -> DigitalSignature {
        DigitalSignature::from_signature(&self.signing_key.sign(message))
    }

    /// Exports the wallet's private key as base58
    pub fn export_private_key(&self) -> String {
        bs58::encode(self.signing_key.to_bytes()).into_string()
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

/// Verifies a signature against a message and public key
///
/// A well-formed signature that does not match yields `Ok(false)`; text that does
/// not decode to a signature at all is an error.
pub fn verify_signature(
    message: &[u8],
    signature: &DigitalSignature,
    public_key: &VerifyingKey,
) -> Result<bool, CryptoError> {
    let signature = signature.to_signature()?;
    Ok(public_key.verify(message, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_creation() {
        let wallet = Wallet::new();
        assert!(!wallet.address().0.is_empty());
        assert_ne!(wallet.address(), Wallet::new().address());
    }

    #[test]
    fn test_signing_and_verification() {
        let wallet = Wallet::new();
        let message = b"Hello, world!";

        let signature = wallet.sign(message);

        let result = verify_signature(message, &signature, &wallet.public_key()).unwrap();
        assert!(result);

        let wrong_message = b"Hello, world?";
        let result = verify_signature(wrong_message, &signature, &wallet.public_key()).unwrap();
        assert!(!result);
    }

    #[test]
    fn test_signature_from_other_wallet_fails() {
        let signer = Wallet::new();
        let other = Wallet::new();
        let signature = signer.sign(b"payload");

        assert!(!verify_signature(b"payload", &signature, &other.public_key()).unwrap());
    }

    #[test]
    fn test_malformed_signature_is_an_error() {
        let wallet = Wallet::new();

        let not_base58 = DigitalSignature("0OIl".to_string());
        assert!(matches!(
            verify_signature(b"x", &not_base58, &wallet.public_key()),
            Err(CryptoError::MalformedSignature(_))
        ));

        let too_short = DigitalSignature(bs58::encode([1u8; 10]).into_string());
        assert!(matches!(
            verify_signature(b"x", &too_short, &wallet.public_key()),
            Err(CryptoError::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_address_conversion() {
        let wallet = Wallet::new();
        let public_key = wallet.address().to_public_key().unwrap();

        assert_eq!(public_key.as_bytes(), wallet.public_key().as_bytes());
        assert_eq!(&Address::from_public_key(&public_key), wallet.address());
    }

    #[test]
    fn test_malformed_public_key() {
        assert!(matches!(
            Address("not a key!".to_string()).to_public_key(),
            Err(CryptoError::MalformedKey(_))
        ));
        assert!(matches!(
            Address::network().to_public_key(),
            Err(CryptoError::MalformedKey(_))
        ));
    }

    #[test]
    fn test_private_key_round_trip() {
        let wallet = Wallet::new();
        let restored = Wallet::from_private_key(&wallet.export_private_key()).unwrap();

        assert_eq!(restored.address(), wallet.address());
        assert_eq!(restored.export_private_key(), wallet.export_private_key());
        assert!(matches!(
            Wallet::from_private_key("abc"),
            Err(CryptoError::MalformedKey(_))
        ));
    }

    #[test]
    fn test_address_parsing() {
        assert_eq!(
            "  someone ".parse::<Address>().unwrap(),
            Address("someone".to_string())
        );
        assert!("".parse::<Address>().is_err());
        assert!(NETWORK_ADDRESS.parse::<Address>().is_err());
    }
}
