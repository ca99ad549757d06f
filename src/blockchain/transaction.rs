use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::codec::{self, CodecError};
use super::crypto::{verify_signature, Address, CryptoError, DigitalSignature, Wallet};

/// Signature literal carried by coinbase (reward) transactions
pub const REWARD_SIGNATURE: &str = "reward";

/// Errors that can occur during transaction operations
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid recipient address: {0}")]
    InvalidRecipientAddress(String),

    #[error("Crypto error: {0}")]
    CryptoError(#[from] CryptoError),

    #[error("Encoding error: {0}")]
    EncodingError(#[from] CodecError),
}

/// Represents a value transfer in the blockchain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Sender's address, or `network` for rewards
    #[schema(value_type = String)]
    pub from: Address,

    /// Recipient's address
    #[schema(value_type = String)]
    pub to: Address,

    /// Amount being transferred
    pub amount: f64,

    /// Signature over the canonical `{amount, from, to}` payload, or `reward`
    #[schema(value_type = String)]
    pub signature: DigitalSignature,
}

/// The signed part of a transaction
#[derive(Serialize)]
struct SignedPayload<'a> {
    from: &'a Address,
    to: &'a Address,
    amount: f64,
}

impl Transaction {
    /// Creates and signs a transfer from `wallet` to `to`
    ///
    /// # Arguments
    ///
    /// * `wallet` - The sender's wallet, used for both `from` and the signature
    /// * `to` - The address of the recipient
    /// * `amount` - The amount to transfer
    pub fn new_signed(wallet: &Wallet, to: Address, amount: f64) -> Result<Self, TransactionError> {
        let amount = validate_amount(amount)?;
        if to.is_network() {
            return Err(TransactionError::InvalidRecipientAddress(format!(
                "'{}' cannot receive transfers",
                to
            )));
        }

        let from = wallet.address().clone();
        let message = signing_bytes(&from, &to, amount)?;
        let signature = wallet.sign(&message);

        Ok(Transaction {
            from,
            to,
            amount,
            signature,
        })
    }

    /// Creates a new coinbase transaction (mining reward)
    pub fn new_coinbase(recipient: Address, amount: f64) -> Self {
        Transaction {
            from: Address::network(),
            to: recipient,
            amount,
            signature: DigitalSignature(REWARD_SIGNATURE.to_string()),
        }
    }

    /// Checks if the transaction is a coinbase transaction
    pub fn is_coinbase(&self) -> bool {
        self.from.is_network()
    }

    /// Canonical bytes covered by the signature
    pub fn signing_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        signing_bytes(&self.from, &self.to, self.amount)
    }

    /// Verifies the transaction's signature
    ///
    /// Coinbase transactions are accepted without any check. A sender that does not
    /// decode to a public key is an error, not a failed verification.
    pub fn verify_signature(&self) -> Result<bool, TransactionError> {
        if self.is_coinbase() {
            return Ok(true);
        }

        let public_key = self.from.to_public_key()?;
        let message = self.signing_bytes()?;

        Ok(verify_signature(&message, &self.signature, &public_key)?)
    }
}

fn signing_bytes(from: &Address, to: &Address, amount: f64) -> Result<Vec<u8>, TransactionError> {
    codec::ensure_finite("amount", amount)?;
    let amount = positive_zero(amount);
    Ok(codec::encode(&SignedPayload { from, to, amount })?)
}

// -0.0 == 0.0 but encodes as "-0.0"
fn positive_zero(amount: f64) -> f64 {
    if amount == 0.0 {
        0.0
    } else {
        amount
    }
}

/// Checks that an amount is finite and non-negative
///
/// # Returns
///
/// The amount to record, with `-0.0` turned into `0.0`
pub fn validate_amount(amount: f64) -> Result<f64, TransactionError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(TransactionError::InvalidAmount(format!(
            "Amount must be a finite, non-negative number: {}",
            amount
        )));
    }
    Ok(positive_zero(amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transaction() {
        let sender_wallet = Wallet::new();
        let recipient_wallet = Wallet::new();

        let transaction =
            Transaction::new_signed(&sender_wallet, recipient_wallet.address().clone(), 10.5)
                .unwrap();

        assert_eq!(transaction.from, *sender_wallet.address());
        assert_eq!(transaction.to, *recipient_wallet.address());
        assert_eq!(transaction.amount, 10.5);
        assert!(!transaction.is_coinbase());
        assert!(transaction.verify_signature().unwrap());
    }

    #[test]
    fn test_signing_bytes_layout() {
        let transaction = Transaction {
            from: Address("alice".to_string()),
            to: Address("bob".to_string()),
            amount: 2.5,
            signature: DigitalSignature(String::new()),
        };

        assert_eq!(
            transaction.signing_bytes().unwrap(),
            br#"{"amount":2.5,"from":"alice","to":"bob"}"#.to_vec()
        );
    }

    #[test]
    fn test_tampered_amount_fails_verification() {
        let sender_wallet = Wallet::new();
        let mut transaction =
            Transaction::new_signed(&sender_wallet, Address("bob".to_string()), 3.0).unwrap();

        transaction.amount = 30.0;
        assert!(!transaction.verify_signature().unwrap());
    }

    #[test]
    fn test_verification_after_reconstruction() {
        let sender_wallet = Wallet::new();
        let transaction =
            Transaction::new_signed(&sender_wallet, Address("bob".to_string()), 0.1).unwrap();

        let json = serde_json::to_vec(&transaction).unwrap();
        let rebuilt: Transaction = serde_json::from_slice(&json).unwrap();

        assert_eq!(rebuilt, transaction);
        assert!(rebuilt.verify_signature().unwrap());
    }

    #[test]
    fn test_malformed_sender_is_an_error() {
        let transaction = Transaction {
            from: Address("definitely not a key".to_string()),
            to: Address("bob".to_string()),
            amount: 1.0,
            signature: DigitalSignature("abc".to_string()),
        };

        assert!(matches!(
            transaction.verify_signature(),
            Err(TransactionError::CryptoError(CryptoError::MalformedKey(_)))
        ));
    }

    #[test]
    fn test_coinbase_transaction() {
        let miner_wallet = Wallet::new();

        let transaction = Transaction::new_coinbase(miner_wallet.address().clone(), 10.0);

        assert_eq!(transaction.from, Address::network());
        assert_eq!(transaction.signature.0, REWARD_SIGNATURE);
        assert!(transaction.is_coinbase());
        assert!(transaction.verify_signature().unwrap());
    }

    #[test]
    fn test_invalid_transfers_are_rejected() {
        let wallet = Wallet::new();
        let bob = Address("bob".to_string());

        for amount in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Transaction::new_signed(&wallet, bob.clone(), amount),
                Err(TransactionError::InvalidAmount(_))
            ));
        }
        assert!(matches!(
            Transaction::new_signed(&wallet, Address::network(), 1.0),
            Err(TransactionError::InvalidRecipientAddress(_))
        ));
        assert!(Transaction::new_signed(&wallet, bob, 0.0).is_ok());
    }

    #[test]
    fn test_negative_zero_signs_like_zero() {
        let wallet = Wallet::new();
        let bob = Address("bob".to_string());

        let transaction = Transaction::new_signed(&wallet, bob.clone(), -0.0).unwrap();
        assert!(transaction.amount.is_sign_positive());
        assert!(transaction.verify_signature().unwrap());

        let zero = Transaction::new_signed(&wallet, bob, 0.0).unwrap();
        assert_eq!(transaction.signing_bytes().unwrap(), zero.signing_bytes().unwrap());

        let mut flipped = zero.clone();
        flipped.amount = -0.0;
        assert_eq!(flipped.signing_bytes().unwrap(), zero.signing_bytes().unwrap());
        assert!(flipped.verify_signature().unwrap());
    }
}
