use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::codec::{self, CodecError};
use super::transaction::Transaction;

/// `previous_hash` of the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Represents a block in the blockchain
///
/// The hash is never stored on the block itself: it is always derived from the
/// canonical encoding of every field below, nonce included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block<P> {
    /// Index of the block in the chain
    pub index: u64,

    /// Timestamp when the block was sealed
    pub timestamp: DateTime<Utc>,

    /// Payload carried by the block
    pub data: P,

    /// Hash of the previous block
    pub previous_hash: String,

    /// Proof of work (nonce)
    pub nonce: u64,
}

impl<P: Serialize> Block<P> {
    /// Creates an unsealed block with a zero nonce
    pub fn new(index: u64, data: P, previous_hash: String) -> Self {
        Block {
            index,
            timestamp: Utc::now(),
            data,
            previous_hash,
            nonce: 0,
        }
    }

    /// Calculates the hash of the block
    ///
    /// # Returns
    ///
    /// The SHA-256 hash of the block's canonical encoding as a hexadecimal string
    pub fn calculate_hash(&self) -> Result<String, CodecError> {
        Ok(codec::sha256_hex(&codec::encode(self)?))
    }
}

/// Payload of every ledger block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BlockData {
    /// Transactions committed by the block, reward last
    pub transactions: Vec<Transaction>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::crypto::Address;

    fn sample_block() -> Block<BlockData> {
        let transactions = vec![
            Transaction::new_coinbase(Address("recipient1".to_string()), 10.0),
            Transaction::new_coinbase(Address("recipient2".to_string()), 20.0),
        ];

        Block::new(1, BlockData { transactions }, "previous_hash".to_string())
    }

    #[test]
    fn test_new_block() {
        let block = sample_block();

        assert_eq!(block.index, 1);
        assert_eq!(block.nonce, 0);
        assert_eq!(block.previous_hash, "previous_hash");
        assert_eq!(block.data.transactions.len(), 2);
    }

    #[test]
    fn test_calculate_hash() {
        let block = sample_block();

        let hash = block.calculate_hash().unwrap();
        assert_eq!(hash.len(), 64); // SHA-256 hash is 64 characters in hex
        assert_eq!(hash, block.calculate_hash().unwrap());
    }

    #[test]
    fn test_hash_survives_reconstruction() {
        let block = sample_block();

        let json = serde_json::to_string_pretty(&block).unwrap();
        let rebuilt: Block<BlockData> = serde_json::from_str(&json).unwrap();

        assert_eq!(rebuilt, block);
        assert_eq!(rebuilt.calculate_hash().unwrap(), block.calculate_hash().unwrap());
    }

    #[test]
    fn test_hash_covers_every_field() {
        let block = sample_block();
        let original = block.calculate_hash().unwrap();

        let mut changed = block.clone();
        changed.nonce += 1;
        assert_ne!(changed.calculate_hash().unwrap(), original);

        let mut changed = block.clone();
        changed.index += 1;
        assert_ne!(changed.calculate_hash().unwrap(), original);

        let mut changed = block.clone();
        changed.previous_hash.push('0');
        assert_ne!(changed.calculate_hash().unwrap(), original);

        let mut changed = block.clone();
        changed.timestamp = changed.timestamp + chrono::Duration::nanoseconds(1);
        assert_ne!(changed.calculate_hash().unwrap(), original);

        let mut changed = block;
        changed.data.transactions[0].amount = 10.5;
        assert_ne!(changed.calculate_hash().unwrap(), original);
    }
}
